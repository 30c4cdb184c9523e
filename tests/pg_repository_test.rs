//! PostgreSQL round trip through the registered repositories
//!
//! Runs only when `DATABASE_URL` points at a reachable database.

use lightrepo::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Entity)]
#[entity(table = "lightrepo_pg_accounts")]
pub struct Account {
    #[key]
    pub id: i64,
    pub name: String,
    pub age: Option<i32>,
    pub active: bool,
}

impl Account {
    fn new(id: i64, name: &str, age: Option<i32>) -> Self {
        Self {
            id,
            name: name.to_string(),
            age,
            active: true,
        }
    }
}

pub trait AccountRepository: PagingAndSortingRepository<Account> {}

pub struct PgAccountRepository {
    base: RepositoryBase<PgContext>,
}

impl Repository for PgAccountRepository {
    type Context = PgContext;
    type Entity = Account;

    fn base(&self) -> &RepositoryBase<PgContext> {
        &self.base
    }
}

impl PagingRepository for PgAccountRepository {}
impl AccountRepository for PgAccountRepository {}

repository_scope!(PgRepositories {
    Candidate::repository(|scope| Ok(PgAccountRepository {
        base: RepositoryBase::new(scope.resolve::<PgContext>()?),
    }))
    .paging()
    .exposes_paging::<dyn AccountRepository>(|repo| repo),
});

async fn setup() -> Option<LightRepo> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    sqlx::query("DROP TABLE IF EXISTS lightrepo_pg_accounts")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE lightrepo_pg_accounts (
            id BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            age INT,
            active BOOLEAN NOT NULL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();

    Some(LightRepo::from_pool(pool, RepositoryConfig::default()))
}

async fn teardown(lightrepo: &LightRepo) {
    sqlx::query("DROP TABLE IF EXISTS lightrepo_pg_accounts")
        .execute(lightrepo.pool())
        .await
        .unwrap();
}

fn resolve(provider: &ServiceProvider) -> Arc<dyn AccountRepository> {
    provider
        .create_scope()
        .resolve::<dyn AccountRepository>()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pg_crud_and_paging() {
    let Some(lightrepo) = setup().await else {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
        return;
    };
    lightrepo.health_check().await.unwrap();

    let mut services = ServiceCollection::new();
    assert_eq!(
        lightrepo
            .add_repositories::<PgRepositories>(&mut services)
            .unwrap(),
        1
    );
    let provider = services.build_provider();
    let cancel = CancellationToken::new();

    let repo = resolve(&provider);
    let accounts = (1..=25)
        .map(|id| {
            let age = (id % 3 != 0).then_some(id as i32);
            Account::new(id, &format!("account_{:02}", id), age)
        })
        .collect();
    assert_eq!(repo.add_many_async(accounts, &cancel).await.unwrap(), 25);

    // staged rows are visible to the same unit of work only
    assert_eq!(repo.count_async(&cancel).await.unwrap(), 25);
    assert_eq!(resolve(&provider).count_async(&cancel).await.unwrap(), 0);
    assert_eq!(repo.save_changes_async(&cancel).await.unwrap(), 25);

    let reader = resolve(&provider);
    let page = reader
        .find_all_paged_sorted_async(
            PaginationRequest::new(2, 10),
            &OrderKey::new("id"),
            SortDirection::Descending,
            false,
            &cancel,
        )
        .await
        .unwrap();
    let ids: Vec<i64> = page.iter().map(|account| account.id).collect();
    assert_eq!(ids, vec![5, 4, 3, 2, 1]);

    let missing_age = QueryFilter::is_null("age");
    assert_eq!(reader.count_where_async(&missing_age, &cancel).await.unwrap(), 8);
    let positive_age = QueryFilter::gt("age", json!(0));
    assert!(!reader.all_are_async(&positive_age, &cancel).await.unwrap());

    let found = reader.find_by_id_async(&7, &cancel).await.unwrap();
    assert_eq!(found, Some(Account::new(7, "account_07", Some(7))));
    assert!(matches!(
        reader.delete_by_id_async(&99, &cancel).await,
        Err(RepositoryError::NotFound { .. })
    ));

    let updated = reader
        .update_where_async(
            &QueryFilter::lte("id", json!(2)),
            &UpdateSet::new().increment("age", json!(100)),
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(updated, 2);
    assert_eq!(
        reader
            .find_by_id_async(&2, &cancel)
            .await
            .unwrap()
            .and_then(|account| account.age),
        Some(102)
    );

    let cleared = reader
        .update_where_async(
            &QueryFilter::in_values("id", vec![json!(2), json!(null)]),
            &UpdateSet::new().set("age", json!(null)),
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(cleared, 1);
    assert_eq!(
        reader
            .find_by_id_async(&2, &cancel)
            .await
            .unwrap()
            .and_then(|account| account.age),
        None
    );

    let writer = resolve(&provider);
    writer.add_async(Account::new(1, "duplicate", None), &cancel).await.unwrap();
    assert!(matches!(
        writer.save_changes_async(&cancel).await,
        Err(RepositoryError::Store(StoreError::DuplicateKey { .. }))
    ));

    let deleted = reader
        .execute_delete_where_async(&QueryFilter::gt("id", json!(20)), &cancel)
        .await
        .unwrap();
    assert_eq!(deleted, 5);
    assert_eq!(reader.count_async(&cancel).await.unwrap(), 20);

    // synchronous half blocks on the captured runtime
    assert_eq!(reader.count().unwrap(), 20);

    teardown(&lightrepo).await;
}
