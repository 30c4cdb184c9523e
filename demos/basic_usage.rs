//! # Basic Usage Example
//!
//! Walks through the core ideas of LightRepo without a database:
//! - Declaring an entity with `#[derive(Entity)]`
//! - A capability interface and the repository implementing it
//! - Registering repositories into a service collection
//! - Staging changes, saving them and reading pages back

use lightrepo::prelude::*;

#[derive(Debug, Clone, Serialize, Deserialize, Entity)]
#[entity(table = "books")]
pub struct Book {
    #[key]
    pub id: i64,
    pub title: String,
    pub year: Option<i32>,
}

/// What the application asks the container for
pub trait BookRepository: PagingAndSortingRepository<Book> {}

pub struct MemoryBookRepository {
    base: RepositoryBase<MemoryContext>,
}

impl Repository for MemoryBookRepository {
    type Context = MemoryContext;
    type Entity = Book;

    fn base(&self) -> &RepositoryBase<MemoryContext> {
        &self.base
    }
}

impl PagingRepository for MemoryBookRepository {}
impl BookRepository for MemoryBookRepository {}

repository_scope!(LibraryRepositories {
    Candidate::repository(|scope| Ok(MemoryBookRepository {
        base: RepositoryBase::new(scope.resolve::<MemoryContext>()?),
    }))
    .paging()
    .exposes_paging::<dyn BookRepository>(|repo| repo),
});

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("LightRepo Basic Usage Example");
    println!("=============================");

    // 1. Container setup: one unit of work per scope
    let store = MemoryStore::new();
    let mut services = ServiceCollection::new();
    let shared = store.clone();
    services.add_scoped::<MemoryContext, _>(move |_| Ok(std::sync::Arc::new(shared.context())));

    let bound = services.add_light_repositories::<LibraryRepositories>(RepositoryOptions::default())?;
    println!("Registered {} repository binding(s)", bound);

    let provider = services.build_provider();
    let scope = provider.create_scope();
    let books = scope.resolve::<dyn BookRepository>()?;

    // 2. Stage and save
    let cancel = CancellationToken::new();
    let staged = books.add_many(vec![
        Book { id: 1, title: "Dune".into(), year: Some(1965) },
        Book { id: 2, title: "Neuromancer".into(), year: Some(1984) },
        Book { id: 3, title: "Untitled draft".into(), year: None },
    ])?;
    println!("Staged {} books", staged);
    println!("Saved {} rows", books.save_changes_async(&cancel).await?);

    // 3. Read back, sorted and paged
    let page = books.find_all_paged_sorted(
        PaginationRequest::new(0, 2),
        &OrderKey::new("year"),
        SortDirection::Descending,
        false,
    )?;
    for book in &page {
        println!("  {:>2} {:<16} {:?}", book.id, book.title, book.year);
    }

    // 4. Bulk update straight against the store
    let renamed = books.update_where(
        &QueryFilter::is_null("year"),
        &UpdateSet::new().set("title", json!("Lost manuscript")),
    )?;
    println!("Renamed {} book(s)", renamed);

    Ok(())
}
