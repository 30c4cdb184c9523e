//! Integration tests for repository registration into the service container

mod common;

use common::{MemoryUserRepository, User, UserRepository};
use lightrepo::prelude::*;
use std::sync::Arc;

/// An interface outside the repository hierarchy
pub trait HealthReport: Send + Sync {
    fn healthy(&self) -> bool;
}

impl HealthReport for MemoryUserRepository {
    fn healthy(&self) -> bool {
        true
    }
}

/// Second recognized capability on the same concrete type
pub trait UserLookup: CrudRepository<User> {}
impl UserLookup for MemoryUserRepository {}

fn construct(scope: &ServiceScope) -> anyhow::Result<MemoryUserRepository> {
    Ok(MemoryUserRepository::new(scope.resolve::<MemoryContext>()?))
}

fn services_for(store: &MemoryStore) -> ServiceCollection {
    let store = store.clone();
    let mut services = ServiceCollection::new();
    services.add_scoped::<MemoryContext, _>(move |_| Ok(Arc::new(store.context())));
    services
}

repository_scope!(AppRepositories {
    Candidate::repository(construct)
        .paging()
        .exposes_paging::<dyn UserRepository>(|repo| repo)
        .also_implements::<dyn HealthReport>(),
    Candidate::of::<User>(),
    Candidate::of::<MemoryStore>().also_implements::<dyn HealthReport>(),
});

repository_scope!(TransientRepositories {
    Candidate::repository(construct)
        .paging()
        .exposes_paging::<dyn UserRepository>(|repo| repo)
        .lifetime(ServiceLifetime::Transient),
});

repository_scope!(AmbiguousRepositories {
    Candidate::repository(construct)
        .paging()
        .exposes_paging::<dyn UserRepository>(|repo| repo)
        .exposes_crud::<dyn UserLookup>(|repo| repo),
});

repository_scope!(PooledRepositories {
    Candidate::repository(construct)
        .paging()
        .exposes_paging::<dyn UserRepository>(|repo| repo),
    Candidate::repository(construct)
        .exposes_crud::<dyn UserLookup>(|repo| repo)
        .lifetime(ServiceLifetime::Singleton),
});

#[test]
fn test_registration_skips_non_repositories() {
    let store = MemoryStore::new();
    let mut services = services_for(&store);

    let count = services
        .add_light_repositories::<AppRepositories>(RepositoryOptions::default())
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(services.len(), 2);
    let binding = &services.bindings()[1];
    assert!(binding.serves::<dyn UserRepository>());
    assert_eq!(binding.lifetime(), ServiceLifetime::Scoped);
    assert!(!services.contains::<dyn HealthReport>());
}

#[test]
fn test_scoped_repositories_share_a_unit_of_work() {
    let store = MemoryStore::new();
    let mut services = services_for(&store);
    services
        .add_light_repositories::<AppRepositories>(RepositoryOptions::default())
        .unwrap();
    let provider = services.build_provider();

    let scope = provider.create_scope();
    let first = scope.resolve::<dyn UserRepository>().unwrap();
    let second = scope.resolve::<dyn UserRepository>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    first.add(User::new(1, "alice", Some(30))).unwrap();
    let context = scope.resolve::<MemoryContext>().unwrap();
    assert_eq!(context.pending_changes(), 1);

    let other_scope = provider.create_scope();
    let other = other_scope.resolve::<dyn UserRepository>().unwrap();
    assert!(!Arc::ptr_eq(&first, &other));
    assert!(other.find_by_id(&1).unwrap().is_none());

    first.save_changes().unwrap();
    assert!(other.find_by_id(&1).unwrap().is_some());
}

#[test]
fn test_transient_lifetime() {
    let store = MemoryStore::new();
    let mut services = services_for(&store);
    services
        .add_light_repositories::<TransientRepositories>(RepositoryOptions::default())
        .unwrap();

    let scope = services.build_provider().create_scope();
    let first = scope.resolve::<dyn UserRepository>().unwrap();
    let second = scope.resolve::<dyn UserRepository>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    // transient repositories still share the scoped connection handle
    first.add(User::new(2, "bob", None)).unwrap();
    assert_eq!(second.count().unwrap(), 1);
}

#[test]
fn test_configured_default_lifetime() {
    let store = MemoryStore::new();

    let mut services = services_for(&store);
    let options = RepositoryOptions::from(&RepositoryConfig::with_default_lifetime(
        ServiceLifetime::Transient,
    ));
    services
        .add_light_repositories::<AppRepositories>(options)
        .unwrap();
    assert_eq!(services.bindings()[1].lifetime(), ServiceLifetime::Transient);

    let mut services = services_for(&store);
    let options = RepositoryOptions::new().with_default_lifetime(ServiceLifetime::Singleton);
    let result = services.add_light_repositories::<AppRepositories>(options);
    assert!(matches!(result, Err(RegistryError::InvalidLifetime { .. })));
    assert_eq!(services.len(), 1);
}

#[test]
fn test_two_capabilities_fail_registration() {
    let store = MemoryStore::new();
    let mut services = services_for(&store);

    let result = services.add_light_repositories::<AmbiguousRepositories>(RepositoryOptions::default());

    match result {
        Err(RegistryError::AmbiguousOrMissingCapability { repository, found }) => {
            assert!(repository.ends_with("MemoryUserRepository"));
            assert_eq!(found.len(), 2);
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }
    assert_eq!(services.len(), 1);
}

#[test]
fn test_pooled_lifetime_registers_nothing() {
    let store = MemoryStore::new();
    let mut services = services_for(&store);

    let result = services.add_light_repositories::<PooledRepositories>(RepositoryOptions::default());

    assert!(matches!(
        result,
        Err(RegistryError::InvalidLifetime {
            lifetime: ServiceLifetime::Singleton,
            ..
        })
    ));
    assert!(!services.contains::<dyn UserRepository>());
    assert!(!services.contains::<dyn UserLookup>());
}

#[test]
fn test_unregistered_interface() {
    let store = MemoryStore::new();
    let scope = services_for(&store).build_provider().create_scope();

    assert!(matches!(
        scope.resolve::<dyn UserRepository>(),
        Err(RegistryError::NotRegistered(_))
    ));
}
