//! Shared fixtures for the integration tests

#![allow(dead_code)]

use lightrepo::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Entity)]
#[entity(table = "users")]
pub struct User {
    #[key]
    pub id: i64,
    pub name: String,
    pub age: Option<i32>,
    pub active: bool,
}

impl User {
    pub fn new(id: i64, name: &str, age: Option<i32>) -> Self {
        Self {
            id,
            name: name.to_string(),
            age,
            active: true,
        }
    }
}

/// Application-level capability interface for users
pub trait UserRepository: PagingAndSortingRepository<User> {}

pub struct MemoryUserRepository {
    base: RepositoryBase<MemoryContext>,
}

impl MemoryUserRepository {
    pub fn new(context: Arc<MemoryContext>) -> Self {
        Self {
            base: RepositoryBase::new(context),
        }
    }

    /// Repository over a fresh unit of work of `store`
    pub fn open(store: &MemoryStore) -> Self {
        Self::new(Arc::new(store.context()))
    }
}

impl Repository for MemoryUserRepository {
    type Context = MemoryContext;
    type Entity = User;

    fn base(&self) -> &RepositoryBase<MemoryContext> {
        &self.base
    }
}

impl PagingRepository for MemoryUserRepository {}
impl UserRepository for MemoryUserRepository {}

/// Store holding users 1..=count, committed
pub fn seeded_store(count: i64) -> MemoryStore {
    let store = MemoryStore::new();
    let repo = MemoryUserRepository::open(&store);
    let users = (1..=count)
        .map(|id| User::new(id, &format!("user_{:02}", id), Some(20 + (id % 7) as i32)))
        .collect();
    repo.add_many(users).unwrap();
    repo.save_changes().unwrap();
    store
}

pub fn ids(users: &[User]) -> Vec<i64> {
    users.iter().map(|user| user.id).collect()
}
