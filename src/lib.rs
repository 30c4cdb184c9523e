//! # LightRepo
//!
//! Typed repositories over PostgreSQL: CRUD, paging and sorting behind
//! capability traits, staged changes per unit of work, and startup-time
//! registration of repositories into a dependency container.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lightrepo::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
//! #[entity(table = "users")]
//! pub struct User {
//!     #[key]
//!     pub id: i64,
//!     pub name: String,
//!     pub age: i32,
//! }
//!
//! pub trait UserRepository: PagingAndSortingRepository<User> {}
//!
//! pub struct PgUserRepository {
//!     base: RepositoryBase<PgContext>,
//! }
//!
//! impl Repository for PgUserRepository {
//!     type Context = PgContext;
//!     type Entity = User;
//!
//!     fn base(&self) -> &RepositoryBase<PgContext> {
//!         &self.base
//!     }
//! }
//!
//! impl PagingRepository for PgUserRepository {}
//! impl UserRepository for PgUserRepository {}
//!
//! repository_scope!(AppRepositories {
//!     Candidate::repository(|scope: &ServiceScope| {
//!         Ok(PgUserRepository {
//!             base: RepositoryBase::new(scope.resolve::<PgContext>()?),
//!         })
//!     })
//!     .paging()
//!     .exposes_paging::<dyn UserRepository>(|repo| repo),
//! });
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let lightrepo = LightRepo::from_config(AppConfig::load()?).await?;
//!
//!     let mut services = ServiceCollection::new();
//!     lightrepo.add_repositories::<AppRepositories>(&mut services)?;
//!     let provider = services.build_provider();
//!
//!     let scope = provider.create_scope();
//!     let users = scope.resolve::<dyn UserRepository>()?;
//!
//!     users.add(User { id: 1, name: "Ada".to_string(), age: 36 })?;
//!     users.save_changes_async(&CancellationToken::new()).await?;
//!
//!     let page = users.find_all_paged_sorted(
//!         PaginationRequest::new(0, 10),
//!         &OrderKey::new("age"),
//!         SortDirection::Descending,
//!         false,
//!     )?;
//!     println!("{} users", page.len());
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::LightRepo;
pub use errors::LightRepoError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, RepositoryConfig, ServiceLifetime};

// Re-export internal crates used by macros and public API
// These MUST be public for the generated derive code to resolve `repo_object::`
pub use entity_derive;
pub use repo_object;
pub use repo_registry;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
