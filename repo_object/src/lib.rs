//! Repo Object - Core data-access layer for LightRepo
//!
//! This crate provides the entity and store contracts, the query builder,
//! the change tracker, the generic repositories built on top of them and the
//! two store backends (in-memory and PostgreSQL).

// Lets `#[derive(Entity)]` expansions resolve `repo_object::...` inside this crate too
extern crate self as repo_object;

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

pub mod errors;
pub mod memory_store;
pub mod pg_store;
pub mod prelude;
pub mod query_builder;
pub mod repository;
pub mod tracking;
pub mod traits;
pub mod validation;

pub use errors::{RepositoryError, StoreError};
pub use memory_store::{MemoryContext, MemoryStore, MemoryTable};
pub use pg_store::{PgContext, PgTable};
pub use query_builder::{
    OrderKey, PaginationRequest, Query, QueryBuilder, QueryDescriptor, QueryFilter,
    QueryOperator, QueryStage, SortDirection, UpdateOperation, UpdateSet,
};
pub use repository::{
    CrudRepository, LightRepository, PagingAndSortingRepository, PagingRepository, Repository,
    RepositoryBase,
};
pub use tracking::{ChangeTracker, EntryHandle, EntryState, StagedChange};
pub use traits::{
    ensure_active, key_identity, row_identity, run_cancellable, Entity, StoreContext, TableHandle,
    TableMeta,
};
pub use validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

pub use tokio_util::sync::CancellationToken;

use sqlx::PgPool;

pub type DbPool = PgPool;
