//! Convenience re-exports for common repo-object usage

// Entity and store contracts
pub use crate::traits::{Entity, StoreContext, TableHandle, TableMeta};

// Repositories
pub use crate::repository::{
    CrudRepository, LightRepository, PagingAndSortingRepository, PagingRepository, Repository,
    RepositoryBase,
};

// Error types
pub use crate::errors::{RepositoryError, StoreError};

// Query building
pub use crate::query_builder::{
    OrderKey, PaginationRequest, Query, QueryBuilder, QueryDescriptor, QueryFilter,
    SortDirection, UpdateSet,
};

// Change tracking
pub use crate::tracking::{EntryHandle, EntryState};

// Store backends
pub use crate::memory_store::{MemoryContext, MemoryStore};
pub use crate::pg_store::PgContext;

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use serde_json::json;
pub use sqlx::PgPool;
pub use tokio_util::sync::CancellationToken;
