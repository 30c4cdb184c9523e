use crate::errors::StoreError;
use crate::traits::entity::Entity;
use crate::traits::table::TableHandle;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A connection handle: one unit of work over a store.
///
/// The handle owns the staged changes of every table obtained from it. It is
/// not meant to be shared between concurrently running units of work.
#[async_trait]
pub trait StoreContext: Send + Sync + 'static {
    /// Table handle type produced for an entity
    type Table<E: Entity>: TableHandle<E>;

    /// Table handle for an entity kind
    fn set<E: Entity>(&self) -> Self::Table<E>;

    /// Commit every staged change, returning the number of affected rows
    fn save_changes(&self) -> Result<u64, StoreError>;

    async fn save_changes_async(&self, cancel: &CancellationToken) -> Result<u64, StoreError>;

    /// Number of staged changes not yet committed
    fn pending_changes(&self) -> usize;
}
