use crate::errors::RepositoryError;
use crate::traits::{Entity, StoreContext};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared state of every repository: the connection handle it works on.
///
/// The handle is referenced, not owned; whoever created it decides how long
/// it lives and which repositories share it.
pub struct RepositoryBase<C: StoreContext> {
    context: Arc<C>,
}

impl<C: StoreContext> RepositoryBase<C> {
    pub fn new(context: Arc<C>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    /// Table handle for an entity kind
    pub fn table<E: Entity>(&self) -> C::Table<E> {
        self.context.set::<E>()
    }

    /// Commit every change staged on the connection handle
    pub fn save(&self) -> Result<u64, RepositoryError> {
        Ok(self.context.save_changes()?)
    }

    pub async fn save_async(&self, cancel: &CancellationToken) -> Result<u64, RepositoryError> {
        Ok(self.context.save_changes_async(cancel).await?)
    }
}

impl<C: StoreContext> Clone for RepositoryBase<C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<C: StoreContext> std::fmt::Debug for RepositoryBase<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryBase")
            .field("pending_changes", &self.context.pending_changes())
            .finish()
    }
}
