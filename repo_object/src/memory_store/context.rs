use crate::errors::StoreError;
use crate::memory_store::store::MemoryStore;
use crate::memory_store::table::MemoryTable;
use crate::tracking::ChangeTracker;
use crate::traits::{ensure_active, Entity, StoreContext};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

struct ContextInner {
    store: MemoryStore,
    tracker: Mutex<ChangeTracker>,
}

/// One unit of work over a `MemoryStore`.
///
/// Clones share the same staged changes; open a new context from the store
/// for an independent unit of work.
#[derive(Clone)]
pub struct MemoryContext {
    inner: Arc<ContextInner>,
}

impl MemoryContext {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                store,
                tracker: Mutex::new(ChangeTracker::new()),
            }),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.inner.store
    }

    pub(crate) fn tracker(&self) -> MutexGuard<'_, ChangeTracker> {
        self.inner
            .tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every staged change without committing it
    pub fn discard_changes(&self) {
        self.tracker().clear();
    }
}

impl std::fmt::Debug for MemoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryContext")
            .field("pending_changes", &self.pending_changes())
            .finish()
    }
}

#[async_trait]
impl StoreContext for MemoryContext {
    type Table<E: Entity> = MemoryTable<E>;

    fn set<E: Entity>(&self) -> MemoryTable<E> {
        MemoryTable::new(self.clone())
    }

    fn save_changes(&self) -> Result<u64, StoreError> {
        let mut tracker = self.tracker();
        let changes = tracker.pending_changes();
        if changes.is_empty() {
            return Ok(0);
        }

        let affected = self.inner.store.commit(&changes)?;
        tracker.accept_all();
        Ok(affected)
    }

    async fn save_changes_async(&self, cancel: &CancellationToken) -> Result<u64, StoreError> {
        ensure_active(cancel)?;
        self.save_changes()
    }

    fn pending_changes(&self) -> usize {
        self.tracker().pending_count()
    }
}
