//! Table handle contract
//!
//! A table handle is the store-side view over one entity's rows. Mutations
//! are staged on the owning connection handle until it saves; reads see the
//! staged state of that same handle.

use crate::errors::StoreError;
use crate::query_builder::{Query, QueryFilter, UpdateSet};
use crate::tracking::EntryHandle;
use crate::traits::entity::Entity;
use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Fail fast when the token is already cancelled
pub fn ensure_active(cancel: &CancellationToken) -> Result<(), StoreError> {
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }
    Ok(())
}

/// Run a store future, abandoning it as soon as the token is cancelled
pub async fn run_cancellable<T, F>(cancel: &CancellationToken, future: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    ensure_active(cancel)?;
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StoreError::Cancelled),
        result = future => result,
    }
}

/// Access to one entity's rows.
///
/// The asynchronous forms default to checking the token and then running the
/// synchronous form; backends with real I/O override them.
#[async_trait]
pub trait TableHandle<E: Entity>: Send + Sync {
    /// Look up one entity by key
    fn find(&self, key: &E::Key) -> Result<Option<E>, StoreError>;

    /// Stage an insertion
    fn add(&self, entity: E) -> Result<EntryHandle<E>, StoreError>;

    /// Stage several insertions; nothing is staged if any of them fails
    fn add_range(&self, entities: Vec<E>) -> Result<usize, StoreError>;

    /// Stage a removal
    fn remove(&self, entity: E) -> Result<EntryHandle<E>, StoreError>;

    fn remove_range(&self, entities: Vec<E>) -> Result<usize, StoreError>;

    /// Stage a modification
    fn update(&self, entity: E) -> Result<EntryHandle<E>, StoreError>;

    fn update_range(&self, entities: Vec<E>) -> Result<usize, StoreError>;

    /// Unrestricted query over the table
    fn as_queryable(&self) -> Query {
        Query::new(E::table_name())
    }

    /// Materialize a query
    fn to_list(&self, query: &Query) -> Result<Vec<E>, StoreError>;

    /// First row of a query, in the query's order
    fn first(&self, query: &Query) -> Result<Option<E>, StoreError> {
        Ok(self.to_list(&query.clone().take(1))?.into_iter().next())
    }

    fn count(&self, query: &Query) -> Result<u64, StoreError>;

    fn any(&self, query: &Query) -> Result<bool, StoreError>;

    /// Whether every row of the query satisfies the predicate (true when empty)
    fn all(&self, query: &Query, predicate: &QueryFilter) -> Result<bool, StoreError>;

    /// Delete matching rows directly in the store, bypassing staging
    fn execute_delete(&self, predicate: &QueryFilter) -> Result<u64, StoreError>;

    /// Mutate matching rows directly in the store, bypassing staging
    fn execute_update(&self, predicate: &QueryFilter, update: &UpdateSet)
        -> Result<u64, StoreError>;

    async fn find_async(
        &self,
        key: &E::Key,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, StoreError> {
        ensure_active(cancel)?;
        self.find(key)
    }

    async fn add_async(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<EntryHandle<E>, StoreError> {
        ensure_active(cancel)?;
        self.add(entity)
    }

    async fn add_range_async(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<usize, StoreError> {
        ensure_active(cancel)?;
        self.add_range(entities)
    }

    async fn remove_async(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<EntryHandle<E>, StoreError> {
        ensure_active(cancel)?;
        self.remove(entity)
    }

    async fn remove_range_async(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<usize, StoreError> {
        ensure_active(cancel)?;
        self.remove_range(entities)
    }

    async fn update_async(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<EntryHandle<E>, StoreError> {
        ensure_active(cancel)?;
        self.update(entity)
    }

    async fn update_range_async(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<usize, StoreError> {
        ensure_active(cancel)?;
        self.update_range(entities)
    }

    async fn to_list_async(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, StoreError> {
        ensure_active(cancel)?;
        self.to_list(query)
    }

    async fn first_async(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, StoreError> {
        let limited = query.clone().take(1);
        Ok(self
            .to_list_async(&limited, cancel)
            .await?
            .into_iter()
            .next())
    }

    async fn count_async(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        ensure_active(cancel)?;
        self.count(query)
    }

    async fn any_async(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError> {
        ensure_active(cancel)?;
        self.any(query)
    }

    async fn all_async(
        &self,
        query: &Query,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError> {
        ensure_active(cancel)?;
        self.all(query, predicate)
    }

    async fn execute_delete_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        ensure_active(cancel)?;
        self.execute_delete(predicate)
    }

    async fn execute_update_async(
        &self,
        predicate: &QueryFilter,
        update: &UpdateSet,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        ensure_active(cancel)?;
        self.execute_update(predicate, update)
    }
}
