//! CRUD capability

use crate::errors::RepositoryError;
use crate::query_builder::{QueryFilter, UpdateSet};
use crate::repository::{LightRepository, Repository};
use crate::tracking::EntryHandle;
use crate::traits::{Entity, TableHandle};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Single-entity and predicate-based reads and writes.
///
/// `add`, `update` and the staged deletes only record changes on the
/// connection handle; `save_changes` makes them durable. `update_where` and
/// `execute_delete_where` act on the store directly.
#[async_trait]
pub trait CrudRepository<E: Entity>: LightRepository {
    /// Commit staged changes, returning the number of affected rows
    fn save_changes(&self) -> Result<u64, RepositoryError>;

    async fn save_changes_async(&self, cancel: &CancellationToken)
        -> Result<u64, RepositoryError>;

    /// Stage an entity for insertion
    fn add(&self, entity: E) -> Result<EntryHandle<E>, RepositoryError>;

    async fn add_async(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<EntryHandle<E>, RepositoryError>;

    /// Stage several entities for insertion; either all are staged or none
    fn add_many(&self, entities: Vec<E>) -> Result<usize, RepositoryError>;

    async fn add_many_async(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<usize, RepositoryError>;

    /// Entity with the given key, or `None` when there is none
    fn find_by_id(&self, key: &E::Key) -> Result<Option<E>, RepositoryError>;

    async fn find_by_id_async(
        &self,
        key: &E::Key,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, RepositoryError>;

    /// First entity matching the predicate, in store order
    fn find_where(&self, predicate: &QueryFilter) -> Result<Option<E>, RepositoryError>;

    async fn find_where_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, RepositoryError>;

    fn count(&self) -> Result<u64, RepositoryError>;

    async fn count_async(&self, cancel: &CancellationToken) -> Result<u64, RepositoryError>;

    fn count_where(&self, predicate: &QueryFilter) -> Result<u64, RepositoryError>;

    async fn count_where_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<u64, RepositoryError>;

    fn exists_where(&self, predicate: &QueryFilter) -> Result<bool, RepositoryError>;

    async fn exists_where_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<bool, RepositoryError>;

    /// Whether every entity satisfies the predicate; true for an empty table
    fn all_are(&self, predicate: &QueryFilter) -> Result<bool, RepositoryError>;

    async fn all_are_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<bool, RepositoryError>;

    /// Stage the removal of the entity with the given key.
    ///
    /// Fails with `RepositoryError::NotFound` when no entity has that key.
    fn delete_by_id(&self, key: &E::Key) -> Result<EntryHandle<E>, RepositoryError>;

    async fn delete_by_id_async(
        &self,
        key: &E::Key,
        cancel: &CancellationToken,
    ) -> Result<EntryHandle<E>, RepositoryError>;

    /// Stage the removal of every match and return how many there were.
    /// Zero matches is not an error.
    fn delete_where(&self, predicate: &QueryFilter) -> Result<u64, RepositoryError>;

    async fn delete_where_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<u64, RepositoryError>;

    /// Delete every match directly in the store, returning affected rows
    fn execute_delete_where(&self, predicate: &QueryFilter) -> Result<u64, RepositoryError>;

    async fn execute_delete_where_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<u64, RepositoryError>;

    /// Stage an entity as modified
    fn update(&self, entity: E) -> Result<usize, RepositoryError>;

    async fn update_async(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<usize, RepositoryError>;

    fn update_many(&self, entities: Vec<E>) -> Result<usize, RepositoryError>;

    async fn update_many_async(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<usize, RepositoryError>;

    /// Apply a mutation to every match directly in the store
    fn update_where(
        &self,
        predicate: &QueryFilter,
        mutation: &UpdateSet,
    ) -> Result<u64, RepositoryError>;

    async fn update_where_async(
        &self,
        predicate: &QueryFilter,
        mutation: &UpdateSet,
        cancel: &CancellationToken,
    ) -> Result<u64, RepositoryError>;
}

fn not_found<E: Entity>(key: &E::Key) -> RepositoryError {
    RepositoryError::NotFound {
        table: E::table_name(),
        key: format!("{:?}", key),
    }
}

#[async_trait]
impl<R> CrudRepository<R::Entity> for R
where
    R: Repository,
{
    fn save_changes(&self) -> Result<u64, RepositoryError> {
        self.base().save()
    }

    async fn save_changes_async(
        &self,
        cancel: &CancellationToken,
    ) -> Result<u64, RepositoryError> {
        self.base().save_async(cancel).await
    }

    fn add(&self, entity: R::Entity) -> Result<EntryHandle<R::Entity>, RepositoryError> {
        Ok(self.table().add(entity)?)
    }

    async fn add_async(
        &self,
        entity: R::Entity,
        cancel: &CancellationToken,
    ) -> Result<EntryHandle<R::Entity>, RepositoryError> {
        Ok(self.table().add_async(entity, cancel).await?)
    }

    fn add_many(&self, entities: Vec<R::Entity>) -> Result<usize, RepositoryError> {
        Ok(self.table().add_range(entities)?)
    }

    async fn add_many_async(
        &self,
        entities: Vec<R::Entity>,
        cancel: &CancellationToken,
    ) -> Result<usize, RepositoryError> {
        Ok(self.table().add_range_async(entities, cancel).await?)
    }

    fn find_by_id(
        &self,
        key: &<R::Entity as Entity>::Key,
    ) -> Result<Option<R::Entity>, RepositoryError> {
        Ok(self.table().find(key)?)
    }

    async fn find_by_id_async(
        &self,
        key: &<R::Entity as Entity>::Key,
        cancel: &CancellationToken,
    ) -> Result<Option<R::Entity>, RepositoryError> {
        Ok(self.table().find_async(key, cancel).await?)
    }

    fn find_where(&self, predicate: &QueryFilter) -> Result<Option<R::Entity>, RepositoryError> {
        let table = self.table();
        let query = table.as_queryable().filter(predicate.clone());
        Ok(table.first(&query)?)
    }

    async fn find_where_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<Option<R::Entity>, RepositoryError> {
        let table = self.table();
        let query = table.as_queryable().filter(predicate.clone());
        Ok(table.first_async(&query, cancel).await?)
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        let table = self.table();
        Ok(table.count(&table.as_queryable())?)
    }

    async fn count_async(&self, cancel: &CancellationToken) -> Result<u64, RepositoryError> {
        let table = self.table();
        let query = table.as_queryable();
        Ok(table.count_async(&query, cancel).await?)
    }

    fn count_where(&self, predicate: &QueryFilter) -> Result<u64, RepositoryError> {
        let table = self.table();
        Ok(table.count(&table.as_queryable().filter(predicate.clone()))?)
    }

    async fn count_where_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<u64, RepositoryError> {
        let table = self.table();
        let query = table.as_queryable().filter(predicate.clone());
        Ok(table.count_async(&query, cancel).await?)
    }

    fn exists_where(&self, predicate: &QueryFilter) -> Result<bool, RepositoryError> {
        let table = self.table();
        Ok(table.any(&table.as_queryable().filter(predicate.clone()))?)
    }

    async fn exists_where_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<bool, RepositoryError> {
        let table = self.table();
        let query = table.as_queryable().filter(predicate.clone());
        Ok(table.any_async(&query, cancel).await?)
    }

    fn all_are(&self, predicate: &QueryFilter) -> Result<bool, RepositoryError> {
        let table = self.table();
        Ok(table.all(&table.as_queryable(), predicate)?)
    }

    async fn all_are_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<bool, RepositoryError> {
        let table = self.table();
        let query = table.as_queryable();
        Ok(table.all_async(&query, predicate, cancel).await?)
    }

    fn delete_by_id(
        &self,
        key: &<R::Entity as Entity>::Key,
    ) -> Result<EntryHandle<R::Entity>, RepositoryError> {
        let table = self.table();
        match table.find(key)? {
            Some(entity) => Ok(table.remove(entity)?),
            None => Err(not_found::<R::Entity>(key)),
        }
    }

    async fn delete_by_id_async(
        &self,
        key: &<R::Entity as Entity>::Key,
        cancel: &CancellationToken,
    ) -> Result<EntryHandle<R::Entity>, RepositoryError> {
        let table = self.table();
        match table.find_async(key, cancel).await? {
            Some(entity) => Ok(table.remove_async(entity, cancel).await?),
            None => Err(not_found::<R::Entity>(key)),
        }
    }

    fn delete_where(&self, predicate: &QueryFilter) -> Result<u64, RepositoryError> {
        let table = self.table();
        let matches = table.to_list(&table.as_queryable().filter(predicate.clone()))?;
        Ok(table.remove_range(matches)? as u64)
    }

    async fn delete_where_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<u64, RepositoryError> {
        let table = self.table();
        let query = table.as_queryable().filter(predicate.clone());
        let matches = table.to_list_async(&query, cancel).await?;
        Ok(table.remove_range_async(matches, cancel).await? as u64)
    }

    fn execute_delete_where(&self, predicate: &QueryFilter) -> Result<u64, RepositoryError> {
        Ok(self.table().execute_delete(predicate)?)
    }

    async fn execute_delete_where_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<u64, RepositoryError> {
        Ok(self.table().execute_delete_async(predicate, cancel).await?)
    }

    fn update(&self, entity: R::Entity) -> Result<usize, RepositoryError> {
        self.table().update(entity)?;
        Ok(1)
    }

    async fn update_async(
        &self,
        entity: R::Entity,
        cancel: &CancellationToken,
    ) -> Result<usize, RepositoryError> {
        self.table().update_async(entity, cancel).await?;
        Ok(1)
    }

    fn update_many(&self, entities: Vec<R::Entity>) -> Result<usize, RepositoryError> {
        Ok(self.table().update_range(entities)?)
    }

    async fn update_many_async(
        &self,
        entities: Vec<R::Entity>,
        cancel: &CancellationToken,
    ) -> Result<usize, RepositoryError> {
        Ok(self.table().update_range_async(entities, cancel).await?)
    }

    fn update_where(
        &self,
        predicate: &QueryFilter,
        mutation: &UpdateSet,
    ) -> Result<u64, RepositoryError> {
        Ok(self.table().execute_update(predicate, mutation)?)
    }

    async fn update_where_async(
        &self,
        predicate: &QueryFilter,
        mutation: &UpdateSet,
        cancel: &CancellationToken,
    ) -> Result<u64, RepositoryError> {
        Ok(self
            .table()
            .execute_update_async(predicate, mutation, cancel)
            .await?)
    }
}
