use crate::errors::StoreError;
use crate::memory_store::context::MemoryContext;
use crate::query_builder::evaluation::{apply_stages, matches};
use crate::query_builder::{Query, QueryFilter, UpdateSet};
use crate::tracking::{EntryHandle, EntryState};
use crate::traits::{key_identity, Entity, TableHandle, TableMeta};
use serde_json::Value;
use std::marker::PhantomData;

/// Table handle of a `MemoryContext`
pub struct MemoryTable<E> {
    context: MemoryContext,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> MemoryTable<E> {
    pub(crate) fn new(context: MemoryContext) -> Self {
        Self {
            context,
            _entity: PhantomData,
        }
    }

    /// Committed rows overlaid with this context's staged changes, then
    /// composed by the query's stages
    fn materialize(&self, query: &Query) -> Vec<Value> {
        let stored = self.context.store().rows(E::table_name());
        let rows = self
            .context
            .tracker()
            .overlay(E::table_name(), E::key_field(), stored);
        apply_stages(rows, query.stages())
    }
}

impl<E: Entity> TableHandle<E> for MemoryTable<E> {
    fn find(&self, key: &E::Key) -> Result<Option<E>, StoreError> {
        let identity = key_identity(key)?;
        let mut tracker = self.context.tracker();

        // Unchanged entries fall through so bulk updates stay visible
        let row = match tracker.lookup(E::table_name(), &identity) {
            Some((EntryState::Deleted, _)) => return Ok(None),
            Some((state, row)) if state.is_pending() => row.clone(),
            _ => match self.context.store().get(E::table_name(), &identity) {
                Some(row) => {
                    tracker.attach_unchanged(TableMeta::of::<E>(), identity, row.clone());
                    row
                }
                None => return Ok(None),
            },
        };

        Ok(Some(E::from_row(row)?))
    }

    fn add(&self, entity: E) -> Result<EntryHandle<E>, StoreError> {
        self.context.tracker().add_entity(entity)
    }

    fn add_range(&self, entities: Vec<E>) -> Result<usize, StoreError> {
        self.context.tracker().add_entities(&entities)
    }

    fn remove(&self, entity: E) -> Result<EntryHandle<E>, StoreError> {
        self.context.tracker().remove_entity(entity)
    }

    fn remove_range(&self, entities: Vec<E>) -> Result<usize, StoreError> {
        let count = entities.len();
        let mut tracker = self.context.tracker();
        for entity in entities {
            tracker.remove_entity(entity)?;
        }
        Ok(count)
    }

    fn update(&self, entity: E) -> Result<EntryHandle<E>, StoreError> {
        self.context.tracker().update_entity(entity)
    }

    fn update_range(&self, entities: Vec<E>) -> Result<usize, StoreError> {
        let count = entities.len();
        let mut tracker = self.context.tracker();
        for entity in entities {
            tracker.update_entity(entity)?;
        }
        Ok(count)
    }

    fn to_list(&self, query: &Query) -> Result<Vec<E>, StoreError> {
        let rows = self.materialize(query);
        if query.is_tracking() {
            self.context.tracker().attach_rows::<E>(&rows);
        }
        rows.into_iter().map(E::from_row).collect()
    }

    fn count(&self, query: &Query) -> Result<u64, StoreError> {
        Ok(self.materialize(query).len() as u64)
    }

    fn any(&self, query: &Query) -> Result<bool, StoreError> {
        Ok(!self.materialize(query).is_empty())
    }

    fn all(&self, query: &Query, predicate: &QueryFilter) -> Result<bool, StoreError> {
        Ok(self
            .materialize(query)
            .iter()
            .all(|row| matches(predicate, row)))
    }

    fn execute_delete(&self, predicate: &QueryFilter) -> Result<u64, StoreError> {
        Ok(self.context.store().delete_where(E::table_name(), predicate))
    }

    fn execute_update(
        &self,
        predicate: &QueryFilter,
        update: &UpdateSet,
    ) -> Result<u64, StoreError> {
        if update.contains_field(E::key_field()) {
            return Err(StoreError::invalid_mutation(
                E::key_field(),
                "key columns cannot be mutated",
            ));
        }
        self.context.store().update_where::<E>(predicate, update)
    }
}
