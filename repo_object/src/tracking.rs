//! Change tracking for one connection handle
//!
//! Staged mutations are kept as JSON rows keyed by table and key identity,
//! in staging order, until the handle saves or discards them.

use crate::errors::StoreError;
use crate::traits::{key_identity, row_identity, Entity, TableMeta};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;

/// State of a tracked entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Tracked and identical to the store
    Unchanged,
    /// Staged for insertion
    Added,
    /// Staged for modification
    Modified,
    /// Staged for removal
    Deleted,
    /// No longer tracked
    Detached,
}

impl EntryState {
    /// Whether the state represents a staged change
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            EntryState::Added | EntryState::Modified | EntryState::Deleted
        )
    }
}

/// Result of staging a single entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntryHandle<E> {
    entity: E,
    state: EntryState,
}

impl<E> EntryHandle<E> {
    pub fn new(entity: E, state: EntryState) -> Self {
        Self { entity, state }
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn into_entity(self) -> E {
        self.entity
    }
}

/// One staged change, as handed to a backend on save
#[derive(Debug, Clone, PartialEq)]
pub struct StagedChange {
    pub meta: TableMeta,
    pub key: String,
    pub state: EntryState,
    pub row: Value,
}

#[derive(Debug, Clone)]
struct TrackedEntry {
    meta: TableMeta,
    state: EntryState,
    row: Value,
}

type EntryKey = (&'static str, String);

/// Identity map plus staged changes of one connection handle
#[derive(Debug, Default)]
pub struct ChangeTracker {
    entries: IndexMap<EntryKey, TrackedEntry>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only keys staged for insertion or modification conflict; whether an
    /// unchanged row still exists is left to the store at commit
    fn check_add(&self, meta: &TableMeta, key: &str) -> Result<(), StoreError> {
        match self.entries.get(&(meta.table, key.to_string())) {
            Some(entry) if matches!(entry.state, EntryState::Added | EntryState::Modified) => {
                Err(StoreError::duplicate_key(meta.table, key))
            }
            _ => Ok(()),
        }
    }

    fn apply_add(&mut self, meta: TableMeta, key: String, row: Value) -> EntryState {
        match self.entries.get_mut(&(meta.table, key.clone())) {
            // Re-adding a removed row replaces it
            Some(entry) if entry.state == EntryState::Deleted => {
                entry.state = EntryState::Modified;
                entry.row = row;
                EntryState::Modified
            }
            Some(entry) => {
                entry.state = EntryState::Added;
                entry.row = row;
                EntryState::Added
            }
            None => {
                self.entries.insert(
                    (meta.table, key),
                    TrackedEntry {
                        meta,
                        state: EntryState::Added,
                        row,
                    },
                );
                EntryState::Added
            }
        }
    }

    /// Stage an insertion
    pub fn stage_add(
        &mut self,
        meta: TableMeta,
        key: String,
        row: Value,
    ) -> Result<EntryState, StoreError> {
        self.check_add(&meta, &key)?;
        Ok(self.apply_add(meta, key, row))
    }

    /// Stage a batch of insertions; nothing is staged when any key conflicts
    pub fn stage_add_range(
        &mut self,
        meta: TableMeta,
        rows: Vec<(String, Value)>,
    ) -> Result<Vec<EntryState>, StoreError> {
        {
            let mut batch = HashSet::with_capacity(rows.len());
            for (key, _) in &rows {
                self.check_add(&meta, key)?;
                if !batch.insert(key.as_str()) {
                    return Err(StoreError::duplicate_key(meta.table, key));
                }
            }
        }

        Ok(rows
            .into_iter()
            .map(|(key, row)| self.apply_add(meta, key, row))
            .collect())
    }

    /// Stage a modification
    pub fn stage_update(&mut self, meta: TableMeta, key: String, row: Value) -> EntryState {
        match self.entries.get_mut(&(meta.table, key.clone())) {
            Some(entry) => {
                if entry.state != EntryState::Added {
                    entry.state = EntryState::Modified;
                }
                entry.row = row;
                entry.state
            }
            None => {
                self.entries.insert(
                    (meta.table, key),
                    TrackedEntry {
                        meta,
                        state: EntryState::Modified,
                        row,
                    },
                );
                EntryState::Modified
            }
        }
    }

    /// Stage a removal. Removing a row that was only staged for insertion
    /// forgets it instead.
    pub fn stage_remove(&mut self, meta: TableMeta, key: String, row: Value) -> EntryState {
        let entry_key = (meta.table, key);
        match self.entries.get(&entry_key).map(|entry| entry.state) {
            Some(EntryState::Added) => {
                self.entries.shift_remove(&entry_key);
                EntryState::Detached
            }
            // Replacing in place keeps the original staging position
            _ => {
                self.entries.insert(
                    entry_key,
                    TrackedEntry {
                        meta,
                        state: EntryState::Deleted,
                        row,
                    },
                );
                EntryState::Deleted
            }
        }
    }

    /// Start tracking a row read from the store; already tracked rows win
    pub fn attach_unchanged(&mut self, meta: TableMeta, key: String, row: Value) {
        self.entries
            .entry((meta.table, key))
            .or_insert(TrackedEntry {
                meta,
                state: EntryState::Unchanged,
                row,
            });
    }

    /// Tracked state and row for a key
    pub fn lookup(&self, table: &'static str, key: &str) -> Option<(EntryState, &Value)> {
        self.entries
            .get(&(table, key.to_string()))
            .map(|entry| (entry.state, &entry.row))
    }

    /// Merge staged changes into rows read from the store.
    ///
    /// Deleted rows are dropped, staged rows replace their stored version
    /// and staged rows the store does not have yet are appended in staging
    /// order.
    pub fn overlay(&self, table: &'static str, key_field: &str, rows: Vec<Value>) -> Vec<Value> {
        if !self.has_pending(table) {
            return rows;
        }

        let mut seen = HashSet::with_capacity(rows.len());
        let mut merged = Vec::with_capacity(rows.len());

        for row in rows {
            let key = row_identity(&row, key_field);
            match self.entries.get(&(table, key.clone())) {
                Some(entry) if entry.state == EntryState::Deleted => {}
                Some(entry) if entry.state.is_pending() => merged.push(entry.row.clone()),
                _ => merged.push(row),
            }
            seen.insert(key);
        }

        for ((entry_table, key), entry) in &self.entries {
            if *entry_table == table
                && matches!(entry.state, EntryState::Added | EntryState::Modified)
                && !seen.contains(key)
            {
                merged.push(entry.row.clone());
            }
        }

        crate::trace_log!(
            "[OVERLAY] table={} rows={} pending={}",
            table,
            merged.len(),
            self.pending_count()
        );

        merged
    }

    /// Snapshot of staged changes in staging order
    pub fn pending_changes(&self) -> Vec<StagedChange> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.state.is_pending())
            .map(|((_, key), entry)| StagedChange {
                meta: entry.meta,
                key: key.clone(),
                state: entry.state,
                row: entry.row.clone(),
            })
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.state.is_pending())
            .count()
    }

    pub fn has_pending(&self, table: &str) -> bool {
        self.entries
            .iter()
            .any(|((entry_table, _), entry)| *entry_table == table && entry.state.is_pending())
    }

    /// Mark every staged change as committed
    pub fn accept_all(&mut self) {
        self.entries
            .retain(|_, entry| entry.state != EntryState::Deleted);
        for entry in self.entries.values_mut() {
            entry.state = EntryState::Unchanged;
        }
    }

    /// Forget everything tracked
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Stage an entity for insertion
    pub fn add_entity<E: Entity>(&mut self, entity: E) -> Result<EntryHandle<E>, StoreError> {
        let key = key_identity(&entity.key())?;
        let state = self.stage_add(TableMeta::of::<E>(), key, entity.to_row()?)?;
        Ok(EntryHandle::new(entity, state))
    }

    /// Stage entities for insertion as one batch
    pub fn add_entities<E: Entity>(&mut self, entities: &[E]) -> Result<usize, StoreError> {
        let rows = entities
            .iter()
            .map(|entity| Ok((key_identity(&entity.key())?, entity.to_row()?)))
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(self.stage_add_range(TableMeta::of::<E>(), rows)?.len())
    }

    /// Stage an entity for modification
    pub fn update_entity<E: Entity>(&mut self, entity: E) -> Result<EntryHandle<E>, StoreError> {
        let key = key_identity(&entity.key())?;
        let state = self.stage_update(TableMeta::of::<E>(), key, entity.to_row()?);
        Ok(EntryHandle::new(entity, state))
    }

    /// Stage an entity for removal
    pub fn remove_entity<E: Entity>(&mut self, entity: E) -> Result<EntryHandle<E>, StoreError> {
        let key = key_identity(&entity.key())?;
        let state = self.stage_remove(TableMeta::of::<E>(), key, entity.to_row()?);
        Ok(EntryHandle::new(entity, state))
    }

    /// Attach every materialized row of an entity's table as unchanged
    pub fn attach_rows<E: Entity>(&mut self, rows: &[Value]) {
        for row in rows {
            self.attach_unchanged(
                TableMeta::of::<E>(),
                row_identity(row, E::key_field()),
                row.clone(),
            );
        }
    }
}
