use crate::errors::StoreError;
use crate::memory_store::context::MemoryContext;
use crate::query_builder::evaluation::{apply_update, matches};
use crate::query_builder::{QueryFilter, UpdateSet};
use crate::tracking::{EntryState, StagedChange};
use crate::traits::Entity;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Rows of one table keyed by key identity, in insertion order
type Rows = IndexMap<String, Value>;

/// Shared in-memory store.
///
/// Cloning is cheap and every clone sees the same tables. Each unit of work
/// opens its own `MemoryContext` over it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Rows>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new connection handle over this store
    pub fn context(&self) -> MemoryContext {
        MemoryContext::new(self.clone())
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Rows>> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Rows>> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of committed rows in a table
    pub fn len(&self, table: &str) -> usize {
        self.read().get(table).map_or(0, IndexMap::len)
    }

    /// Whether a table holds no committed rows
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Snapshot of a table's committed rows
    pub(crate) fn rows(&self, table: &str) -> Vec<Value> {
        self.read()
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn get(&self, table: &str, key: &str) -> Option<Value> {
        self.read().get(table).and_then(|rows| rows.get(key).cloned())
    }

    /// Apply staged changes atomically: all of them or none
    pub(crate) fn commit(&self, changes: &[StagedChange]) -> Result<u64, StoreError> {
        let mut tables = self.write();

        // Replay the changes against key existence first
        let mut exists: HashMap<(&str, &str), bool> = HashMap::new();
        for change in changes {
            let slot = (change.meta.table, change.key.as_str());
            let present = match exists.get(&slot) {
                Some(present) => *present,
                None => tables
                    .get(change.meta.table)
                    .is_some_and(|rows| rows.contains_key(&change.key)),
            };

            match change.state {
                EntryState::Added if present => {
                    return Err(StoreError::duplicate_key(change.meta.table, &change.key));
                }
                EntryState::Modified | EntryState::Deleted if !present => {
                    return Err(StoreError::concurrency(
                        change.meta.table,
                        format!("row with key {} no longer exists", change.key),
                    ));
                }
                _ => {}
            }

            exists.insert(slot, change.state != EntryState::Deleted);
        }

        for change in changes {
            let rows = tables.entry(change.meta.table.to_string()).or_default();
            match change.state {
                EntryState::Added | EntryState::Modified => {
                    rows.insert(change.key.clone(), change.row.clone());
                }
                EntryState::Deleted => {
                    rows.shift_remove(&change.key);
                }
                EntryState::Unchanged | EntryState::Detached => {}
            }
        }

        debug!("[MEMORY_COMMIT] applied {} staged changes", changes.len());
        Ok(changes.len() as u64)
    }

    /// Delete matching committed rows
    pub(crate) fn delete_where(&self, table: &str, filter: &QueryFilter) -> u64 {
        let mut tables = self.write();
        let Some(rows) = tables.get_mut(table) else {
            return 0;
        };

        let before = rows.len();
        rows.retain(|_, row| !matches(filter, row));
        let deleted = (before - rows.len()) as u64;

        debug!("[MEMORY_DELETE_WHERE] table={} deleted={}", table, deleted);
        deleted
    }

    /// Mutate matching committed rows; every mutated row must still
    /// deserialize into `E` or nothing is changed
    pub(crate) fn update_where<E: Entity>(
        &self,
        filter: &QueryFilter,
        update: &UpdateSet,
    ) -> Result<u64, StoreError> {
        let table = E::table_name();
        let mut tables = self.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };

        let mut updated = Vec::new();
        for (key, row) in rows.iter() {
            if matches(filter, row) {
                let mut candidate = row.clone();
                apply_update(&mut candidate, update)?;
                E::from_row(candidate.clone())?;
                updated.push((key.clone(), candidate));
            }
        }

        let count = updated.len() as u64;
        for (key, row) in updated {
            rows.insert(key, row);
        }

        debug!("[MEMORY_UPDATE_WHERE] table={} updated={}", table, count);
        Ok(count)
    }
}
