use crate::errors::StoreError;
use crate::pg_store::table::PgTable;
use crate::tracking::{ChangeTracker, EntryState, StagedChange};
use crate::traits::{run_cancellable, Entity, StoreContext};
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use async_trait::async_trait;
use sqlx::PgPool;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct ContextInner {
    pool: PgPool,
    tracker: Mutex<ChangeTracker>,
    runtime: Option<Handle>,
}

/// One unit of work over a PostgreSQL pool.
///
/// Staged changes are applied in a single transaction on save. Synchronous
/// operations block on the runtime captured when the context was created.
#[derive(Clone)]
pub struct PgContext {
    inner: Arc<ContextInner>,
}

impl PgContext {
    /// Create a context, capturing the current Tokio runtime if there is one
    pub fn new(pool: PgPool) -> Self {
        Self::with_runtime(pool, Handle::try_current().ok())
    }

    pub fn with_runtime(pool: PgPool, runtime: Option<Handle>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                pool,
                tracker: Mutex::new(ChangeTracker::new()),
                runtime,
            }),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
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

    /// Run a store future to completion from synchronous code
    pub(crate) fn block_on<T, F>(&self, future: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let runtime = self.inner.runtime.as_ref().ok_or(StoreError::NoRuntime)?;
        match Handle::try_current() {
            Ok(current) if current.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| runtime.block_on(future))
            }
            // Blocking a current-thread runtime from inside itself would deadlock
            Ok(_) => Err(StoreError::NoRuntime),
            Err(_) => runtime.block_on(future),
        }
    }

    async fn commit(&self) -> Result<u64, StoreError> {
        let changes = self.tracker().pending_changes();
        if changes.is_empty() {
            return Ok(0);
        }

        let mut tx = self.inner.pool.begin().await?;
        let mut affected = 0u64;

        for change in &changes {
            let sql = change_statement(change)?;
            debug!("[PG_SAVE] SQL: {}", sql);

            let result = sqlx::query(&sql)
                .bind(&change.row)
                .execute(&mut *tx)
                .await
                .map_err(|err| map_write_error(err, change))?;

            if result.rows_affected() == 0 {
                warn!(
                    "[PG_SAVE] no row with key {} in table {}, rolling back",
                    change.key, change.meta.table
                );
                return Err(StoreError::concurrency(
                    change.meta.table,
                    format!("row with key {} no longer exists", change.key),
                ));
            }
            affected += result.rows_affected();
        }

        tx.commit().await?;
        self.tracker().accept_all();

        debug!("[PG_SAVE] committed {} staged changes", changes.len());
        Ok(affected)
    }
}

impl std::fmt::Debug for PgContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgContext")
            .field("pending_changes", &self.pending_changes())
            .field("has_runtime", &self.inner.runtime.is_some())
            .finish()
    }
}

/// Unique violations on insert surface as duplicate keys
fn map_write_error(err: sqlx::Error, change: &StagedChange) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::duplicate_key(change.meta.table, &change.key)
        }
        _ => StoreError::Database(err),
    }
}

/// Statement applying one staged change; the row is always bound as `$1`
fn change_statement(change: &StagedChange) -> Result<String, StoreError> {
    let table = ValidatedTableName::new(change.meta.table)?;
    let key = ValidatedFieldName::new(change.meta.key_field)?;
    let record = format!("jsonb_populate_record(NULL::{}, $1)", table);

    let sql = match change.state {
        EntryState::Added => format!("INSERT INTO {} SELECT * FROM {}", table, record),
        EntryState::Modified => {
            let columns = change
                .meta
                .columns
                .iter()
                .filter(|column| **column != change.meta.key_field)
                .map(|column| ValidatedFieldName::new(column).map(|field| field.to_string()))
                .collect::<Result<Vec<_>, _>>()?;

            if columns.is_empty() {
                format!(
                    "UPDATE {table} SET {key} = {key} WHERE {key} = (SELECT {key} FROM {record})"
                )
            } else {
                let columns = columns.join(", ");
                format!(
                    "UPDATE {table} SET ({columns}) = (SELECT {columns} FROM {record}) WHERE {key} = (SELECT {key} FROM {record})"
                )
            }
        }
        EntryState::Deleted => format!(
            "DELETE FROM {table} WHERE {key} = (SELECT {key} FROM {record})"
        ),
        EntryState::Unchanged | EntryState::Detached => {
            return Err(StoreError::concurrency(
                change.meta.table,
                format!("entry {} has nothing to save", change.key),
            ));
        }
    };

    Ok(sql)
}

#[async_trait]
impl StoreContext for PgContext {
    type Table<E: Entity> = PgTable<E>;

    fn set<E: Entity>(&self) -> PgTable<E> {
        PgTable::new(self.clone())
    }

    fn save_changes(&self) -> Result<u64, StoreError> {
        self.block_on(self.commit())
    }

    async fn save_changes_async(&self, cancel: &CancellationToken) -> Result<u64, StoreError> {
        run_cancellable(cancel, self.commit()).await
    }

    fn pending_changes(&self) -> usize {
        self.tracker().pending_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TableMeta;
    use serde_json::json;

    fn change(state: EntryState) -> StagedChange {
        StagedChange {
            meta: TableMeta {
                table: "users",
                key_field: "id",
                columns: &["id", "name", "age"],
            },
            key: "1".to_string(),
            state,
            row: json!({ "id": 1, "name": "a", "age": 30 }),
        }
    }

    #[test]
    fn test_insert_populates_record_from_json() {
        assert_eq!(
            change_statement(&change(EntryState::Added)).unwrap(),
            "INSERT INTO users SELECT * FROM jsonb_populate_record(NULL::users, $1)"
        );
    }

    #[test]
    fn test_update_sets_every_non_key_column() {
        let sql = change_statement(&change(EntryState::Modified)).unwrap();
        assert!(sql.starts_with("UPDATE users SET (name, age) = (SELECT name, age FROM"));
        assert!(sql.ends_with("WHERE id = (SELECT id FROM jsonb_populate_record(NULL::users, $1))"));
    }

    #[test]
    fn test_delete_matches_on_key() {
        assert_eq!(
            change_statement(&change(EntryState::Deleted)).unwrap(),
            "DELETE FROM users WHERE id = (SELECT id FROM jsonb_populate_record(NULL::users, $1))"
        );
    }

    #[test]
    fn test_unchanged_entries_are_not_saved() {
        assert!(change_statement(&change(EntryState::Unchanged)).is_err());
    }
}
