use crate::errors::StoreError;
use crate::pg_store::binding::{bind_params, row_value};
use crate::pg_store::context::PgContext;
use crate::query_builder::evaluation::{apply_stages, matches};
use crate::query_builder::sql_generation::ROW_ALIAS;
use crate::query_builder::{Query, QueryFilter, SqlGenerator, UpdateSet};
use crate::tracking::{EntryHandle, EntryState};
use crate::traits::{key_identity, run_cancellable, Entity, TableHandle, TableMeta};
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::Row;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Table handle of a `PgContext`
pub struct PgTable<E> {
    context: PgContext,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> PgTable<E> {
    pub(crate) fn new(context: PgContext) -> Self {
        Self {
            context,
            _entity: PhantomData,
        }
    }

    fn read_projection() -> String {
        format!("to_jsonb({}) AS __row__", ROW_ALIAS)
    }

    fn has_pending(&self) -> bool {
        self.context.tracker().has_pending(E::table_name())
    }

    async fn fetch_rows(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        debug!("[PG_SELECT] SQL: {}", sql);
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(self.context.pool())
            .await?;
        rows.iter().map(row_value).collect()
    }

    async fn fetch_flag(&self, sql: &str, params: Vec<Value>) -> Result<bool, StoreError> {
        debug!("[PG_SELECT] SQL: {}", sql);
        let row = bind_params(sqlx::query(sql), params)
            .fetch_one(self.context.pool())
            .await?;
        Ok(row.try_get::<bool, _>("flag")?)
    }

    /// Rows of a query, composed as the query describes.
    ///
    /// Without staged changes the whole query runs in PostgreSQL. Otherwise
    /// only the leading filters are pushed down; the staged rows are merged
    /// in and the remaining stages run in memory.
    async fn load(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        let pending = self.has_pending();
        let mut params = Vec::new();

        if !pending {
            let sql = SqlGenerator::build_select(query, &Self::read_projection(), &mut params)?;
            return self.fetch_rows(&sql, params).await;
        }

        let (filters, _) = query.leading_filters();
        let pushed = filters
            .into_iter()
            .fold(Query::new(query.table()), |pushed, filter| {
                pushed.filter(filter.clone())
            });
        let sql = SqlGenerator::build_select(&pushed, &Self::read_projection(), &mut params)?;
        let stored = self.fetch_rows(&sql, params).await?;

        let merged = self
            .context
            .tracker()
            .overlay(E::table_name(), E::key_field(), stored);
        crate::debug_log!(
            "[PG_OVERLAY] table={} merged_rows={}",
            E::table_name(),
            merged.len()
        );
        Ok(apply_stages(merged, query.stages()))
    }

    async fn find_row(&self, key: &E::Key) -> Result<Option<E>, StoreError> {
        let identity = key_identity(key)?;
        let tracked = self
            .context
            .tracker()
            .lookup(E::table_name(), &identity)
            .map(|(state, row)| (state, row.clone()));

        match tracked {
            Some((EntryState::Deleted, _)) => return Ok(None),
            Some((state, row)) if state.is_pending() => return Ok(Some(E::from_row(row)?)),
            _ => {}
        }

        let table = ValidatedTableName::new(E::table_name())?;
        let key_field = ValidatedFieldName::new(E::key_field())?;
        let sql = format!(
            "SELECT {} FROM {} AS {} WHERE {} = $1",
            Self::read_projection(),
            table,
            ROW_ALIAS,
            key_field
        );
        let rows = self
            .fetch_rows(&sql, vec![serde_json::to_value(key)?])
            .await?;

        match rows.into_iter().next() {
            Some(row) => {
                self.context
                    .tracker()
                    .attach_unchanged(TableMeta::of::<E>(), identity, row.clone());
                Ok(Some(E::from_row(row)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, query: &Query) -> Result<Vec<E>, StoreError> {
        let rows = self.load(query).await?;
        if query.is_tracking() {
            self.context.tracker().attach_rows::<E>(&rows);
        }
        rows.into_iter().map(E::from_row).collect()
    }

    async fn count_rows(&self, query: &Query) -> Result<u64, StoreError> {
        if self.has_pending() {
            return Ok(self.load(query).await?.len() as u64);
        }

        let mut params = Vec::new();
        let inner = SqlGenerator::build_select(query, "*", &mut params)?;
        let sql = format!("SELECT COUNT(*) AS total FROM ({}) AS counted", inner);
        debug!("[PG_COUNT] SQL: {}", sql);

        let row = bind_params(sqlx::query(&sql), params)
            .fetch_one(self.context.pool())
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn any_rows(&self, query: &Query) -> Result<bool, StoreError> {
        if self.has_pending() {
            return Ok(!self.load(query).await?.is_empty());
        }

        let mut params = Vec::new();
        let inner = SqlGenerator::build_select(query, "*", &mut params)?;
        self.fetch_flag(&format!("SELECT EXISTS({}) AS flag", inner), params)
            .await
    }

    async fn all_rows(&self, query: &Query, predicate: &QueryFilter) -> Result<bool, StoreError> {
        if self.has_pending() {
            let rows = self.load(query).await?;
            return Ok(rows.iter().all(|row| matches(predicate, row)));
        }

        let mut params = Vec::new();
        let inner = SqlGenerator::build_select(query, "*", &mut params)?;
        let condition = SqlGenerator::build_filter_sql(predicate, &mut params)?;
        let sql = format!(
            "SELECT NOT EXISTS(SELECT 1 FROM ({}) AS checked WHERE NOT COALESCE({}, FALSE)) AS flag",
            inner, condition
        );
        self.fetch_flag(&sql, params).await
    }

    async fn delete_rows(&self, predicate: &QueryFilter) -> Result<u64, StoreError> {
        let table = ValidatedTableName::new(E::table_name())?;
        let mut params = Vec::new();
        let where_clause = SqlGenerator::build_where_clause(predicate, &mut params)?;
        let sql = format!("DELETE FROM {} {}", table, where_clause);

        debug!("[DELETE_WHERE] Table: {}", table);
        debug!("[DELETE_WHERE] SQL: {}", sql);

        let result = bind_params(sqlx::query(&sql), params)
            .execute(self.context.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn update_rows(
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

        let table = ValidatedTableName::new(E::table_name())?;
        // SET parameters are numbered first, WHERE parameters continue after them
        let mut params = Vec::new();
        let set_clause = SqlGenerator::build_set_clause(update, &mut params)?;
        let where_clause = SqlGenerator::build_where_clause(predicate, &mut params)?;
        let sql = format!("UPDATE {} SET {} {}", table, set_clause, where_clause);

        debug!("[UPDATE_WHERE] Table: {}", table);
        debug!("[UPDATE_WHERE] SQL: {}", sql);
        debug!("[UPDATE_WHERE] params count: {}", params.len());

        let result = bind_params(sqlx::query(&sql), params)
            .execute(self.context.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl<E: Entity> TableHandle<E> for PgTable<E> {
    fn find(&self, key: &E::Key) -> Result<Option<E>, StoreError> {
        self.context.block_on(self.find_row(key))
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
        self.context.block_on(self.list(query))
    }

    fn count(&self, query: &Query) -> Result<u64, StoreError> {
        self.context.block_on(self.count_rows(query))
    }

    fn any(&self, query: &Query) -> Result<bool, StoreError> {
        self.context.block_on(self.any_rows(query))
    }

    fn all(&self, query: &Query, predicate: &QueryFilter) -> Result<bool, StoreError> {
        self.context.block_on(self.all_rows(query, predicate))
    }

    fn execute_delete(&self, predicate: &QueryFilter) -> Result<u64, StoreError> {
        self.context.block_on(self.delete_rows(predicate))
    }

    fn execute_update(
        &self,
        predicate: &QueryFilter,
        update: &UpdateSet,
    ) -> Result<u64, StoreError> {
        self.context.block_on(self.update_rows(predicate, update))
    }

    async fn find_async(
        &self,
        key: &E::Key,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, StoreError> {
        run_cancellable(cancel, self.find_row(key)).await
    }

    async fn to_list_async(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, StoreError> {
        run_cancellable(cancel, self.list(query)).await
    }

    async fn count_async(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        run_cancellable(cancel, self.count_rows(query)).await
    }

    async fn any_async(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError> {
        run_cancellable(cancel, self.any_rows(query)).await
    }

    async fn all_async(
        &self,
        query: &Query,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError> {
        run_cancellable(cancel, self.all_rows(query, predicate)).await
    }

    async fn execute_delete_async(
        &self,
        predicate: &QueryFilter,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        run_cancellable(cancel, self.delete_rows(predicate)).await
    }

    async fn execute_update_async(
        &self,
        predicate: &QueryFilter,
        update: &UpdateSet,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        run_cancellable(cancel, self.update_rows(predicate, update)).await
    }
}
