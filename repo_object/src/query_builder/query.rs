//! Composed, not-yet-executed queries

use crate::query_builder::filter::QueryFilter;
use crate::query_builder::ordering::{OrderKey, SortDirection};

/// One composition step. Stages apply in sequence with LINQ semantics: a
/// later ordering replaces an earlier one, consecutive skips add up and
/// consecutive takes keep the smaller limit.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryStage {
    Filter(QueryFilter),
    OrderBy {
        key: OrderKey,
        direction: SortDirection,
    },
    Skip(u64),
    Take(u64),
    /// Read-only fetch hint: results are not attached to the change tracker
    NoTracking,
}

/// A query over one table, executed by a `TableHandle`
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    stages: Vec<QueryStage>,
}

impl Query {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            stages: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn stages(&self) -> &[QueryStage] {
        &self.stages
    }

    pub fn filter(self, filter: QueryFilter) -> Self {
        self.stage(QueryStage::Filter(filter))
    }

    pub fn order_by(self, key: impl Into<OrderKey>, direction: SortDirection) -> Self {
        self.stage(QueryStage::OrderBy {
            key: key.into(),
            direction,
        })
    }

    pub fn skip(self, count: u64) -> Self {
        self.stage(QueryStage::Skip(count))
    }

    pub fn take(self, count: u64) -> Self {
        self.stage(QueryStage::Take(count))
    }

    pub fn as_no_tracking(self) -> Self {
        self.stage(QueryStage::NoTracking)
    }

    fn stage(mut self, stage: QueryStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Whether materialized rows are attached to the change tracker
    pub fn is_tracking(&self) -> bool {
        !self.stages.contains(&QueryStage::NoTracking)
    }

    /// Split into the leading run of filter stages and everything after it
    pub fn leading_filters(&self) -> (Vec<&QueryFilter>, &[QueryStage]) {
        let split = self
            .stages
            .iter()
            .position(|stage| !matches!(stage, QueryStage::Filter(_) | QueryStage::NoTracking))
            .unwrap_or(self.stages.len());
        let filters = self.stages[..split]
            .iter()
            .filter_map(|stage| match stage {
                QueryStage::Filter(filter) => Some(filter),
                _ => None,
            })
            .collect();
        (filters, &self.stages[split..])
    }
}
