use crate::query_builder::filter::QueryFilter;
use crate::query_builder::ordering::{OrderKey, SortDirection};
use crate::query_builder::pagination::PaginationRequest;

/// Options for one bulk read, assembled per call.
///
/// Every field is optional. `track` defaults to `false`, so results are
/// fetched read-only unless the caller asks for tracking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDescriptor {
    pub predicate: Option<QueryFilter>,
    pub order: Option<(OrderKey, SortDirection)>,
    pub page: Option<PaginationRequest>,
    pub track: bool,
}

impl QueryDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate; a second call ANDs it with the first
    pub fn filter(mut self, predicate: QueryFilter) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and_also(predicate),
            None => predicate,
        });
        self
    }

    pub fn order_by(mut self, key: impl Into<OrderKey>, direction: SortDirection) -> Self {
        self.order = Some((key.into(), direction));
        self
    }

    pub fn page(mut self, page: PaginationRequest) -> Self {
        self.page = Some(page);
        self
    }

    pub fn track(mut self, track: bool) -> Self {
        self.track = track;
        self
    }
}
