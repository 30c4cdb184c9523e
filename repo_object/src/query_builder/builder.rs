use crate::errors::RepositoryError;
use crate::query_builder::descriptor::QueryDescriptor;
use crate::query_builder::query::Query;
use crate::traits::{Entity, TableHandle};

/// Composes a `QueryDescriptor` into a query over a table handle.
///
/// Stage order is fixed: filter, ordering, skip, take, then the read-only
/// hint. Without an ordering the row order is whatever the store yields and
/// is not guaranteed to be stable.
pub struct QueryBuilder;

impl QueryBuilder {
    pub fn build<E, T>(table: &T, descriptor: &QueryDescriptor) -> Result<Query, RepositoryError>
    where
        E: Entity,
        T: TableHandle<E> + ?Sized,
    {
        if let Some(page) = &descriptor.page {
            page.validate()?;
        }

        let mut query = table.as_queryable();

        if let Some(predicate) = &descriptor.predicate {
            query = query.filter(predicate.clone());
        }

        if let Some((key, direction)) = &descriptor.order {
            query = query.order_by(key.clone(), *direction);
        }

        if let Some(page) = &descriptor.page {
            query = query.skip(page.skip()).take(page.take());
        }

        if !descriptor.track {
            query = query.as_no_tracking();
        }

        crate::trace_log!(
            "[QUERY_BUILD] table={} stages={}",
            query.table(),
            query.stages().len()
        );

        Ok(query)
    }
}
