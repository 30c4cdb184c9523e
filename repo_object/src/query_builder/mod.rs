//! Query construction
//!
//! Predicates, orderings, pages and mutations as plain values, the
//! `QueryBuilder` that composes them into a `Query`, and the two ways a
//! `Query` gets executed: rendered to SQL or evaluated in memory.

pub mod builder;
pub mod descriptor;
pub mod evaluation;
pub mod filter;
pub mod ordering;
pub mod pagination;
pub mod query;
pub mod sql_generation;
pub mod update;

#[cfg(test)]
mod tests;

pub use builder::QueryBuilder;
pub use descriptor::QueryDescriptor;
pub use filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
pub use ordering::{OrderKey, SortDirection};
pub use pagination::PaginationRequest;
pub use query::{Query, QueryStage};
pub use sql_generation::SqlGenerator;
pub use update::{UpdateOperation, UpdateSet};
