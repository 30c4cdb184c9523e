//! SQL rendering for composed queries
//!
//! Parameters are collected into one shared vector, so placeholders stay
//! correctly numbered across nested sub-selects and SET/WHERE pairs.

use crate::errors::StoreError;
use crate::query_builder::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use crate::query_builder::ordering::{OrderKey, SortDirection};
use crate::query_builder::query::{Query, QueryStage};
use crate::query_builder::update::UpdateSet;
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use serde_json::Value;

/// Alias of the outermost row source; projections may reference it
pub const ROW_ALIAS: &str = "r";

pub struct SqlGenerator;

/// Clauses of one SELECT level
#[derive(Default)]
struct Segment {
    filters: Vec<String>,
    order: Option<String>,
    offset: u64,
    limit: Option<u64>,
}

impl Segment {
    fn is_limited(&self) -> bool {
        self.offset > 0 || self.limit.is_some()
    }

    fn render(&self, projection: &str, source: &str, alias: &str) -> String {
        let mut sql = format!("SELECT {} FROM {} AS {}", projection, source, alias);
        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.filters.join(" AND "));
        }
        if let Some(order) = &self.order {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        let limit_clause = SqlGenerator::build_limit_clause(self.limit, self.offset);
        if !limit_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&limit_clause);
        }
        sql
    }
}

fn placeholder(params: &mut Vec<Value>, value: &Value) -> String {
    params.push(value.clone());
    format!("${}", params.len())
}

// A bound NULL carries a parameter type, so it is written inline instead
fn operand(params: &mut Vec<Value>, value: &Value) -> String {
    if value.is_null() {
        "NULL".to_string()
    } else {
        placeholder(params, value)
    }
}

impl SqlGenerator {
    /// Build a WHERE clause for a single predicate
    pub fn build_where_clause(
        filter: &QueryFilter,
        params: &mut Vec<Value>,
    ) -> Result<String, StoreError> {
        Ok(format!("WHERE {}", Self::build_filter_sql(filter, params)?))
    }

    /// Render a predicate as a boolean SQL expression
    pub fn build_filter_sql(
        filter: &QueryFilter,
        params: &mut Vec<Value>,
    ) -> Result<String, StoreError> {
        match filter {
            QueryFilter::Condition(condition) => Self::build_condition_sql(condition, params),
            QueryFilter::Group { operator, filters } => {
                if filters.is_empty() {
                    return Ok(match operator {
                        LogicalOperator::And => "TRUE".to_string(),
                        LogicalOperator::Or => "FALSE".to_string(),
                    });
                }

                let operator_str = match operator {
                    LogicalOperator::And => " AND ",
                    LogicalOperator::Or => " OR ",
                };

                let group_conditions = filters
                    .iter()
                    .map(|f| Self::build_filter_sql(f, params))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(operator_str);

                Ok(format!("({})", group_conditions))
            }
            QueryFilter::Not(inner) => Ok(format!("NOT ({})", Self::build_filter_sql(inner, params)?)),
        }
    }

    fn build_condition_sql(
        condition: &QueryCondition,
        params: &mut Vec<Value>,
    ) -> Result<String, StoreError> {
        let field = ValidatedFieldName::new(&condition.field)?;
        let value = condition.value.as_ref().filter(|value| !value.is_null());

        let sql = match (condition.operator, value) {
            (QueryOperator::IsNull, _) | (QueryOperator::Eq, None) => {
                format!("{} IS NULL", field)
            }
            (QueryOperator::IsNotNull, _) | (QueryOperator::Ne, None) => {
                format!("{} IS NOT NULL", field)
            }
            // Comparing against NULL is unknown, never true or false
            (_, None) => "NULL".to_string(),
            (QueryOperator::Eq, Some(value)) => {
                format!("{} = {}", field, placeholder(params, value))
            }
            (QueryOperator::Ne, Some(value)) => {
                format!("{} != {}", field, placeholder(params, value))
            }
            (QueryOperator::Gt, Some(value)) => {
                format!("{} > {}", field, placeholder(params, value))
            }
            (QueryOperator::Gte, Some(value)) => {
                format!("{} >= {}", field, placeholder(params, value))
            }
            (QueryOperator::Lt, Some(value)) => {
                format!("{} < {}", field, placeholder(params, value))
            }
            (QueryOperator::Lte, Some(value)) => {
                format!("{} <= {}", field, placeholder(params, value))
            }
            (QueryOperator::Like, Some(value)) => {
                format!("{} LIKE {}", field, placeholder(params, value))
            }
            (QueryOperator::ILike, Some(value)) => {
                format!("{} ILIKE {}", field, placeholder(params, value))
            }
            (operator @ (QueryOperator::In | QueryOperator::NotIn), Some(value)) => {
                let members = match value {
                    Value::Array(members) => members.as_slice(),
                    single => std::slice::from_ref(single),
                };
                let negated = operator == QueryOperator::NotIn;

                if members.is_empty() {
                    return Ok(if negated { "TRUE" } else { "FALSE" }.to_string());
                }

                let placeholders = members
                    .iter()
                    .map(|member| operand(params, member))
                    .collect::<Vec<_>>()
                    .join(", ");

                if negated {
                    format!("{} NOT IN ({})", field, placeholders)
                } else {
                    format!("{} IN ({})", field, placeholders)
                }
            }
        };

        Ok(sql)
    }

    /// Build an ORDER BY item
    pub fn build_order_clause(
        key: &OrderKey,
        direction: SortDirection,
    ) -> Result<String, StoreError> {
        let field = ValidatedFieldName::new(key.field())?;
        Ok(format!("{} {}", field, direction.to_sql()))
    }

    /// Build LIMIT/OFFSET clause
    pub fn build_limit_clause(limit: Option<u64>, offset: u64) -> String {
        let mut clauses = Vec::new();

        if let Some(limit) = limit {
            clauses.push(format!("LIMIT {}", limit.min(i64::MAX as u64)));
        }

        if offset > 0 {
            clauses.push(format!("OFFSET {}", offset.min(i64::MAX as u64)));
        }

        clauses.join(" ")
    }

    /// Render a query as a SELECT over its table.
    ///
    /// Filters and orderings that follow a skip or take are applied to a
    /// nested sub-select so the stage sequence keeps its meaning.
    pub fn build_select(
        query: &Query,
        projection: &str,
        params: &mut Vec<Value>,
    ) -> Result<String, StoreError> {
        let table = ValidatedTableName::new(query.table())?;
        let mut source = table.to_string();
        let mut depth = 0usize;
        let mut segment = Segment::default();

        for stage in query.stages() {
            if matches!(stage, QueryStage::Filter(_) | QueryStage::OrderBy { .. })
                && segment.is_limited()
            {
                source = format!("({})", segment.render("*", &source, &format!("q{}", depth)));
                depth += 1;
                segment = Segment::default();
            }

            match stage {
                QueryStage::Filter(filter) => {
                    segment.filters.push(Self::build_filter_sql(filter, params)?);
                }
                QueryStage::OrderBy { key, direction } => {
                    segment.order = Some(Self::build_order_clause(key, *direction)?);
                }
                QueryStage::Skip(count) => {
                    segment.offset = segment.offset.saturating_add(*count);
                    segment.limit = segment.limit.map(|limit| limit.saturating_sub(*count));
                }
                QueryStage::Take(count) => {
                    segment.limit = Some(segment.limit.map_or(*count, |limit| limit.min(*count)));
                }
                QueryStage::NoTracking => {}
            }
        }

        Ok(segment.render(projection, &source, ROW_ALIAS))
    }

    /// Build the assignments of an UPDATE statement
    pub fn build_set_clause(
        update: &UpdateSet,
        params: &mut Vec<Value>,
    ) -> Result<String, StoreError> {
        if update.is_empty() {
            return Err(StoreError::invalid_mutation("*", "update set is empty"));
        }

        let assignments = update
            .operations()
            .map(|(field, operation)| {
                let field = ValidatedFieldName::new(field)?;
                let value = operand(params, operation.value());
                Ok(operation.to_sql(field.as_str(), &value))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(assignments.join(", "))
    }
}
