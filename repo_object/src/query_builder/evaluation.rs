//! In-memory execution of composed queries over JSON rows
//!
//! Predicates follow SQL three-valued logic: any comparison involving NULL is
//! unknown, and a row only matches when its predicate is definitely true.

use crate::errors::StoreError;
use crate::query_builder::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use crate::query_builder::ordering::SortDirection;
use crate::query_builder::query::QueryStage;
use crate::query_builder::update::{UpdateOperation, UpdateSet};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Evaluate a predicate; `None` is SQL's unknown
pub fn evaluate(filter: &QueryFilter, row: &Value) -> Option<bool> {
    match filter {
        QueryFilter::Condition(condition) => evaluate_condition(condition, row),
        QueryFilter::Group {
            operator: LogicalOperator::And,
            filters,
        } => {
            let mut result = Some(true);
            for filter in filters {
                match evaluate(filter, row) {
                    Some(false) => return Some(false),
                    None => result = None,
                    Some(true) => {}
                }
            }
            result
        }
        QueryFilter::Group {
            operator: LogicalOperator::Or,
            filters,
        } => {
            let mut result = Some(false);
            for filter in filters {
                match evaluate(filter, row) {
                    Some(true) => return Some(true),
                    None => result = None,
                    Some(false) => {}
                }
            }
            result
        }
        QueryFilter::Not(inner) => evaluate(inner, row).map(|value| !value),
    }
}

/// Whether the predicate is definitely true for the row
pub fn matches(filter: &QueryFilter, row: &Value) -> bool {
    evaluate(filter, row) == Some(true)
}

fn field_value<'a>(row: &'a Value, field: &str) -> &'a Value {
    row.get(field).unwrap_or(&Value::Null)
}

fn evaluate_condition(condition: &QueryCondition, row: &Value) -> Option<bool> {
    let actual = field_value(row, &condition.field);
    let operand = condition.value.as_ref().filter(|value| !value.is_null());

    match (condition.operator, operand) {
        (QueryOperator::IsNull, _) | (QueryOperator::Eq, None) => Some(actual.is_null()),
        (QueryOperator::IsNotNull, _) | (QueryOperator::Ne, None) => Some(!actual.is_null()),
        (_, None) => None,
        (operator, Some(expected)) => {
            if actual.is_null() {
                return None;
            }
            match operator {
                QueryOperator::Eq => sql_compare(actual, expected).map(Ordering::is_eq),
                QueryOperator::Ne => sql_compare(actual, expected).map(Ordering::is_ne),
                QueryOperator::Gt => sql_compare(actual, expected).map(Ordering::is_gt),
                QueryOperator::Gte => sql_compare(actual, expected).map(Ordering::is_ge),
                QueryOperator::Lt => sql_compare(actual, expected).map(Ordering::is_lt),
                QueryOperator::Lte => sql_compare(actual, expected).map(Ordering::is_le),
                QueryOperator::Like => like(actual, expected, false),
                QueryOperator::ILike => like(actual, expected, true),
                QueryOperator::In => in_list(actual, expected),
                QueryOperator::NotIn => match expected {
                    Value::Array(members) if members.is_empty() => Some(true),
                    _ => in_list(actual, expected).map(|found| !found),
                },
                QueryOperator::IsNull | QueryOperator::IsNotNull => None,
            }
        }
    }
}

fn in_list(actual: &Value, expected: &Value) -> Option<bool> {
    let members = match expected {
        Value::Array(members) => members.as_slice(),
        single => std::slice::from_ref(single),
    };

    let mut result = Some(false);
    for member in members {
        if member.is_null() {
            result = None;
            continue;
        }
        match sql_compare(actual, member) {
            Some(Ordering::Equal) => return Some(true),
            None => result = None,
            Some(_) => {}
        }
    }
    result
}

/// Compare two non-null scalars of the same kind
fn sql_compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            (left == right).then_some(Ordering::Equal)
        }
        _ => None,
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (a.as_i64(), b.as_i64()) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn like(actual: &Value, pattern: &Value, case_insensitive: bool) -> Option<bool> {
    let (Value::String(text), Value::String(pattern)) = (actual, pattern) else {
        return None;
    };
    if case_insensitive {
        Some(like_match(&text.to_lowercase(), &pattern.to_lowercase()))
    } else {
        Some(like_match(text, pattern))
    }
}

/// LIKE matching with `%`, `_` and backslash escapes
fn like_match(text: &str, pattern: &str) -> bool {
    enum Token {
        Any,
        One,
        Literal(char),
    }

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            other => Token::Literal(other),
        });
    }

    let text: Vec<char> = text.chars().collect();
    // reachable[i]: the tokens consumed so far can match text[..i]
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;

    for token in &tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::Any => {
                let mut seen = false;
                for i in 0..=text.len() {
                    seen |= reachable[i];
                    next[i] = seen;
                }
            }
            Token::One => {
                for i in 0..text.len() {
                    next[i + 1] = reachable[i];
                }
            }
            Token::Literal(expected) => {
                for i in 0..text.len() {
                    next[i + 1] = reachable[i] && text[i] == *expected;
                }
            }
        }
        reachable = next;
    }

    reachable[text.len()]
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) => 3,
        Value::Object(_) => 4,
        Value::Null => 5,
    }
}

/// Total order used for sorting: NULL sorts after every other value
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b).unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| compare_values(x, y))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        _ => kind_rank(left).cmp(&kind_rank(right)),
    }
}

/// Apply composed stages to rows, in sequence
pub fn apply_stages(mut rows: Vec<Value>, stages: &[QueryStage]) -> Vec<Value> {
    for stage in stages {
        match stage {
            QueryStage::Filter(filter) => rows.retain(|row| matches(filter, row)),
            QueryStage::OrderBy { key, direction } => {
                // sort_by is stable, rows with equal keys keep their relative order
                rows.sort_by(|a, b| {
                    let ordering =
                        compare_values(field_value(a, key.field()), field_value(b, key.field()));
                    match direction {
                        SortDirection::Ascending => ordering,
                        SortDirection::Descending => ordering.reverse(),
                    }
                });
            }
            QueryStage::Skip(count) => {
                let count = usize::try_from(*count).unwrap_or(usize::MAX).min(rows.len());
                rows.drain(..count);
            }
            QueryStage::Take(count) => {
                rows.truncate(usize::try_from(*count).unwrap_or(usize::MAX));
            }
            QueryStage::NoTracking => {}
        }
    }
    rows
}

/// Apply a mutation to one row in place.
///
/// Arithmetic with a NULL operand or field yields NULL, integer division
/// truncates toward zero, and dividing by zero fails.
pub fn apply_update(row: &mut Value, update: &UpdateSet) -> Result<(), StoreError> {
    let Value::Object(fields) = row else {
        return Err(StoreError::invalid_mutation("*", "row is not an object"));
    };

    for (field, operation) in update.operations() {
        let current = fields
            .get_mut(field)
            .ok_or_else(|| StoreError::invalid_mutation(field, "unknown column"))?;

        let updated = match operation {
            UpdateOperation::Set(value) => value.clone(),
            _ => arithmetic(field, current, operation)?,
        };
        *current = updated;
    }

    Ok(())
}

fn arithmetic(
    field: &str,
    current: &Value,
    operation: &UpdateOperation,
) -> Result<Value, StoreError> {
    let operand = operation.value();
    if current.is_null() || operand.is_null() {
        return Ok(Value::Null);
    }

    let (Value::Number(left), Value::Number(right)) = (current, operand) else {
        return Err(StoreError::invalid_mutation(
            field,
            "arithmetic requires numeric values",
        ));
    };

    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        let result = match operation {
            UpdateOperation::Increment(_) => a.checked_add(b),
            UpdateOperation::Decrement(_) => a.checked_sub(b),
            UpdateOperation::Multiply(_) => a.checked_mul(b),
            UpdateOperation::Divide(_) if b == 0 => {
                return Err(StoreError::invalid_mutation(field, "division by zero"));
            }
            UpdateOperation::Divide(_) => a.checked_div(b),
            UpdateOperation::Set(_) => Some(b),
        };
        return result
            .map(Value::from)
            .ok_or_else(|| StoreError::invalid_mutation(field, "integer out of range"));
    }

    let (a, b) = match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(StoreError::invalid_mutation(field, "number out of range")),
    };
    let result = match operation {
        UpdateOperation::Increment(_) => a + b,
        UpdateOperation::Decrement(_) => a - b,
        UpdateOperation::Multiply(_) => a * b,
        UpdateOperation::Divide(_) if b == 0.0 => {
            return Err(StoreError::invalid_mutation(field, "division by zero"));
        }
        UpdateOperation::Divide(_) => a / b,
        UpdateOperation::Set(_) => b,
    };

    Number::from_f64(result)
        .map(Value::Number)
        .ok_or_else(|| StoreError::invalid_mutation(field, "result is not a finite number"))
}
