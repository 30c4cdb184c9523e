//! Parameter binding for JSON-valued query parameters

use crate::errors::StoreError;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};

/// Column holding a row serialized with `to_jsonb`
pub const ROW_COLUMN: &str = "__row__";

/// Bind a JSON value, sniffing the most specific PostgreSQL type for it.
///
/// Strings that parse as RFC3339 timestamps or UUIDs are bound as
/// `timestamptz` / `uuid`, so comparing such a string against a `text`
/// column fails with `operator does not exist`. Store those values in
/// `timestamptz` / `uuid` columns. The SQL generator writes NULL operands
/// inline, so the NULL arm only serves direct callers.
macro_rules! bind_json_param {
    ($query:expr, $param:expr) => {
        match $param {
            serde_json::Value::String(s) => {
                // Try to parse as RFC3339 timestamp first
                if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&s) {
                    $query.bind(dt.with_timezone(&chrono::Utc))
                // Try to parse as UUID
                } else if let Ok(uuid) = uuid::Uuid::parse_str(&s) {
                    $query.bind(uuid)
                } else {
                    $query.bind(s)
                }
            }
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                        $query.bind(i as i32)
                    } else {
                        $query.bind(i)
                    }
                } else if let Some(f) = n.as_f64() {
                    $query.bind(f)
                } else {
                    $query.bind(n.to_string())
                }
            }
            serde_json::Value::Bool(b) => $query.bind(b),
            serde_json::Value::Null => $query.bind(Option::<String>::None),
            other => $query.bind(sqlx::types::Json(other)),
        }
    };
}

/// Bind positional parameters in order
pub(crate) fn bind_params(
    mut query: Query<'_, Postgres, PgArguments>,
    params: Vec<Value>,
) -> Query<'_, Postgres, PgArguments> {
    for param in params {
        query = bind_json_param!(query, param);
    }
    query
}

/// Extract the JSON row produced by `to_jsonb`
pub(crate) fn row_value(row: &PgRow) -> Result<Value, StoreError> {
    Ok(row.try_get::<Value, _>(ROW_COLUMN)?)
}
