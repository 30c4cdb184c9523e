//! Entity metadata
//!
//! This module defines the contract every persisted record type implements.

use crate::errors::StoreError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt::Debug;

/// A record type stored in one table and addressed by one key.
///
/// Implement it with `#[derive(Entity)]`:
/// ```ignore
/// use lightrepo::prelude::*;
///
/// #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
/// #[entity(table = "users")]
/// pub struct User {
///     #[key]
///     pub id: i64,
///     pub name: String,
/// }
/// ```
///
/// Field names used by predicates, order keys and mutations are the
/// serialized field names, which must match the table's column names.
pub trait Entity: Clone + Send + Sync + Debug + Serialize + DeserializeOwned + 'static {
    /// Type of the key field
    type Key: Clone + Send + Sync + Debug + Serialize + 'static;

    /// Table name in the database
    fn table_name() -> &'static str;

    /// Name of the key field
    fn key_field() -> &'static str;

    /// Key of this instance
    fn key(&self) -> Self::Key;

    /// All column names, in declaration order
    fn columns() -> &'static [&'static str];

    /// Serialize this instance into a JSON object row
    fn to_row(&self) -> Result<Value, StoreError> {
        match serde_json::to_value(self)? {
            row @ Value::Object(_) => Ok(row),
            _ => Err(StoreError::NotAnObject {
                table: Self::table_name().to_string(),
            }),
        }
    }

    /// Deserialize an instance from a JSON object row
    fn from_row(row: Value) -> Result<Self, StoreError> {
        Ok(serde_json::from_value(row)?)
    }
}

/// Identity of a key: its compact JSON encoding.
///
/// Serialized keys and key fields read back from rows produce the same text,
/// so either side can be used for lookups.
pub fn key_identity<K: Serialize + ?Sized>(key: &K) -> Result<String, StoreError> {
    Ok(serde_json::to_string(key)?)
}

/// Identity of the key field of a JSON row
pub fn row_identity(row: &Value, key_field: &str) -> String {
    row.get(key_field).unwrap_or(&Value::Null).to_string()
}

/// Static table description handed to backends that work on untyped rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMeta {
    pub table: &'static str,
    pub key_field: &'static str,
    pub columns: &'static [&'static str],
}

impl TableMeta {
    pub fn of<E: Entity>() -> Self {
        Self {
            table: E::table_name(),
            key_field: E::key_field(),
            columns: E::columns(),
        }
    }
}
