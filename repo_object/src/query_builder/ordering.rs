//! Ordering primitives

use std::fmt;

/// Direction of an ordering stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Field projection used as an ordering key.
///
/// The name is the serialized field name of the entity, which is also the
/// column name in PostgreSQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderKey(String);

impl OrderKey {
    pub fn new(field: impl Into<String>) -> Self {
        Self(field.into())
    }

    pub fn field(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OrderKey {
    fn from(field: &str) -> Self {
        Self::new(field)
    }
}

impl From<String> for OrderKey {
    fn from(field: String) -> Self {
        Self(field)
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
