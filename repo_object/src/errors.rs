use crate::validation::ValidationError;
use thiserror::Error;

/// Failures surfaced by a store backend.
///
/// Repositories pass these through unchanged; the only variant they
/// reinterpret is `Cancelled`.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),

    #[error("Duplicate key {key} in table {table}")]
    DuplicateKey { table: String, key: String },

    #[error("Concurrency conflict in table {table}: {message}")]
    Concurrency { table: String, message: String },

    #[error("Invalid mutation of field {field}: {message}")]
    InvalidMutation { field: String, message: String },

    #[error("Rows of table {table} must serialize to JSON objects")]
    NotAnObject { table: String },

    #[error("Synchronous execution requires a multi-threaded Tokio runtime")]
    NoRuntime,

    #[error("Operation cancelled")]
    Cancelled,
}

impl StoreError {
    pub fn duplicate_key(table: &str, key: &str) -> Self {
        Self::DuplicateKey {
            table: table.to_string(),
            key: key.to_string(),
        }
    }

    pub fn concurrency(table: &str, message: impl Into<String>) -> Self {
        Self::Concurrency {
            table: table.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_mutation(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidMutation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Errors returned by repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Not found: no entity with key {key} in table {table}")]
    NotFound { table: &'static str, key: String },

    #[error("Invalid page size {0}: offset must be greater than zero")]
    InvalidPageSize(i32),

    #[error("Operation cancelled")]
    OperationCancelled,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cancelled => RepositoryError::OperationCancelled,
            other => RepositoryError::Store(other),
        }
    }
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RepositoryError::OperationCancelled)
    }
}
