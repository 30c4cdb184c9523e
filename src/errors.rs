//! Error types for the LightRepo crate
//!
//! Errors from the member crates are wrapped unchanged.

use config::ConfigError;
use repo_object::StoreError;
use repo_registry::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LightRepoError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Repository registration error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
