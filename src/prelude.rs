//! Convenience re-exports for common LightRepo usage
//!
//! ```rust
//! use lightrepo::prelude::*;
//! ```

// Core LightRepo components
pub use crate::core::LightRepo;
pub use crate::errors::LightRepoError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, RepositoryConfig, ServiceLifetime};

// Entities, repositories, queries and store backends
pub use repo_object::prelude::*;

// Re-export repo_object module for derive-generated code
pub use repo_object;

// Repository registration
pub use repo_registry::prelude::*;

// Derive macro for entities
pub use entity_derive::Entity;

// Common external dependencies
pub use anyhow;
pub use sqlx;
pub use tokio;

// Column types the PostgreSQL backend binds natively
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
