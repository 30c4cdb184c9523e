//! Convenience re-exports for registering repositories

pub use crate::candidate::{Candidate, RepositoryScope};
pub use crate::container::{ServiceCollection, ServiceProvider, ServiceScope};
pub use crate::errors::RegistryError;
pub use crate::lifetime::{LifetimePolicy, RepositoryOptions};
pub use crate::repository_scope;
pub use config::ServiceLifetime;
