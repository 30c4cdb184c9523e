use config::ServiceLifetime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error(
        "Repository {repository} must implement exactly one repository capability interface, found [{}]",
        .found.join(", ")
    )]
    AmbiguousOrMissingCapability {
        repository: &'static str,
        found: Vec<&'static str>,
    },

    #[error("Repository {repository} cannot be registered with the {lifetime} lifetime")]
    InvalidLifetime {
        repository: &'static str,
        lifetime: ServiceLifetime,
    },

    #[error("No service registered for {0}")]
    NotRegistered(&'static str),

    #[error("Scoped service {0} cannot be resolved while building a singleton")]
    ScopedFromSingleton(&'static str),

    #[error("Failed to construct {interface}: {source}")]
    Construction {
        interface: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RegistryError {
    pub(crate) fn construction(interface: &'static str, error: anyhow::Error) -> Self {
        RegistryError::Construction {
            interface,
            source: error.into(),
        }
    }
}
