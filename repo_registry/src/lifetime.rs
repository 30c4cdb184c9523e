//! Lifetime policies for repository bindings

use crate::errors::RegistryError;
use config::{RepositoryConfig, ServiceLifetime};
use std::fmt;

/// Lifetime a repository binding is registered under.
///
/// There is no process-wide variant: a repository wraps one connection
/// handle, which must never be shared by concurrent units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifetimePolicy {
    /// New instance on every resolution
    Transient,
    /// One instance per scope
    Scoped,
}

impl LifetimePolicy {
    /// Pick the policy for one repository.
    ///
    /// An annotation wins over the configured default; without either the
    /// policy is `Scoped`. A singleton request from either source fails.
    pub fn resolve(
        repository: &'static str,
        annotation: Option<ServiceLifetime>,
        default: Option<ServiceLifetime>,
    ) -> Result<Self, RegistryError> {
        match annotation.or(default) {
            None | Some(ServiceLifetime::Scoped) => Ok(LifetimePolicy::Scoped),
            Some(ServiceLifetime::Transient) => Ok(LifetimePolicy::Transient),
            Some(lifetime @ ServiceLifetime::Singleton) => Err(RegistryError::InvalidLifetime {
                repository,
                lifetime,
            }),
        }
    }

    pub fn as_service_lifetime(self) -> ServiceLifetime {
        match self {
            LifetimePolicy::Transient => ServiceLifetime::Transient,
            LifetimePolicy::Scoped => ServiceLifetime::Scoped,
        }
    }
}

impl fmt::Display for LifetimePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_service_lifetime().fmt(f)
    }
}

/// Caller-supplied registration options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryOptions {
    /// Lifetime for repositories without an annotation
    pub default_lifetime: Option<ServiceLifetime>,
}

impl RepositoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_lifetime(mut self, lifetime: ServiceLifetime) -> Self {
        self.default_lifetime = Some(lifetime);
        self
    }
}

impl From<&RepositoryConfig> for RepositoryOptions {
    fn from(config: &RepositoryConfig) -> Self {
        Self {
            default_lifetime: config.default_lifetime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_overrides_default() {
        let cases = [
            (None, None, LifetimePolicy::Scoped),
            (None, Some(ServiceLifetime::Transient), LifetimePolicy::Transient),
            (
                Some(ServiceLifetime::Scoped),
                Some(ServiceLifetime::Transient),
                LifetimePolicy::Scoped,
            ),
            (
                Some(ServiceLifetime::Transient),
                Some(ServiceLifetime::Singleton),
                LifetimePolicy::Transient,
            ),
        ];

        for (annotation, default, expected) in cases {
            assert_eq!(
                LifetimePolicy::resolve("Repo", annotation, default).unwrap(),
                expected
            );
        }
    }

    #[test]
    fn test_singleton_is_rejected() {
        for (annotation, default) in [
            (Some(ServiceLifetime::Singleton), None),
            (Some(ServiceLifetime::Singleton), Some(ServiceLifetime::Scoped)),
            (None, Some(ServiceLifetime::Singleton)),
        ] {
            assert!(matches!(
                LifetimePolicy::resolve("Repo", annotation, default),
                Err(RegistryError::InvalidLifetime {
                    repository: "Repo",
                    lifetime: ServiceLifetime::Singleton,
                })
            ));
        }
    }

    #[test]
    fn test_options_from_config() {
        let config = RepositoryConfig::with_default_lifetime(ServiceLifetime::Transient);
        assert_eq!(
            RepositoryOptions::from(&config),
            RepositoryOptions::new().with_default_lifetime(ServiceLifetime::Transient)
        );
    }
}
