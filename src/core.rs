//! Core LightRepo functionality
//!
//! `LightRepo` owns the PostgreSQL pool and wires repositories into a
//! service collection: one scoped `PgContext` per unit of work, plus every
//! repository a scope declares.

use repo_object::PgContext;
use repo_registry::{RepositoryOptions, RepositoryScope, ServiceCollection};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use crate::errors::LightRepoError;
use config::{AppConfig, DatabaseConfig, RepositoryConfig};

/// Main coordinator over the database pool and repository registration
#[derive(Debug, Clone)]
pub struct LightRepo {
    pool: PgPool,
    repositories: RepositoryConfig,
}

impl LightRepo {
    /// Connect with default repository options
    pub async fn connect(config: DatabaseConfig) -> Result<Self, LightRepoError> {
        let connection_string = config.connection_string();

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        crate::debug_log!(
            "[CONNECT] {}:{}/{} pool {}..{}",
            config.host,
            config.port,
            config.database,
            config.min_connections,
            config.max_connections
        );

        let pool = pool_options.connect(&connection_string).await?;

        Ok(Self {
            pool,
            repositories: RepositoryConfig::default(),
        })
    }

    /// Connect using a complete application configuration
    pub async fn from_config(config: AppConfig) -> Result<Self, LightRepoError> {
        config.validate()?;
        let mut lightrepo = Self::connect(config.database).await?;
        lightrepo.repositories = config.repositories;
        Ok(lightrepo)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, repositories: RepositoryConfig) -> Self {
        Self { pool, repositories }
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn repository_options(&self) -> RepositoryOptions {
        RepositoryOptions::from(&self.repositories)
    }

    /// Open a new unit of work over the pool
    pub fn context(&self) -> PgContext {
        PgContext::new(self.pool.clone())
    }

    /// Bind a scoped `PgContext` and register every repository of scope `S`.
    ///
    /// Returns the number of repositories bound.
    pub fn add_repositories<S: RepositoryScope>(
        &self,
        services: &mut ServiceCollection,
    ) -> Result<usize, LightRepoError> {
        let pool = self.pool.clone();
        let runtime = Handle::try_current().ok();
        services.add_scoped::<PgContext, _>(move |_| {
            Ok(Arc::new(PgContext::with_runtime(
                pool.clone(),
                runtime.clone().or_else(|| Handle::try_current().ok()),
            )))
        });

        Ok(services.add_light_repositories::<S>(self.repository_options())?)
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), LightRepoError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
