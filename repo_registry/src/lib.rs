//! Repository registration
//!
//! A small dependency container plus the capability resolver that binds
//! concrete repositories to the one capability interface each exposes.
//!
//! ```ignore
//! repository_scope!(pub AppRepositories {
//!     Candidate::repository(PgUserRepository::from_scope)
//!         .paging()
//!         .exposes_paging::<dyn UserRepository>(|repo| repo),
//! });
//!
//! let mut services = ServiceCollection::new();
//! services.add_scoped::<PgContext, _>(move |_| Ok(Arc::new(PgContext::new(pool.clone()))));
//! services.add_light_repositories::<AppRepositories>(RepositoryOptions::default())?;
//!
//! let scope = services.build_provider().create_scope();
//! let users = scope.resolve::<dyn UserRepository>()?;
//! ```

pub mod candidate;
pub mod container;
pub mod errors;
pub mod lifetime;
pub mod prelude;
pub mod resolver;

pub use candidate::{
    Candidate, Capability, InterfaceDecl, InterfaceKind, RepositoryCandidate, RepositoryScope,
};
pub use config::ServiceLifetime;
pub use container::{ServiceBinding, ServiceCollection, ServiceProvider, ServiceScope};
pub use errors::RegistryError;
pub use lifetime::{LifetimePolicy, RepositoryOptions};
pub use resolver::{CapabilityResolver, RegistrationRecord};
