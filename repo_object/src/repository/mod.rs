//! Generic repositories
//!
//! A concrete repository embeds a `RepositoryBase` and implements
//! `Repository`; the CRUD capability then comes from a blanket
//! implementation, and implementing the `PagingRepository` marker adds paging
//! and sorting on top.
//!
//! ```ignore
//! pub trait UserRepository: PagingAndSortingRepository<User> {}
//!
//! pub struct PgUserRepository {
//!     base: RepositoryBase<PgContext>,
//! }
//!
//! impl Repository for PgUserRepository {
//!     type Context = PgContext;
//!     type Entity = User;
//!
//!     fn base(&self) -> &RepositoryBase<PgContext> {
//!         &self.base
//!     }
//! }
//!
//! impl PagingRepository for PgUserRepository {}
//! impl UserRepository for PgUserRepository {}
//! ```

pub mod base;
pub mod crud;
pub mod paging;

pub use base::RepositoryBase;
pub use crud::CrudRepository;
pub use paging::PagingAndSortingRepository;

use crate::traits::{Entity, StoreContext};

/// Marker every repository capability derives from
pub trait LightRepository: Send + Sync {}

/// Implementation anchor of a concrete repository
pub trait Repository: Send + Sync + 'static {
    /// Connection handle type the repository works on
    type Context: StoreContext;

    /// Entity the repository manages
    type Entity: Entity;

    fn base(&self) -> &RepositoryBase<Self::Context>;

    /// Table handle of the managed entity
    fn table(&self) -> <Self::Context as StoreContext>::Table<Self::Entity> {
        self.base().table::<Self::Entity>()
    }
}

/// Opt-in marker for the paging and sorting capability
pub trait PagingRepository: Repository {}

impl<R: Repository> LightRepository for R {}
