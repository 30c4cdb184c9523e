//! Candidate descriptors
//!
//! A candidate describes one exported type: whether it is built on
//! `RepositoryBase`, which interfaces it implements, its optional lifetime
//! annotation, and how to construct and up-cast it for binding.

use crate::container::{ServiceBinding, ServiceScope};
use crate::lifetime::LifetimePolicy;
use config::ServiceLifetime;
use repo_object::{
    CrudRepository, LightRepository, PagingAndSortingRepository, PagingRepository, Repository,
};
use std::any::type_name;
use std::sync::Arc;

/// Builds the container binding for a resolved interface
type Binder = Arc<dyn Fn(LifetimePolicy) -> ServiceBinding + Send + Sync>;

type Constructor<R> = Arc<dyn Fn(&ServiceScope) -> anyhow::Result<R> + Send + Sync>;

/// Which repository capability an interface belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Crud,
    Paging,
}

/// Place of an interface in the repository capability hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    /// The base marker every capability derives from
    Marker,
    /// A generic capability, parameterized by the entity
    Generic(Capability),
    /// An application interface specializing a capability for one entity
    Specialized(Capability),
    /// Anything outside the repository hierarchy
    Unrelated,
}

impl InterfaceKind {
    /// Part of the repository capability hierarchy
    pub fn is_recognized(self) -> bool {
        !matches!(self, InterfaceKind::Unrelated)
    }
}

/// One interface implemented by a candidate
#[derive(Clone)]
pub struct InterfaceDecl {
    name: &'static str,
    kind: InterfaceKind,
    binder: Option<Binder>,
}

impl InterfaceDecl {
    fn new<I: ?Sized>(kind: InterfaceKind) -> Self {
        Self {
            name: type_name::<I>(),
            kind,
            binder: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> InterfaceKind {
        self.kind
    }

    pub(crate) fn binding(&self, lifetime: LifetimePolicy) -> Option<ServiceBinding> {
        self.binder.as_ref().map(|binder| binder(lifetime))
    }
}

impl std::fmt::Debug for InterfaceDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceDecl")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// An exported type considered for registration
#[derive(Debug, Clone)]
pub struct Candidate {
    type_name: &'static str,
    repository: bool,
    interfaces: Vec<InterfaceDecl>,
    lifetime: Option<ServiceLifetime>,
}

impl Candidate {
    /// Any type that is not built on `RepositoryBase`
    pub fn of<T: ?Sized>() -> Self {
        Self {
            type_name: type_name::<T>(),
            repository: false,
            interfaces: Vec::new(),
            lifetime: None,
        }
    }

    /// A concrete repository and its constructor.
    ///
    /// The marker and the generic CRUD capability are declared up front since
    /// every `Repository` has them.
    pub fn repository<R, F>(constructor: F) -> RepositoryCandidate<R>
    where
        R: Repository,
        F: Fn(&ServiceScope) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        RepositoryCandidate {
            candidate: Candidate {
                type_name: type_name::<R>(),
                repository: true,
                interfaces: vec![
                    InterfaceDecl::new::<dyn LightRepository>(InterfaceKind::Marker),
                    InterfaceDecl::new::<dyn CrudRepository<R::Entity>>(InterfaceKind::Generic(
                        Capability::Crud,
                    )),
                ],
                lifetime: None,
            },
            constructor: Arc::new(constructor),
        }
    }

    /// Declare an interface outside the repository hierarchy
    pub fn also_implements<I: ?Sized>(mut self) -> Self {
        self.interfaces
            .push(InterfaceDecl::new::<I>(InterfaceKind::Unrelated));
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Built on `RepositoryBase`
    pub fn is_repository(&self) -> bool {
        self.repository
    }

    pub fn interfaces(&self) -> &[InterfaceDecl] {
        &self.interfaces
    }

    /// Lifetime annotation, if any
    pub fn lifetime_annotation(&self) -> Option<ServiceLifetime> {
        self.lifetime
    }
}

/// Builder for a repository candidate of concrete type `R`
pub struct RepositoryCandidate<R> {
    candidate: Candidate,
    constructor: Constructor<R>,
}

impl<R: Repository> RepositoryCandidate<R> {
    /// Declare the generic paging and sorting capability
    pub fn paging(mut self) -> Self
    where
        R: PagingRepository,
    {
        self.candidate
            .interfaces
            .push(InterfaceDecl::new::<dyn PagingAndSortingRepository<R::Entity>>(
                InterfaceKind::Generic(Capability::Paging),
            ));
        self
    }

    /// Declare an application interface specializing the CRUD capability
    pub fn exposes_crud<I>(self, upcast: fn(Arc<R>) -> Arc<I>) -> Self
    where
        I: ?Sized + CrudRepository<R::Entity> + 'static,
    {
        self.exposes(InterfaceKind::Specialized(Capability::Crud), upcast)
    }

    /// Declare an application interface specializing the paging capability
    pub fn exposes_paging<I>(self, upcast: fn(Arc<R>) -> Arc<I>) -> Self
    where
        I: ?Sized + PagingAndSortingRepository<R::Entity> + 'static,
    {
        self.exposes(InterfaceKind::Specialized(Capability::Paging), upcast)
    }

    fn exposes<I>(mut self, kind: InterfaceKind, upcast: fn(Arc<R>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let constructor = Arc::clone(&self.constructor);
        let implementation = self.candidate.type_name;
        let binder: Binder = Arc::new(move |lifetime: LifetimePolicy| {
            let constructor = Arc::clone(&constructor);
            ServiceBinding::new::<I, _>(
                implementation,
                lifetime.as_service_lifetime(),
                move |scope: &ServiceScope| Ok(upcast(Arc::new(constructor(scope)?))),
            )
        });

        self.candidate.interfaces.push(InterfaceDecl {
            name: type_name::<I>(),
            kind,
            binder: Some(binder),
        });
        self
    }

    /// Declare an interface outside the repository hierarchy
    pub fn also_implements<I: ?Sized>(mut self) -> Self {
        self.candidate = self.candidate.also_implements::<I>();
        self
    }

    /// Lifetime annotation
    pub fn lifetime(mut self, lifetime: ServiceLifetime) -> Self {
        self.candidate.lifetime = Some(lifetime);
        self
    }

    pub fn build(self) -> Candidate {
        self.candidate
    }
}

impl<R: Repository> From<RepositoryCandidate<R>> for Candidate {
    fn from(builder: RepositoryCandidate<R>) -> Self {
        builder.build()
    }
}

/// A named set of candidates registered together
pub trait RepositoryScope {
    fn candidates() -> Vec<Candidate>;
}

/// Declare a `RepositoryScope` from a list of candidates.
///
/// ```ignore
/// repository_scope!(pub AppRepositories {
///     Candidate::repository(|scope| PgUserRepository::new(scope))
///         .paging()
///         .exposes_paging::<dyn UserRepository>(|repo| repo),
///     Candidate::of::<Clock>(),
/// });
/// ```
#[macro_export]
macro_rules! repository_scope {
    ($vis:vis $name:ident { $($candidate:expr),* $(,)? }) => {
        $vis struct $name;

        impl $crate::RepositoryScope for $name {
            fn candidates() -> ::std::vec::Vec<$crate::Candidate> {
                ::std::vec![$(::std::convert::Into::<$crate::Candidate>::into($candidate)),*]
            }
        }
    };
}
