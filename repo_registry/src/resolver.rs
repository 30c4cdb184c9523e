//! Startup-time capability resolution and registration

use crate::candidate::{Candidate, InterfaceKind, RepositoryScope};
use crate::container::{ServiceBinding, ServiceCollection};
use crate::errors::RegistryError;
use crate::lifetime::{LifetimePolicy, RepositoryOptions};
use tracing::{debug, trace, warn};

/// Outcome of resolving one repository candidate
#[derive(Debug)]
pub struct RegistrationRecord {
    pub repository: &'static str,
    pub interface: &'static str,
    pub lifetime: LifetimePolicy,
    binding: ServiceBinding,
}

impl RegistrationRecord {
    pub fn binding(&self) -> &ServiceBinding {
        &self.binding
    }

    pub fn into_binding(self) -> ServiceBinding {
        self.binding
    }
}

/// Turns candidate descriptors into container bindings.
///
/// Each candidate is resolved on its own. A batch either resolves
/// completely or fails with the first error.
#[derive(Debug, Clone, Default)]
pub struct CapabilityResolver {
    options: RepositoryOptions,
}

impl CapabilityResolver {
    pub fn new(options: RepositoryOptions) -> Self {
        Self { options }
    }

    pub fn resolve(
        &self,
        candidates: &[Candidate],
    ) -> Result<Vec<RegistrationRecord>, RegistryError> {
        let mut records = Vec::new();
        for candidate in candidates {
            match self.resolve_candidate(candidate) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    warn!("Repository registration failed: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(records)
    }

    /// Resolve a single candidate; `None` when it is not a repository
    pub fn resolve_candidate(
        &self,
        candidate: &Candidate,
    ) -> Result<Option<RegistrationRecord>, RegistryError> {
        if !Self::is_repository(candidate) {
            trace!("Skipping {}: not a repository", candidate.type_name());
            return Ok(None);
        }

        let specialized: Vec<_> = candidate
            .interfaces()
            .iter()
            .filter(|interface| matches!(interface.kind(), InterfaceKind::Specialized(_)))
            .collect();

        let [interface] = specialized.as_slice() else {
            return Err(RegistryError::AmbiguousOrMissingCapability {
                repository: candidate.type_name(),
                found: specialized.iter().map(|interface| interface.name()).collect(),
            });
        };

        let lifetime = LifetimePolicy::resolve(
            candidate.type_name(),
            candidate.lifetime_annotation(),
            self.options.default_lifetime,
        )?;

        let binding = interface.binding(lifetime).ok_or(
            RegistryError::AmbiguousOrMissingCapability {
                repository: candidate.type_name(),
                found: Vec::new(),
            },
        )?;

        debug!(
            "Resolved {} as {} ({})",
            candidate.type_name(),
            interface.name(),
            lifetime
        );

        Ok(Some(RegistrationRecord {
            repository: candidate.type_name(),
            interface: interface.name(),
            lifetime,
            binding,
        }))
    }

    /// Built on `RepositoryBase` and implementing at least one capability
    fn is_repository(candidate: &Candidate) -> bool {
        candidate.is_repository()
            && candidate
                .interfaces()
                .iter()
                .any(|interface| interface.kind().is_recognized())
    }
}

impl ServiceCollection {
    /// Register every repository of scope `S`.
    ///
    /// Nothing is bound unless every candidate resolves. Calling this twice
    /// for the same scope binds every repository twice.
    pub fn add_light_repositories<S: RepositoryScope>(
        &mut self,
        options: RepositoryOptions,
    ) -> Result<usize, RegistryError> {
        let candidates = S::candidates();
        let records = CapabilityResolver::new(options).resolve(&candidates)?;
        let count = records.len();

        for record in records {
            self.bind(record.into_binding());
        }

        debug!(
            "Registered {} repositories from {} candidates",
            count,
            candidates.len()
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ServiceScope;
    use crate::repository_scope;
    use config::ServiceLifetime;
    use repo_object::prelude::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        id: i64,
        body: String,
    }

    impl Entity for Note {
        type Key = i64;

        fn table_name() -> &'static str {
            "notes"
        }

        fn key_field() -> &'static str {
            "id"
        }

        fn key(&self) -> i64 {
            self.id
        }

        fn columns() -> &'static [&'static str] {
            &["id", "body"]
        }
    }

    trait NoteRepository: CrudRepository<Note> {}
    trait NotePagingRepository: PagingAndSortingRepository<Note> {}
    trait Auditable: Send + Sync {}

    struct MemoryNoteRepository {
        base: RepositoryBase<MemoryContext>,
    }

    impl Repository for MemoryNoteRepository {
        type Context = MemoryContext;
        type Entity = Note;

        fn base(&self) -> &RepositoryBase<MemoryContext> {
            &self.base
        }
    }

    impl PagingRepository for MemoryNoteRepository {}
    impl NoteRepository for MemoryNoteRepository {}
    impl NotePagingRepository for MemoryNoteRepository {}
    impl Auditable for MemoryNoteRepository {}

    fn construct(scope: &ServiceScope) -> anyhow::Result<MemoryNoteRepository> {
        Ok(MemoryNoteRepository {
            base: RepositoryBase::new(scope.resolve::<MemoryContext>()?),
        })
    }

    fn crud_candidate() -> crate::RepositoryCandidate<MemoryNoteRepository> {
        Candidate::repository(construct).exposes_crud::<dyn NoteRepository>(|repo| repo)
    }

    #[test]
    fn test_unrelated_interfaces_do_not_count() {
        let candidate = crud_candidate().also_implements::<dyn Auditable>().build();
        let record = CapabilityResolver::default()
            .resolve_candidate(&candidate)
            .unwrap()
            .unwrap();

        assert_eq!(record.lifetime, LifetimePolicy::Scoped);
        assert!(record.binding().serves::<dyn NoteRepository>());
    }

    #[test]
    fn test_two_capabilities_are_ambiguous() {
        let candidate: Candidate = crud_candidate()
            .paging()
            .exposes_paging::<dyn NotePagingRepository>(|repo| repo)
            .into();

        match CapabilityResolver::default().resolve_candidate(&candidate) {
            Err(RegistryError::AmbiguousOrMissingCapability { found, .. }) => {
                assert_eq!(found.len(), 2)
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_capability_and_plain_types() {
        let generic_only: Candidate = Candidate::repository(construct).paging().into();
        assert!(matches!(
            CapabilityResolver::default().resolve_candidate(&generic_only),
            Err(RegistryError::AmbiguousOrMissingCapability { ref found, .. }) if found.is_empty()
        ));

        let plain = Candidate::of::<String>().also_implements::<dyn Auditable>();
        assert!(CapabilityResolver::default()
            .resolve_candidate(&plain)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_lifetime_annotation_and_default() {
        let options = RepositoryOptions::new().with_default_lifetime(ServiceLifetime::Transient);
        let resolver = CapabilityResolver::new(options);

        let plain = crud_candidate().build();
        let annotated = crud_candidate().lifetime(ServiceLifetime::Scoped).build();

        let records = resolver.resolve(&[plain, annotated]).unwrap();
        assert_eq!(records[0].lifetime, LifetimePolicy::Transient);
        assert_eq!(records[1].lifetime, LifetimePolicy::Scoped);
    }

    repository_scope!(NoteScope {
        crud_candidate(),
        Candidate::of::<u32>(),
    });

    repository_scope!(BrokenScope {
        crud_candidate(),
        crud_candidate().lifetime(ServiceLifetime::Singleton),
    });

    #[test]
    fn test_registration_binds_resolvable_repositories() {
        let mut services = ServiceCollection::new();
        services.add_scoped::<MemoryContext, _>(|_| Ok(Arc::new(MemoryStore::new().context())));

        let count = services
            .add_light_repositories::<NoteScope>(RepositoryOptions::default())
            .unwrap();
        assert_eq!(count, 1);

        let provider = services.build_provider();
        let scope = provider.create_scope();
        let repo = scope.resolve::<dyn NoteRepository>().unwrap();
        assert_eq!(repo.count().unwrap(), 0);

        let same = scope.resolve::<dyn NoteRepository>().unwrap();
        assert!(Arc::ptr_eq(&repo, &same));
    }

    #[test]
    fn test_invalid_lifetime_binds_nothing() {
        let mut services = ServiceCollection::new();
        let result = services.add_light_repositories::<BrokenScope>(RepositoryOptions::default());

        assert!(matches!(result, Err(RegistryError::InvalidLifetime { .. })));
        assert!(services.is_empty());
    }
}
