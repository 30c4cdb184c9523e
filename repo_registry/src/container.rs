//! Dependency container
//!
//! Bindings map an interface type, usually a `dyn Trait`, to a factory and a
//! lifetime. Instances are stored type-erased as `Arc<I>` behind `dyn Any`
//! and downcast again on resolution.

use crate::errors::RegistryError;
use config::ServiceLifetime;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

type Instance = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn(&ServiceScope) -> anyhow::Result<Instance> + Send + Sync>;

type InstanceCache = Mutex<HashMap<TypeId, Instance>>;

fn lock(cache: &InstanceCache) -> MutexGuard<'_, HashMap<TypeId, Instance>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One `(interface -> implementation, lifetime)` entry
#[derive(Clone)]
pub struct ServiceBinding {
    interface: TypeId,
    interface_name: &'static str,
    implementation: &'static str,
    lifetime: ServiceLifetime,
    factory: Factory,
}

impl ServiceBinding {
    pub fn new<I, F>(implementation: &'static str, lifetime: ServiceLifetime, factory: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceScope) -> anyhow::Result<Arc<I>> + Send + Sync + 'static,
    {
        Self {
            interface: TypeId::of::<I>(),
            interface_name: type_name::<I>(),
            implementation,
            lifetime,
            factory: Arc::new(move |scope: &ServiceScope| {
                Ok(Arc::new(factory(scope)?) as Instance)
            }),
        }
    }

    pub fn interface_name(&self) -> &'static str {
        self.interface_name
    }

    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.lifetime
    }

    /// Whether this binding serves interface `I`
    pub fn serves<I: ?Sized + 'static>(&self) -> bool {
        self.interface == TypeId::of::<I>()
    }
}

impl std::fmt::Debug for ServiceBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBinding")
            .field("interface", &self.interface_name)
            .field("implementation", &self.implementation)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Registration-time list of bindings.
///
/// Every binding is kept; when an interface is bound more than once the
/// last binding wins on resolution.
#[derive(Debug, Default, Clone)]
pub struct ServiceCollection {
    bindings: Vec<ServiceBinding>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, binding: ServiceBinding) -> &mut Self {
        debug!(
            "Binding {} -> {} ({})",
            binding.interface_name, binding.implementation, binding.lifetime
        );
        self.bindings.push(binding);
        self
    }

    pub fn add_singleton<I, F>(&mut self, factory: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceScope) -> anyhow::Result<Arc<I>> + Send + Sync + 'static,
    {
        self.bind(ServiceBinding::new(
            type_name::<I>(),
            ServiceLifetime::Singleton,
            factory,
        ))
    }

    pub fn add_scoped<I, F>(&mut self, factory: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceScope) -> anyhow::Result<Arc<I>> + Send + Sync + 'static,
    {
        self.bind(ServiceBinding::new(
            type_name::<I>(),
            ServiceLifetime::Scoped,
            factory,
        ))
    }

    pub fn add_transient<I, F>(&mut self, factory: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceScope) -> anyhow::Result<Arc<I>> + Send + Sync + 'static,
    {
        self.bind(ServiceBinding::new(
            type_name::<I>(),
            ServiceLifetime::Transient,
            factory,
        ))
    }

    pub fn bindings(&self) -> &[ServiceBinding] {
        &self.bindings
    }

    /// Whether any binding serves interface `I`
    pub fn contains<I: ?Sized + 'static>(&self) -> bool {
        self.bindings.iter().any(ServiceBinding::serves::<I>)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn build_provider(self) -> ServiceProvider {
        ServiceProvider::build(self)
    }
}

struct ProviderInner {
    bindings: HashMap<TypeId, ServiceBinding>,
    singletons: InstanceCache,
}

/// Resolution root built from a `ServiceCollection`; owns singletons
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    pub fn build(collection: ServiceCollection) -> Self {
        let bindings = collection
            .bindings
            .into_iter()
            .map(|binding| (binding.interface, binding))
            .collect();

        Self {
            inner: Arc::new(ProviderInner {
                bindings,
                singletons: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Open a scope, one per unit of work
    pub fn create_scope(&self) -> ServiceScope {
        ServiceScope {
            provider: self.clone(),
            scoped: Mutex::new(HashMap::new()),
            root: false,
        }
    }

    /// Scope singleton factories run in; it owns no unit of work
    fn root_scope(&self) -> ServiceScope {
        ServiceScope {
            provider: self.clone(),
            scoped: Mutex::new(HashMap::new()),
            root: true,
        }
    }

    pub fn is_registered<I: ?Sized + 'static>(&self) -> bool {
        self.inner.bindings.contains_key(&TypeId::of::<I>())
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("bindings", &self.inner.bindings.len())
            .field("singletons", &lock(&self.inner.singletons).len())
            .finish()
    }
}

/// Resolution context of one unit of work; caches scoped instances
pub struct ServiceScope {
    provider: ServiceProvider,
    scoped: InstanceCache,
    root: bool,
}

impl ServiceScope {
    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    /// Resolve interface `I` according to its binding's lifetime.
    ///
    /// Singletons are built in a root scope, where resolving a scoped
    /// service fails with `RegistryError::ScopedFromSingleton`.
    pub fn resolve<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>, RegistryError> {
        let interface = TypeId::of::<I>();
        let binding = self
            .provider
            .inner
            .bindings
            .get(&interface)
            .ok_or(RegistryError::NotRegistered(type_name::<I>()))?;

        let instance = match binding.lifetime {
            ServiceLifetime::Transient => self.construct(binding)?,
            ServiceLifetime::Scoped if self.root => {
                return Err(RegistryError::ScopedFromSingleton(binding.interface_name));
            }
            ServiceLifetime::Scoped => self.cached(&self.scoped, binding)?,
            ServiceLifetime::Singleton => self
                .provider
                .root_scope()
                .cached(&self.provider.inner.singletons, binding)?,
        };

        instance
            .downcast_ref::<Arc<I>>()
            .cloned()
            .ok_or(RegistryError::NotRegistered(type_name::<I>()))
    }

    fn construct(&self, binding: &ServiceBinding) -> Result<Instance, RegistryError> {
        (binding.factory)(self)
            .map_err(|e| RegistryError::construction(binding.interface_name, e))
    }

    // The factory runs without the cache lock held so it can resolve its own
    // dependencies; if two callers race, the first stored instance is kept.
    fn cached(
        &self,
        cache: &InstanceCache,
        binding: &ServiceBinding,
    ) -> Result<Instance, RegistryError> {
        if let Some(instance) = lock(cache).get(&binding.interface) {
            return Ok(Arc::clone(instance));
        }

        let instance = self.construct(binding)?;
        Ok(Arc::clone(
            lock(cache).entry(binding.interface).or_insert(instance),
        ))
    }
}

impl std::fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScope")
            .field("scoped", &lock(&self.scoped).len())
            .field("root", &self.root)
            .finish()
    }
}
