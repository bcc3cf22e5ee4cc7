use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tracing::{debug, trace};

use crate::describe::{erase, restore, Construct, Describe, Instance, TypeInfo};
use crate::error::{RegisterInstanceError, RegisterTypeError, RegistrationError, ResolveError};
use crate::key::TypeKey;
use crate::module::{Module, Registration, Target};
use crate::registry::{Lifetime, Registry};

/// Dependency injection container.
///
/// Maps interfaces (trait objects), in an anonymous slot or in named slots, to implementations,
/// factories or shared instances. A single lock serialises every operation, including the
/// whole construction of a dependency tree during [resolve](Container::resolve), so that a
/// singleton is never constructed twice.
///
/// Constructors and factories run under that lock. A factory calling back into the container
/// that is building it gets a `Reentrant` error from fallible operations, and a panic from
/// [is_registered](Container::is_registered), the `unregister_*` methods and
/// [reset](Container::reset).
#[derive(Default)]
pub struct Container {
    registry: Mutex<Registry>,
    /// Thread currently holding `registry`
    owner: Mutex<Option<ThreadId>>,
}

/// Locked registry, releasing the ownership mark before the lock
struct RegistryGuard<'a> {
    registry: MutexGuard<'a, Registry>,
    owner: &'a Mutex<Option<ThreadId>>,
}

impl Deref for RegistryGuard<'_> {
    type Target = Registry;

    fn deref(&self) -> &Registry {
        &self.registry
    }
}

impl DerefMut for RegistryGuard<'_> {
    fn deref_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
}

impl Drop for RegistryGuard<'_> {
    fn drop(&mut self) {
        *lock(self.owner) = None;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the registry, or `None` if this thread already holds it
    fn registry(&self) -> Option<RegistryGuard<'_>> {
        let current = thread::current().id();
        if *lock(&self.owner) == Some(current) {
            debug!("container re-entered from a constructor");
            return None;
        }
        let registry = lock(&self.registry);
        *lock(&self.owner) = Some(current);
        Some(RegistryGuard {
            registry,
            owner: &self.owner,
        })
    }

    fn registry_or_panic(&self) -> RegistryGuard<'_> {
        match self.registry() {
            Some(registry) => registry,
            None => panic!("container used from one of its own constructors"),
        }
    }

    /// Check if an implementation or an instance is registered in the anonymous slot
    ///
    /// # Panics
    ///
    /// If called from a constructor or factory run by this container.
    pub fn is_registered<I: ?Sized + 'static>(&self) -> bool {
        self.registry_or_panic().is_registered(TypeKey::of::<I>(), None)
    }

    pub fn is_registered_named<I: ?Sized + 'static>(&self, name: &str) -> bool {
        self.registry_or_panic().is_registered(TypeKey::of::<I>(), Some(name))
    }

    /// Register an implementation in the anonymous slot of an interface.
    ///
    /// Fails if `I` is not an interface, if `T` is not a concrete type implementing `I`, or if
    /// the slot already holds an implementation, even an identical one.
    pub fn register_type<I, T>(&self, lifetime: Lifetime) -> Result<(), RegisterTypeError>
    where
        I: ?Sized + Describe,
        T: ?Sized + Describe,
    {
        self.register_type_info(I::describe(), T::describe(), None, lifetime)
    }

    pub fn register_named_type<I, T>(
        &self,
        name: &str,
        lifetime: Lifetime,
    ) -> Result<(), RegisterTypeError>
    where
        I: ?Sized + Describe,
        T: ?Sized + Describe,
    {
        self.register_type_info(I::describe(), T::describe(), Some(name), lifetime)
    }

    /// Register a factory function in the anonymous slot of an interface.
    ///
    /// The parameters of the factory are injected like constructor parameters.
    pub fn register_factory<I, Args, F>(
        &self,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<(), RegisterTypeError>
    where
        I: ?Sized + Describe + Send + Sync,
        F: Construct<Args, Arc<I>>,
    {
        let implementation = TypeInfo::factory::<I, Args, F>(factory);
        self.register_type_info(I::describe(), implementation, None, lifetime)
    }

    pub fn register_named_factory<I, Args, F>(
        &self,
        name: &str,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<(), RegisterTypeError>
    where
        I: ?Sized + Describe + Send + Sync,
        F: Construct<Args, Arc<I>>,
    {
        let implementation = TypeInfo::factory::<I, Args, F>(factory);
        self.register_type_info(I::describe(), implementation, Some(name), lifetime)
    }

    /// Register a shared instance in the anonymous slot of an interface.
    ///
    /// Instances take precedence over implementations registered in the same slot.
    pub fn register_instance<I>(&self, instance: Arc<I>) -> Result<(), RegisterInstanceError>
    where
        I: ?Sized + Describe + Send + Sync,
    {
        self.register_instance_info(I::describe(), erase(instance), None)
    }

    pub fn register_named_instance<I>(
        &self,
        name: &str,
        instance: Arc<I>,
    ) -> Result<(), RegisterInstanceError>
    where
        I: ?Sized + Describe + Send + Sync,
    {
        self.register_instance_info(I::describe(), erase(instance), Some(name))
    }

    /// Apply a type-erased registration
    pub fn register(&self, registration: Registration) -> Result<(), RegistrationError> {
        let name = registration.name.as_deref();
        match registration.target {
            Target::Type(implementation) => self.register_type_info(
                registration.interface,
                implementation,
                name,
                registration.lifetime,
            )?,
            Target::Instance(instance) => {
                self.register_instance_info(registration.interface, instance, name)?
            }
        }
        Ok(())
    }

    /// Apply all registrations of a module, stopping at the first failure
    pub fn install<M: Module + ?Sized>(&self, module: &M) -> Result<(), RegistrationError> {
        let registrations = module.registrations();
        debug!(count = registrations.len(), "installing module");
        for registration in registrations {
            self.register(registration)?;
        }
        Ok(())
    }

    /// Remove the anonymous and all named registrations of an interface
    ///
    /// Like every `unregister_*` method, panics if called from a constructor or factory run by
    /// this container.
    pub fn unregister<I: ?Sized + 'static>(&self) {
        self.registry_or_panic().unregister(TypeKey::of::<I>());
    }

    pub fn unregister_type<I: ?Sized + 'static>(&self) {
        self.registry_or_panic().unregister_type(TypeKey::of::<I>(), None);
    }

    pub fn unregister_type_named<I: ?Sized + 'static>(&self, name: &str) {
        self.registry_or_panic().unregister_type(TypeKey::of::<I>(), Some(name));
    }

    /// Remove the instance of the anonymous slot
    ///
    /// Memoised singletons live in the same store: on a singleton slot this drops the shared
    /// instance, and the next resolution constructs a new one.
    pub fn unregister_instance<I: ?Sized + 'static>(&self) {
        self.registry_or_panic().unregister_instance(TypeKey::of::<I>(), None);
    }

    pub fn unregister_instance_named<I: ?Sized + 'static>(&self, name: &str) {
        self.registry_or_panic().unregister_instance(TypeKey::of::<I>(), Some(name));
    }

    /// Obtain an instance of the interface from its anonymous slot
    pub fn resolve<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>, ResolveError> {
        self.resolve_slot(None)
    }

    /// Obtain an instance of the interface from a named slot
    ///
    /// The name also selects the slots used for every dependency of the implementation.
    pub fn resolve_named<I: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<I>, ResolveError> {
        self.resolve_slot(Some(name))
    }

    /// Same as [resolve](Container::resolve), reporting failures as `None`
    pub fn try_resolve<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        self.try_resolve_slot(None)
    }

    pub fn try_resolve_named<I: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Option<Arc<I>> {
        self.try_resolve_slot(Some(name))
    }

    /// Resolve every registered slot of an interface: the anonymous one, then named ones by name
    pub fn resolve_all<I: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Vec<Arc<I>>, ResolveError> {
        let key = TypeKey::of::<I>();
        let mut registry = self.registry().ok_or(ResolveError::Reentrant {
            interface: key.name(),
        })?;
        let slots = registry.slots(key);
        slots
            .iter()
            .map(|name| {
                let instance = registry.resolve(key, name.as_deref())?;
                downcast::<I>(key, &instance)
            })
            .collect()
    }

    /// Drop every registration, instance and cached plan
    pub fn reset(&self) {
        self.registry_or_panic().reset();
    }

    fn register_type_info(
        &self,
        interface: TypeInfo,
        implementation: TypeInfo,
        name: Option<&str>,
        lifetime: Lifetime,
    ) -> Result<(), RegisterTypeError> {
        let Some(mut registry) = self.registry() else {
            return Err(RegisterTypeError::Reentrant {
                interface: interface.key().name(),
            });
        };
        registry.register_type(&interface, implementation, name, lifetime)
    }

    fn register_instance_info(
        &self,
        interface: TypeInfo,
        instance: Instance,
        name: Option<&str>,
    ) -> Result<(), RegisterInstanceError> {
        let Some(mut registry) = self.registry() else {
            return Err(RegisterInstanceError::Reentrant {
                interface: interface.key().name(),
            });
        };
        registry.register_instance(&interface, instance, name)
    }

    fn resolve_slot<I: ?Sized + Send + Sync + 'static>(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<I>, ResolveError> {
        let key = TypeKey::of::<I>();
        debug!(interface = key.name(), name = ?name, "resolving");
        let instance = self
            .registry()
            .ok_or(ResolveError::Reentrant {
                interface: key.name(),
            })?
            .resolve(key, name)?;
        downcast::<I>(key, &instance)
    }

    fn try_resolve_slot<I: ?Sized + Send + Sync + 'static>(
        &self,
        name: Option<&str>,
    ) -> Option<Arc<I>> {
        match self.resolve_slot(name) {
            Ok(instance) => Some(instance),
            Err(e) => {
                trace!(error = %e, "resolution failed");
                None
            }
        }
    }
}

fn downcast<I: ?Sized + Send + Sync + 'static>(
    key: TypeKey,
    instance: &Instance,
) -> Result<Arc<I>, ResolveError> {
    restore::<I>(instance).ok_or(ResolveError::TypeMismatch {
        interface: key.name(),
    })
}
