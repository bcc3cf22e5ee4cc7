//! Registration stores shared behind the container lock.
//!
//! The registry keeps three independent [SlotMap]s: implementation descriptors, instances
//! (registered or memoised singletons) and cached resolution plans. It performs no locking
//! itself, the [Container](crate::Container) serialises every call.

use std::sync::Arc;

use tracing::debug;

use crate::describe::{Cast, Instance, TypeInfo, TypeKind};
use crate::error::{RegisterInstanceError, RegisterTypeError, ResolveError};
use crate::key::{SlotMap, TypeKey};
use crate::plan::{Plan, PlanBuilder};

/// Instance policy of a registered implementation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifetime {
    /// Construct a new instance on each resolution
    #[default]
    Transient,
    /// Construct once, then reuse the same instance
    Singleton,
}

/// Implementation descriptor stored for a slot
pub(crate) struct Implementation {
    pub info: TypeInfo,
    /// Upcast from the implementation to the registered interface
    pub cast: Arc<Cast>,
    pub lifetime: Lifetime,
}

#[derive(Default)]
pub(crate) struct Registry {
    implementations: SlotMap<Implementation>,
    instances: SlotMap<Instance>,
    plans: SlotMap<Arc<Plan>>,
}

impl Registry {
    pub fn is_registered(&self, key: TypeKey, name: Option<&str>) -> bool {
        self.implementations.contains(key, name) || self.instances.contains(key, name)
    }

    pub fn register_type(
        &mut self,
        interface: &TypeInfo,
        implementation: TypeInfo,
        name: Option<&str>,
        lifetime: Lifetime,
    ) -> Result<(), RegisterTypeError> {
        let key = interface.key();
        if interface.kind() != TypeKind::Interface {
            return Err(RegisterTypeError::NotAnInterface {
                interface: key.name(),
            });
        }
        if implementation.kind() != TypeKind::Concrete {
            return Err(RegisterTypeError::NotInstantiable {
                implementation: implementation.key().name(),
            });
        }
        let Some(cast) = implementation.cast_to(key) else {
            return Err(RegisterTypeError::NotAssignable {
                interface: key.name(),
                implementation: implementation.key().name(),
            });
        };
        if self.implementations.contains(key, name) {
            return Err(RegisterTypeError::AlreadyRegistered {
                interface: key.name(),
                name: name.map(str::to_owned),
            });
        }

        debug!(
            interface = key.name(),
            implementation = implementation.key().name(),
            name = ?name,
            ?lifetime,
            "registering type"
        );
        let implementation = Implementation {
            info: implementation,
            cast,
            lifetime,
        };
        self.implementations.insert(key, name, implementation);
        self.invalidate_plans();
        Ok(())
    }

    pub fn register_instance(
        &mut self,
        interface: &TypeInfo,
        instance: Instance,
        name: Option<&str>,
    ) -> Result<(), RegisterInstanceError> {
        let key = interface.key();
        if interface.kind() != TypeKind::Interface {
            return Err(RegisterInstanceError::NotAnInterface {
                interface: key.name(),
            });
        }
        if !interface.accepts(&instance) {
            return Err(RegisterInstanceError::InstanceMismatch {
                interface: key.name(),
            });
        }
        if self.instances.contains(key, name) {
            return Err(RegisterInstanceError::AlreadyRegistered {
                interface: key.name(),
                name: name.map(str::to_owned),
            });
        }

        debug!(interface = key.name(), name = ?name, "registering instance");
        self.instances.insert(key, name, instance);
        self.invalidate_plans();
        Ok(())
    }

    /// Remove every slot of an interface
    pub fn unregister(&mut self, key: TypeKey) {
        debug!(interface = key.name(), "unregistering all slots");
        self.implementations.remove_all(key);
        self.instances.remove_all(key);
        self.invalidate_plans();
    }

    /// Remove an implementation, and the singleton instance it may have produced
    pub fn unregister_type(&mut self, key: TypeKey, name: Option<&str>) {
        debug!(interface = key.name(), name = ?name, "unregistering type");
        let removed = self.implementations.remove(key, name);
        if let Some(Implementation {
            lifetime: Lifetime::Singleton,
            ..
        }) = removed
        {
            self.instances.remove(key, name);
        }
        self.invalidate_plans();
    }

    pub fn unregister_instance(&mut self, key: TypeKey, name: Option<&str>) {
        debug!(interface = key.name(), name = ?name, "unregistering instance");
        self.instances.remove(key, name);
        self.invalidate_plans();
    }

    pub fn reset(&mut self) {
        debug!("resetting registry");
        self.implementations.clear();
        self.instances.clear();
        self.plans.clear();
    }

    /// Occupied slots of an interface, anonymous first then named in name order
    pub fn slots(&self, key: TypeKey) -> Vec<Option<String>> {
        let mut slots: Vec<Option<String>> = self
            .implementations
            .names(key)
            .into_iter()
            .chain(self.instances.names(key))
            .map(|name| name.map(str::to_owned))
            .collect();
        slots.sort();
        slots.dedup();
        slots
    }

    /// Resolve a slot: fetch or build its plan, then execute it
    pub fn resolve(&mut self, key: TypeKey, name: Option<&str>) -> Result<Instance, ResolveError> {
        let plan = self.plan(key, name);
        plan.execute(&mut self.instances)
    }

    /// Cached plan for a slot, built on a miss
    ///
    /// Error plans are returned but never cached, so that a later registration can make the
    /// slot resolvable.
    fn plan(&mut self, key: TypeKey, name: Option<&str>) -> Arc<Plan> {
        if let Some(plan) = self.plans.get(key, name) {
            debug!(interface = key.name(), name = ?name, "cached plan");
            return Arc::clone(plan);
        }

        debug!(interface = key.name(), name = ?name, "building resolution plan");
        let plan = PlanBuilder::new(&self.implementations, &self.instances).build(key, name);
        let plan = Arc::new(plan);
        if !plan.is_error() {
            self.plans.insert(key, name, Arc::clone(&plan));
        }
        plan
    }

    /// Plans embed the plans of their dependencies: any registration change drops them all
    fn invalidate_plans(&mut self) {
        self.plans.clear();
    }
}
