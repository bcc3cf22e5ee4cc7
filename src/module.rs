//! Bulk registration.
//!
//! A [Module] groups the registrations of a part of the application, and is applied to a
//! container with [Container::install](crate::Container::install). Each [Registration] is the
//! type-erased form of a `register_*` call.

use std::sync::Arc;

use crate::describe::{erase, Describe, Instance, TypeInfo};
use crate::registry::Lifetime;

pub(crate) enum Target {
    Type(TypeInfo),
    Instance(Instance),
}

/// A pending registration: an interface, its implementation or instance, a slot and a lifetime
pub struct Registration {
    pub(crate) interface: TypeInfo,
    pub(crate) target: Target,
    pub(crate) name: Option<String>,
    pub(crate) lifetime: Lifetime,
}

impl Registration {
    /// Register an implementation described at runtime
    pub fn new(interface: TypeInfo, implementation: TypeInfo) -> Self {
        Self {
            interface,
            target: Target::Type(implementation),
            name: None,
            lifetime: Lifetime::Transient,
        }
    }

    /// Register the implementation `T` for the interface `I`
    pub fn of<I: ?Sized + Describe, T: ?Sized + Describe>() -> Self {
        Self::new(I::describe(), T::describe())
    }

    /// Register a shared instance for the interface `I`
    pub fn instance<I: ?Sized + Describe + Send + Sync>(instance: Arc<I>) -> Self {
        Self::with_instance(I::describe(), erase(instance))
    }

    /// Register an erased instance, which must hold an `Arc` of the interface
    pub fn with_instance(interface: TypeInfo, instance: Instance) -> Self {
        Self {
            interface,
            target: Target::Instance(instance),
            name: None,
            lifetime: Lifetime::Transient,
        }
    }

    /// Use a named slot instead of the anonymous one
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn singleton(self) -> Self {
        self.lifetime(Lifetime::Singleton)
    }

    /// Set the lifetime of an implementation (ignored for instances)
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn interface(&self) -> &TypeInfo {
        &self.interface
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Source of registrations, typically one per application layer
pub trait Module {
    fn registrations(&self) -> Vec<Registration>;
}
