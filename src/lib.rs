//! Dependency injection container with constructor injection, named slots and cached
//! resolution plans.
//!
//! # Simple use case
//!
//! ```
//! # use std::sync::Arc;
//! # use wirebox::*;
//! // Define traits and implementors
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! trait Announcer: Send + Sync {
//!     fn announce(&self) -> String;
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "Hello world".into()
//!     }
//! }
//!
//! struct Loud {
//!     greeter: Arc<dyn Greeter>,
//! }
//!
//! impl Loud {
//!     fn new(greeter: Arc<dyn Greeter>) -> Self {
//!         Self { greeter }
//!     }
//! }
//!
//! impl Announcer for Loud {
//!     fn announce(&self) -> String {
//!         self.greeter.greet().to_uppercase()
//!     }
//! }
//!
//! // Describe interfaces and implementations
//! interface!(dyn Greeter, dyn Announcer);
//! component!(English => dyn Greeter; || English);
//! component!(Loud => dyn Announcer; Loud::new);
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Register and resolve
//! let container = Container::new();
//! container.register_type::<dyn Greeter, English>(Lifetime::Singleton)?;
//! container.register_type::<dyn Announcer, Loud>(Lifetime::Transient)?;
//!
//! let announcer: Arc<dyn Announcer> = container.resolve()?;
//! assert_eq!(announcer.announce(), "HELLO WORLD");
//! # Ok(())
//! # }
//! ```
//!
//! # Mechanism
//!
//! Rust has no runtime reflection, so every type taking part in a registration describes
//! itself through the [Describe] trait: interfaces are trait objects, concrete types list the
//! interfaces they implement and their constructors (see [TypeInfo]).
//!
//! * Registrations fill slots keyed by interface and optional name. Each interface has an
//!   anonymous slot and any number of named slots, for implementations and for instances.
//! * On the first resolution of a slot, the container builds a plan: for each implementation
//!   in the dependency tree it selects the first resolvable constructor, trying preferred
//!   constructors, then the parameterless one, then the others in declaration order.
//!   Constructor parameters are resolved in the same slot name as the requested interface.
//! * Valid plans are cached until the registrations change. Failed plans are not cached, so
//!   registering a missing dependency is enough to make the slot resolvable.
//! * Singleton registrations store their instance after the first construction.
//!
//! Cyclic dependencies are detected while building the plan and reported as
//! [ResolveError::CyclicDependency].

mod container;
mod describe;
mod error;
mod key;
mod macros;
mod module;
mod plan;
mod registry;

use once_cell::sync::Lazy;

pub use container::Container;
pub use describe::{
    ComponentBuilder, Construct, ConstructorInfo, Describe, Instance, TypeInfo, TypeKind,
    Visibility,
};
pub use error::{
    BoxError, RegisterInstanceError, RegisterTypeError, RegistrationError, ResolveError,
    ResolveErrorKind,
};
pub use key::TypeKey;
pub use module::{Module, Registration};
pub use registry::Lifetime;

static GLOBAL: Lazy<Container> = Lazy::new(Container::new);

/// Process-wide container, created on first use.
///
/// Prefer passing an explicit [Container] from the composition root. The global one is never
/// dropped; call [Container::reset] to start over.
pub fn global() -> &'static Container {
    &GLOBAL
}
