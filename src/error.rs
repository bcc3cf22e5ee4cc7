//! Errors triggered while registering or resolving types

use thiserror::Error;

/// Boxed error returned by fallible constructors and factories
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn slot(name: &Option<String>) -> String {
    match name {
        None => "anonymous slot".to_owned(),
        Some(name) => format!("slot named {name:?}"),
    }
}

/// Errors triggered by [register_type](crate::Container::register_type) and its variants
#[derive(Error, Debug)]
pub enum RegisterTypeError {
    #[error("cannot register type: {interface} is not an interface")]
    NotAnInterface { interface: &'static str },
    #[error("cannot register type: {implementation} is an interface and cannot be instantiated")]
    NotInstantiable { implementation: &'static str },
    #[error("cannot register type: {implementation} does not implement {interface}")]
    NotAssignable {
        interface: &'static str,
        implementation: &'static str,
    },
    #[error("cannot register type: an implementation is already registered for {interface} ({})", slot(.name))]
    AlreadyRegistered {
        interface: &'static str,
        name: Option<String>,
    },
    #[error("cannot register type: {interface} registered from a constructor of the same container")]
    Reentrant { interface: &'static str },
}

/// Errors triggered by [register_instance](crate::Container::register_instance) and its variants
#[derive(Error, Debug)]
pub enum RegisterInstanceError {
    #[error("cannot register instance: {interface} is not an interface")]
    NotAnInterface { interface: &'static str },
    #[error("cannot register instance: the instance is not a shared {interface}")]
    InstanceMismatch { interface: &'static str },
    #[error("cannot register instance: an instance is already registered for {interface} ({})", slot(.name))]
    AlreadyRegistered {
        interface: &'static str,
        name: Option<String>,
    },
    #[error("cannot register instance: {interface} registered from a constructor of the same container")]
    Reentrant { interface: &'static str },
}

/// Any registration failure, as reported by bulk registration
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error(transparent)]
    Type(#[from] RegisterTypeError),
    #[error(transparent)]
    Instance(#[from] RegisterInstanceError),
}

/// Errors triggered during the resolution of an interface
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("cannot resolve: no registration found for {interface} ({})", slot(.name))]
    TypeNotRegistered {
        interface: &'static str,
        name: Option<String>,
    },
    #[error("cannot resolve: no public constructor for the implementation of {interface} ({})", slot(.name))]
    NoPublicConstructor {
        interface: &'static str,
        name: Option<String>,
    },
    #[error("cannot resolve: no resolvable constructor for the implementation of {interface} ({})", slot(.name))]
    NoResolvableConstructor {
        interface: &'static str,
        name: Option<String>,
    },
    #[error("cannot resolve: cyclic dependency detected for {interface} ({})", slot(.name))]
    CyclicDependency {
        interface: &'static str,
        name: Option<String>,
    },
    #[error("cannot resolve: constructor of {implementation} failed while building {interface}")]
    Construction {
        interface: &'static str,
        implementation: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("cannot resolve: stored value is not a shared {interface}")]
    TypeMismatch { interface: &'static str },
    /// A constructor or factory called back into the container building it
    #[error("cannot resolve: {interface} requested from a constructor of the same container")]
    Reentrant { interface: &'static str },
}

/// Discriminant of a [ResolveError], convenient for matching and assertions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveErrorKind {
    TypeNotRegistered,
    NoPublicConstructor,
    NoResolvableConstructor,
    CyclicDependency,
    Construction,
    TypeMismatch,
    Reentrant,
}

impl ResolveError {
    pub fn kind(&self) -> ResolveErrorKind {
        match self {
            ResolveError::TypeNotRegistered { .. } => ResolveErrorKind::TypeNotRegistered,
            ResolveError::NoPublicConstructor { .. } => ResolveErrorKind::NoPublicConstructor,
            ResolveError::NoResolvableConstructor { .. } => {
                ResolveErrorKind::NoResolvableConstructor
            }
            ResolveError::CyclicDependency { .. } => ResolveErrorKind::CyclicDependency,
            ResolveError::Construction { .. } => ResolveErrorKind::Construction,
            ResolveError::TypeMismatch { .. } => ResolveErrorKind::TypeMismatch,
            ResolveError::Reentrant { .. } => ResolveErrorKind::Reentrant,
        }
    }
}

/// Failure of a constructor thunk, before it is attached to the resolved interface
#[doc(hidden)]
#[derive(Debug)]
pub enum ConstructError {
    Failed(BoxError),
    ArgumentMismatch { expected: &'static str },
}
