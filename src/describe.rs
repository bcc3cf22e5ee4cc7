//! Type descriptors used in place of runtime reflection.
//!
//! The container never inspects types by itself: each type taking part in a registration
//! provides a [TypeInfo] through the [Describe] trait.
//!
//! * Interfaces are trait objects (`dyn Trait`), described with [TypeInfo::interface]
//!   (usually through the [interface](crate::interface) macro).
//! * Concrete types are described with [TypeInfo::component], listing the interfaces they
//!   implement and their constructors in declaration order.
//!
//! Constructors are plain functions or closures whose parameters are shared handles
//! (`Arc<dyn Trait>`) on other interfaces. The [Construct] trait extracts the parameter types
//! of such functions and calls them with type-erased arguments.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{BoxError, ConstructError};
use crate::key::TypeKey;

/// Type-erased shared handle: an `Arc<I>` wrapped in an `Arc<dyn Any>`
pub type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) type Invoke = dyn Fn(&[Instance]) -> Result<Instance, ConstructError> + Send + Sync;
pub(crate) type Cast = dyn Fn(&Instance) -> Option<Instance> + Send + Sync;

pub(crate) fn erase<I: ?Sized + Send + Sync + 'static>(handle: Arc<I>) -> Instance {
    Arc::new(handle)
}

pub(crate) fn restore<I: ?Sized + Send + Sync + 'static>(instance: &Instance) -> Option<Arc<I>> {
    instance.downcast_ref::<Arc<I>>().cloned()
}

fn holds<I: ?Sized + Send + Sync + 'static>(instance: &Instance) -> bool {
    instance.is::<Arc<I>>()
}

/// Provide the descriptor of a type
///
/// Implemented with the [interface](crate::interface) and [component](crate::component) macros,
/// or by hand for full control over constructors.
pub trait Describe: 'static {
    fn describe() -> TypeInfo;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// Abstract contract, usable as registration key
    Interface,
    /// Instantiable type, usable as implementation
    Concrete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// A constructor of a concrete type
#[derive(Clone)]
pub struct ConstructorInfo {
    parameters: Vec<TypeKey>,
    visibility: Visibility,
    preferred: bool,
    invoke: Arc<Invoke>,
}

impl ConstructorInfo {
    pub fn parameters(&self) -> &[TypeKey] {
        &self.parameters
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Constructor tried first during resolution
    pub fn is_preferred(&self) -> bool {
        self.preferred
    }

    pub(crate) fn invoker(&self) -> &Arc<Invoke> {
        &self.invoke
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("parameters", &self.parameters)
            .field("visibility", &self.visibility)
            .field("preferred", &self.preferred)
            .finish_non_exhaustive()
    }
}

/// Descriptor of a type taking part in registrations
#[derive(Clone)]
pub struct TypeInfo {
    key: TypeKey,
    kind: TypeKind,
    constructors: Vec<ConstructorInfo>,
    casts: HashMap<TypeId, Arc<Cast>>,
    accepts: Option<fn(&Instance) -> bool>,
}

impl TypeInfo {
    /// Describe an interface
    pub fn interface<I: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            key: TypeKey::of::<I>(),
            kind: TypeKind::Interface,
            constructors: Vec::new(),
            casts: HashMap::new(),
            accepts: Some(holds::<I>),
        }
    }

    /// Start describing a concrete type
    pub fn component<T: Send + Sync + 'static>() -> ComponentBuilder<T> {
        ComponentBuilder {
            info: Self {
                key: TypeKey::of::<T>(),
                kind: TypeKind::Concrete,
                constructors: Vec::new(),
                casts: HashMap::new(),
                accepts: None,
            },
            _marker: PhantomData,
        }
    }

    /// Describe a factory function as a concrete type with a single public constructor
    pub(crate) fn factory<I, Args, F>(factory: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Construct<Args, Arc<I>>,
    {
        let invoke = move |args: &[Instance]| factory.construct(args).map(erase::<I>);
        let same: Arc<Cast> = Arc::new(|instance: &Instance| Some(Arc::clone(instance)));
        Self {
            key: TypeKey::of::<F>(),
            kind: TypeKind::Concrete,
            constructors: vec![ConstructorInfo {
                parameters: <F as Construct<Args, Arc<I>>>::parameters(),
                visibility: Visibility::Public,
                preferred: false,
                invoke: Arc::new(invoke),
            }],
            casts: HashMap::from([(TypeId::of::<I>(), same)]),
            accepts: None,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    /// Check if this type declares an implementation of the interface
    pub fn implements(&self, interface: TypeKey) -> bool {
        self.casts.contains_key(&interface.id())
    }

    pub(crate) fn cast_to(&self, interface: TypeKey) -> Option<Arc<Cast>> {
        self.casts.get(&interface.id()).cloned()
    }

    /// Check that an erased instance holds a handle on this interface
    pub(crate) fn accepts(&self, instance: &Instance) -> bool {
        self.accepts.map_or(false, |accepts| accepts(instance))
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("constructors", &self.constructors)
            .finish_non_exhaustive()
    }
}

/// Collect the interfaces and constructors of a concrete type
pub struct ComponentBuilder<T> {
    info: TypeInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ComponentBuilder<T> {
    /// Declare that the type implements an interface
    ///
    /// The upcast is usually written as `|this| this as Arc<dyn Trait>`.
    pub fn implements<I>(mut self, upcast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let cast = move |instance: &Instance| {
            restore::<T>(instance).map(|concrete| erase(upcast(concrete)))
        };
        self.info.casts.insert(TypeId::of::<I>(), Arc::new(cast));
        self
    }

    /// Add a public constructor
    pub fn constructor<Args, F: Construct<Args, T>>(self, constructor: F) -> Self {
        let invoke = move |args: &[Instance]| {
            constructor
                .construct(args)
                .map(|value| erase(Arc::new(value)))
        };
        self.push(<F as Construct<Args, T>>::parameters(), Arc::new(invoke))
    }

    /// Add a public constructor which may fail
    pub fn fallible_constructor<Args, E, F>(self, constructor: F) -> Self
    where
        E: Into<BoxError>,
        F: Construct<Args, Result<T, E>>,
    {
        let invoke = move |args: &[Instance]| match constructor.construct(args)? {
            Ok(value) => Ok(erase(Arc::new(value))),
            Err(e) => Err(ConstructError::Failed(e.into())),
        };
        self.push(<F as Construct<Args, Result<T, E>>>::parameters(), Arc::new(invoke))
    }

    /// Mark the last added constructor as preferred
    pub fn preferred(mut self) -> Self {
        if let Some(last) = self.info.constructors.last_mut() {
            last.preferred = true;
        }
        self
    }

    /// Hide the last added constructor from the container
    pub fn private(mut self) -> Self {
        if let Some(last) = self.info.constructors.last_mut() {
            last.visibility = Visibility::Private;
        }
        self
    }

    pub fn build(self) -> TypeInfo {
        self.info
    }

    fn push(mut self, parameters: Vec<TypeKey>, invoke: Arc<Invoke>) -> Self {
        self.info.constructors.push(ConstructorInfo {
            parameters,
            visibility: Visibility::Public,
            preferred: false,
            invoke,
        });
        self
    }
}

/*
 * Constructors with up to 10 injected parameters.
 * The tuple of argument types is only used to select an implementation.
 */

/// A function whose parameters are shared handles on injectable types.
///
/// This trait is implemented for all functions taking up to 10 `Arc<_>` arguments, using the
/// tuple of their argument types to tell the implementations apart.
pub trait Construct<Args, Output>: Send + Sync + 'static {
    /// Keys of the injected parameters, in call order
    fn parameters() -> Vec<TypeKey>;

    /// Call the function with erased arguments matching [Construct::parameters]
    #[doc(hidden)]
    fn construct(&self, args: &[Instance]) -> Result<Output, ConstructError>;
}

fn argument<P: ?Sized + Send + Sync + 'static>(
    arg: Option<&Instance>,
) -> Result<Arc<P>, ConstructError> {
    arg.and_then(restore::<P>)
        .ok_or(ConstructError::ArgumentMismatch {
            expected: type_name::<P>(),
        })
}

macro_rules! construct_tuple ({ $($param:ident)* } => {
    impl<Func, Output, $($param,)*> Construct<($(Arc<$param>,)*), Output> for Func
    where
        Func: Fn($(Arc<$param>),*) -> Output + Send + Sync + 'static,
        $($param: ?Sized + Send + Sync + 'static,)*
    {
        #[inline]
        fn parameters() -> Vec<TypeKey> {
            vec![$(TypeKey::of::<$param>()),*]
        }

        #[inline]
        #[allow(non_snake_case, unused_mut, unused_variables)]
        fn construct(&self, args: &[Instance]) -> Result<Output, ConstructError> {
            let mut args = args.iter();
            $(let $param = argument::<$param>(args.next())?;)*
            Ok((self)($($param),*))
        }
    }
});

construct_tuple! {}
construct_tuple! { A }
construct_tuple! { A B }
construct_tuple! { A B C }
construct_tuple! { A B C D }
construct_tuple! { A B C D E }
construct_tuple! { A B C D E F }
construct_tuple! { A B C D E F G }
construct_tuple! { A B C D E F G H }
construct_tuple! { A B C D E F G H I }
construct_tuple! { A B C D E F G H I J }

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    trait Counter: Send + Sync {}

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    struct Polite {
        inner: Arc<dyn Greeter>,
    }

    impl Greeter for Polite {
        fn greet(&self) -> String {
            format!("{}, please", self.inner.greet())
        }
    }

    #[test]
    fn constructors_report_their_parameters() {
        let info = TypeInfo::component::<Polite>()
            .implements::<dyn Greeter>(|this| this as Arc<dyn Greeter>)
            .constructor(|inner: Arc<dyn Greeter>| Polite { inner })
            .preferred()
            .constructor(|inner: Arc<dyn Greeter>, _: Arc<dyn Counter>| Polite { inner })
            .private()
            .build();

        assert_eq!(info.kind(), TypeKind::Concrete);
        assert!(info.implements(TypeKey::of::<dyn Greeter>()));
        assert!(!info.implements(TypeKey::of::<dyn Counter>()));

        let [first, second] = info.constructors() else {
            panic!("expected two constructors");
        };
        assert_eq!(first.parameters(), &[TypeKey::of::<dyn Greeter>()]);
        assert!(first.is_preferred() && first.is_public());
        assert_eq!(second.parameters().len(), 2);
        assert!(!second.is_preferred());
        assert_eq!(second.visibility(), Visibility::Private);
    }

    #[test]
    fn invoke_and_cast_erased_instances() {
        let info = TypeInfo::component::<Polite>()
            .implements::<dyn Greeter>(|this| this as Arc<dyn Greeter>)
            .constructor(|inner: Arc<dyn Greeter>| Polite { inner })
            .build();

        let inner: Arc<dyn Greeter> = Arc::new(English);
        let built = (info.constructors()[0].invoker())(&[erase(inner)]).unwrap();
        let cast = info.cast_to(TypeKey::of::<dyn Greeter>()).unwrap();
        let greeter = restore::<dyn Greeter>(&cast(&built).unwrap()).unwrap();
        assert_eq!(greeter.greet(), "hello, please");
    }

    #[test]
    fn mismatched_arguments_are_reported() {
        let info = TypeInfo::component::<Polite>()
            .constructor(|inner: Arc<dyn Greeter>| Polite { inner })
            .build();

        let wrong: Arc<u32> = Arc::new(3);
        let result = (info.constructors()[0].invoker())(&[erase(wrong)]);
        assert!(matches!(
            result,
            Err(ConstructError::ArgumentMismatch { expected }) if expected.contains("Greeter")
        ));
        assert!((info.constructors()[0].invoker())(&[]).is_err());
    }

    #[test]
    fn fallible_constructors_forward_errors() {
        let info = TypeInfo::component::<English>()
            .fallible_constructor(|| Err::<English, _>("no language pack"))
            .build();

        match (info.constructors()[0].invoker())(&[]) {
            Err(ConstructError::Failed(e)) => assert_eq!(e.to_string(), "no language pack"),
            _ => panic!("expected a construction failure"),
        }
    }

    #[test]
    fn interfaces_accept_only_their_handles() {
        let info = TypeInfo::interface::<dyn Greeter>();
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        assert_eq!(info.kind(), TypeKind::Interface);
        assert!(info.accepts(&erase(greeter)));
        assert!(!info.accepts(&erase(Arc::new(English))));
        assert!(info.constructors().is_empty());
    }
}
