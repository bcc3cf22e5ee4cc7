/// Declare that trait objects can be used as registration keys.
///
/// This macro implements [Describe](crate::Describe) for each listed `dyn Trait` type.
/// The traits must have `Send + Sync` as supertraits.
///
/// ```
/// # use wirebox::interface;
/// trait Clock: Send + Sync {}
/// trait Mailer: Send + Sync {}
///
/// interface!(dyn Clock, dyn Mailer);
/// ```
#[macro_export]
macro_rules! interface {
    ($($interface:ty),+ $(,)?) => {
        $(
        impl $crate::Describe for $interface {
            fn describe() -> $crate::TypeInfo {
                $crate::TypeInfo::interface::<$interface>()
            }
        }
        )+
    };
}

/// Declare a concrete type, the interfaces it implements and its public constructors.
///
/// Constructors are listed in declaration order, which is the order used to select one during
/// resolution. Each constructor is a function or closure taking `Arc<dyn Trait>` parameters.
/// For preferred, private or fallible constructors, implement [Describe](crate::Describe) by
/// hand with [TypeInfo::component](crate::TypeInfo::component).
///
/// ```
/// # use std::sync::Arc;
/// # use wirebox::{component, interface};
/// trait Clock: Send + Sync {}
/// trait Scheduler: Send + Sync {}
/// interface!(dyn Clock, dyn Scheduler);
///
/// struct SystemClock;
/// impl Clock for SystemClock {}
///
/// struct Cron {
///     clock: Arc<dyn Clock>,
/// }
/// impl Scheduler for Cron {}
///
/// impl Cron {
///     fn new(clock: Arc<dyn Clock>) -> Self {
///         Self { clock }
///     }
/// }
///
/// component!(SystemClock => dyn Clock; || SystemClock);
/// component!(Cron => dyn Scheduler; Cron::new);
/// ```
#[macro_export]
macro_rules! component {
    ($concrete:ty => $($interface:ty),+ $(; $($constructor:expr),+ $(,)?)?) => {
        impl $crate::Describe for $concrete {
            fn describe() -> $crate::TypeInfo {
                $crate::TypeInfo::component::<$concrete>()
                    $(.implements::<$interface>(|this| this as ::std::sync::Arc<$interface>))+
                    $($(.constructor($constructor))+)?
                    .build()
            }
        }
    };
}
