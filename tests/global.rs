use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use wirebox::{component, interface, BoxError, Lifetime, ResolveErrorKind};

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

interface!(dyn Clock);

struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        42
    }
}

component!(FixedClock => dyn Clock; || FixedClock);

#[test]
fn global_container_is_shared() -> Result<(), BoxError> {
    wirebox::global().register_type::<dyn Clock, FixedClock>(Lifetime::Singleton)?;

    let clock: Arc<dyn Clock> = wirebox::global().resolve()?;
    assert_eq!(clock.now(), 42);
    assert!(Arc::ptr_eq(&clock, &wirebox::global().resolve::<dyn Clock>()?));

    wirebox::global().reset();
    let err = wirebox::global().resolve::<dyn Clock>().err().map(|e| e.kind());
    assert_eq!(err, Some(ResolveErrorKind::TypeNotRegistered));

    // a factory calling the global container while it builds
    static REENTERED: AtomicBool = AtomicBool::new(false);
    wirebox::global().register_factory::<dyn Clock, _, _>(Lifetime::Transient, || {
        let inner = wirebox::global().resolve::<dyn Clock>();
        let kind = inner.err().map(|e| e.kind());
        REENTERED.store(kind == Some(ResolveErrorKind::Reentrant), Ordering::SeqCst);
        Arc::new(FixedClock) as Arc<dyn Clock>
    })?;

    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let clock = wirebox::global().try_resolve::<dyn Clock>();
        let _ = sender.send(clock.map(|clock| clock.now()));
    });
    assert_eq!(receiver.recv_timeout(Duration::from_secs(5))?, Some(42));
    assert!(REENTERED.load(Ordering::SeqCst));

    wirebox::global().reset();
    Ok(())
}
