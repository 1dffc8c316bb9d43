//! Shutdown signalling shared between threads
//!
//! Every loop and background thread of an executable holds a clone of the same [`Shutdown`].
//! Any of them may trigger it, after which all of them stop at their next check. Waiting on the
//! signal is interruptible, so a loop sleeping until its next cycle wakes as soon as the
//! shutdown is triggered.
//!
//! A thread which panics while holding a [`PanicGuard`] triggers the shutdown as it unwinds.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{error, info};
use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard},
    thread,
    time::{Duration, Instant},
};

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

type Listener = Box<dyn Fn() + Send + Sync>;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// A cloneable shutdown signal.
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    /// The cause of the shutdown, `None` until triggered.
    cause: Mutex<Option<String>>,

    cvar: Condvar,

    /// Called once when the shutdown is triggered.
    listeners: Mutex<Vec<Listener>>,
}

/// Triggers the shutdown if dropped while its thread is panicking.
///
/// Obtained from [`Shutdown::trigger_on_panic`], keep it alive for the whole body of the thread.
pub struct PanicGuard {
    shutdown: Shutdown,

    name: String,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the shutdown, waking every waiting thread.
    ///
    /// Only the first cause is kept, later triggers are ignored.
    pub fn trigger<S: Into<String>>(&self, cause: S) {
        let first = {
            let mut guard = self.lock();

            match guard.is_none() {
                true => {
                    let cause = cause.into();
                    info!("Shutdown triggered: {}", cause);
                    *guard = Some(cause);
                    true
                }
                false => false,
            }
        };

        self.inner.cvar.notify_all();

        // The cause lock is released so listeners may query the shutdown
        if first {
            for listener in self.listeners().iter() {
                listener();
            }
        }
    }

    /// Call `listener` when the shutdown is triggered, or now if it already has been.
    ///
    /// Used to wake threads blocked on something other than the shutdown itself. The listener
    /// may be called more than once and must not register further listeners.
    pub fn on_trigger<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let listener: Listener = Box::new(listener);

        let mut listeners = self.listeners();
        if self.is_triggered() {
            listener();
        }
        listeners.push(listener);
    }

    /// Get a guard which triggers the shutdown if the current thread panics while holding it.
    pub fn trigger_on_panic<S: Into<String>>(&self, name: S) -> PanicGuard {
        PanicGuard {
            shutdown: self.clone(),
            name: name.into(),
        }
    }

    /// Return true if the shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.lock().is_some()
    }

    /// Get the cause of the shutdown, if it has been triggered.
    pub fn cause(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Block for at most `timeout`, returning early if the shutdown is triggered.
    ///
    /// Returns true if the shutdown has been triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        // A timeout too long to be represented is as good as none
        let deadline = match Instant::now().checked_add(timeout) {
            Some(d) => d,
            None => {
                self.wait();
                return true;
            }
        };
        let mut guard = self.lock();

        while guard.is_none() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }

            guard = match self.inner.cvar.wait_timeout(guard, deadline - now) {
                Ok((g, _)) => g,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }

        true
    }

    /// Block until the shutdown is triggered.
    pub fn wait(&self) {
        let mut guard = self.lock();

        while guard.is_none() {
            guard = match self.inner.cvar.wait(guard) {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Lock the cause. A poisoned lock is still usable as the cause is only ever replaced whole.
    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        match self.inner.cause.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<Listener>> {
        match self.inner.listeners.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("{} panicked", self.name);
            self.shutdown.trigger(format!("{} panicked", self.name));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_trigger_keeps_first_cause() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        assert_eq!(shutdown.cause(), None);

        shutdown.trigger("first");
        shutdown.trigger("second");

        assert!(shutdown.is_triggered());
        assert_eq!(shutdown.cause().as_deref(), Some("first"));
    }

    #[test]
    fn test_wait_timeout_expires() {
        let shutdown = Shutdown::new();
        let start = Instant::now();

        assert!(!shutdown.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_trigger_wakes_waiters() {
        let shutdown = Shutdown::new();
        let waiter = shutdown.clone();

        let jh = thread::spawn(move || waiter.wait_timeout(Duration::from_secs(10)));

        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        shutdown.trigger("test");

        assert!(jh.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_wait_timeout_unrepresentable() {
        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();

        let jh = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            trigger.trigger("test");
        });

        assert!(shutdown.wait_timeout(Duration::MAX));
        jh.join().unwrap();
    }

    #[test]
    fn test_listeners_called_on_trigger() {
        let shutdown = Shutdown::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        shutdown.on_trigger(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        shutdown.trigger("first");
        shutdown.trigger("second");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Registered after the trigger
        let c = calls.clone();
        shutdown.on_trigger(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panic_triggers_shutdown() {
        let shutdown = Shutdown::new();
        let worker = shutdown.clone();

        let res = thread::spawn(move || {
            let _guard = worker.trigger_on_panic("worker");
            panic!("worker failure");
        })
        .join();

        assert!(res.is_err());
        assert_eq!(shutdown.cause().as_deref(), Some("worker panicked"));
    }

    #[test]
    fn test_guard_dropped_normally() {
        let shutdown = Shutdown::new();

        {
            let _guard = shutdown.trigger_on_panic("worker");
        }

        assert!(!shutdown.is_triggered());
    }
}
