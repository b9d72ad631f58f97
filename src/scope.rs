//! Scoped-lifetime cleanup registration.
//!
//! A [`Scope`] models the lifetime of a filesystem session or an in-flight
//! transaction. Code that creates resources tied to that lifetime registers
//! cleanup callbacks on the scope; when the scope is torn down (explicitly or
//! on drop), the callbacks run in LIFO order, each exactly once.

use parking_lot::Mutex;

type Cleanup = Box<dyn FnOnce() + Send>;

/// A lifetime scope with LIFO cleanup callbacks.
///
/// Callbacks run exactly once, in reverse order of registration, when
/// [`teardown`](Scope::teardown) is called or the scope is dropped.
/// Registrations made after teardown are discarded without running.
///
/// # Examples
///
/// ```
/// use fsfs_cache::scope::Scope;
/// use std::sync::{Arc, Mutex};
///
/// let order = Arc::new(Mutex::new(Vec::new()));
/// let scope = Scope::new();
/// for i in 0..3 {
///     let order = Arc::clone(&order);
///     scope.register_cleanup(move || order.lock().unwrap().push(i));
/// }
/// scope.teardown();
/// assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
/// ```
#[derive(Default)]
pub struct Scope {
    state: Mutex<ScopeState>,
}

#[derive(Default)]
struct ScopeState {
    cleanups: Vec<Cleanup>,
    torn_down: bool,
}

impl Scope {
    /// Create a new, empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback to run when this scope is torn down.
    ///
    /// If the scope has already been torn down, the callback is dropped
    /// without running.
    pub fn register_cleanup<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        if !state.torn_down {
            state.cleanups.push(Box::new(f));
        }
    }

    /// Tear down the scope, running all registered callbacks in LIFO order.
    ///
    /// Subsequent calls are no-ops.
    pub fn teardown(&self) {
        let cleanups = {
            let mut state = self.state.lock();
            state.torn_down = true;
            std::mem::take(&mut state.cleanups)
        };

        // The lock is released before callbacks run, so a callback may
        // safely touch this scope (e.g. query torn-down state).
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
    }

    /// Whether this scope has been torn down.
    pub fn is_torn_down(&self) -> bool {
        self.state.lock().torn_down
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.teardown();
    }
}

// =============================================================================
// Tests
// =============================================================================
