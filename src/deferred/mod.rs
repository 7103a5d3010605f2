//! Settle-once futures: [`Deferred`] and its read-only [`Promise`] view.
//!
//! A deferred pairs two [`Broadcaster`]s, one per settlement path. The core
//! correctness invariant is mutual exclusion: settling either path cancels
//! the other broadcaster *before* any callback runs, so at most one path
//! ever fires and reentrant settlement attempts from inside callbacks are
//! silent no-ops.
//!
//! # Capability Split
//!
//! [`Deferred`] holds the mutation capability (resolve/reject) plus the full
//! observation surface. [`Promise`] is the observation subset: subscribe,
//! derive, and inspect, but never settle. Handing a `Promise` to consumers
//! keeps the single-writer discipline structural rather than conventional.
//!
//! # Late Subscription
//!
//! A callback registered after settlement replays immediately and
//! synchronously with the stored arguments, exactly as if it had been
//! registered before settlement.

use std::cell::RefCell;
use std::rc::Rc;

use crate::signal::Broadcaster;
use crate::types::{Arg, SettleState};

/// Shared settle state: the two single-fire paths.
struct SettleCore<T> {
    success: Broadcaster<T>,
    failure: Broadcaster<T>,
}

/// A mutable settle-once future.
///
/// Created pending; settles exactly once via [`resolve`](Self::resolve) or
/// [`reject`](Self::reject) and stays in that terminal state forever.
/// Clones share the same underlying state.
pub struct Deferred<T> {
    core: Rc<SettleCore<T>>,
}

/// The read-only view of a [`Deferred`].
///
/// Supports subscription and derivation but not settlement. Obtained from
/// [`Deferred::promise`]; cheap to clone.
pub struct Promise<T> {
    core: Rc<SettleCore<T>>,
    /// When set, the success and failure paths are presented swapped.
    inverted: bool,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
            inverted: self.inverted,
        }
    }
}

impl<T: Clone + 'static> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Deferred<T> {
    /// Creates a new pending deferred.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Rc::new(SettleCore {
                success: Broadcaster::new(),
                failure: Broadcaster::new(),
            }),
        }
    }

    /// Creates a new pending deferred and invokes `init` with it
    /// synchronously, for inline setup.
    #[must_use]
    pub fn with<F>(init: F) -> Self
    where
        F: FnOnce(&Self),
    {
        let deferred = Self::new();
        init(&deferred);
        deferred
    }

    /// Settles the success path with the given argument list.
    ///
    /// The failure path is cancelled before any callback runs. A second
    /// settlement of either flavor is a silent no-op.
    pub fn resolve(&self, arguments: Vec<Arg<T>>) -> &Self {
        if self.core.success.is_accepting() {
            tracing::trace!(arguments = arguments.len(), "deferred resolving");
            self.core.failure.cancel();
            self.core.success.fire(arguments);
        }
        self
    }

    /// Settles the success path with a single value.
    pub fn resolve_value(&self, value: T) -> &Self {
        self.resolve(vec![Arg::Value(value)])
    }

    /// Settles the failure path with the given argument list.
    ///
    /// The success path is cancelled before any callback runs. A second
    /// settlement of either flavor is a silent no-op.
    pub fn reject(&self, arguments: Vec<Arg<T>>) -> &Self {
        if self.core.failure.is_accepting() {
            tracing::trace!(arguments = arguments.len(), "deferred rejecting");
            self.core.success.cancel();
            self.core.failure.fire(arguments);
        }
        self
    }

    /// Settles the failure path with a single value.
    pub fn reject_value(&self, value: T) -> &Self {
        self.reject(vec![Arg::Value(value)])
    }

    /// Subscribes to the success path.
    pub fn done<F>(&self, callback: F) -> &Self
    where
        F: FnMut(&[Arg<T>]) + 'static,
    {
        self.core.success.register(callback);
        self
    }

    /// Subscribes to the failure path.
    pub fn fail<F>(&self, callback: F) -> &Self
    where
        F: FnMut(&[Arg<T>]) + 'static,
    {
        self.core.failure.register(callback);
        self
    }

    /// Subscribes to both paths. At most one invocation ever happens.
    pub fn always<F>(&self, callback: F) -> &Self
    where
        F: FnMut(&[Arg<T>]) + 'static,
    {
        self.promise().always(callback);
        self
    }

    /// Subscribes to success and failure in one call.
    pub fn then<D, F>(&self, on_done: D, on_fail: F) -> &Self
    where
        D: FnMut(&[Arg<T>]) + 'static,
        F: FnMut(&[Arg<T>]) + 'static,
    {
        self.done(on_done).fail(on_fail)
    }

    /// Derives a new promise from the success arguments; see
    /// [`Promise::chain`].
    pub fn chain<F, R>(&self, step: F) -> Promise<T>
    where
        F: FnMut(&[Arg<T>]) -> R + 'static,
        R: Into<Chained<T>>,
    {
        self.promise().chain(step)
    }

    /// Returns the read-only view.
    #[must_use]
    pub fn promise(&self) -> Promise<T> {
        Promise {
            core: Rc::clone(&self.core),
            inverted: false,
        }
    }

    /// Returns a read-only view with success and failure swapped.
    #[must_use]
    pub fn invert(&self) -> Promise<T> {
        self.promise().invert()
    }

    /// Returns the current settle state.
    #[must_use]
    pub fn state(&self) -> SettleState {
        self.promise().state()
    }
}

impl<T: Clone + 'static> Promise<T> {
    fn success(&self) -> &Broadcaster<T> {
        if self.inverted {
            &self.core.failure
        } else {
            &self.core.success
        }
    }

    fn failure(&self) -> &Broadcaster<T> {
        if self.inverted {
            &self.core.success
        } else {
            &self.core.failure
        }
    }

    /// Subscribes to the success path, with replay if already settled.
    pub fn done<F>(&self, callback: F) -> &Self
    where
        F: FnMut(&[Arg<T>]) + 'static,
    {
        self.success().register(callback);
        self
    }

    /// Subscribes to the failure path, with replay if already settled.
    pub fn fail<F>(&self, callback: F) -> &Self
    where
        F: FnMut(&[Arg<T>]) + 'static,
    {
        self.failure().register(callback);
        self
    }

    /// Subscribes to both paths. At most one invocation ever happens, since
    /// settling one path cancels the other.
    pub fn always<F>(&self, callback: F) -> &Self
    where
        F: FnMut(&[Arg<T>]) + 'static,
    {
        let shared = Rc::new(RefCell::new(callback));
        let on_done = Rc::clone(&shared);
        self.done(move |arguments| (&mut *on_done.borrow_mut())(arguments));
        self.fail(move |arguments| (&mut *shared.borrow_mut())(arguments));
        self
    }

    /// Subscribes to success and failure in one call.
    pub fn then<D, F>(&self, on_done: D, on_fail: F) -> &Self
    where
        D: FnMut(&[Arg<T>]) + 'static,
        F: FnMut(&[Arg<T>]) + 'static,
    {
        self.done(on_done).fail(on_fail)
    }

    /// Derives a new promise that, once this one succeeds, runs `step` with
    /// the success arguments.
    ///
    /// If `step` returns [`Chained::Observable`], the derived promise tracks
    /// that nested result: its success or failure forwards transitively
    /// (promise flattening). Otherwise the derived promise resolves
    /// immediately with the returned values. Failure of this promise
    /// forwards to the derived one unchanged.
    pub fn chain<F, R>(&self, mut step: F) -> Self
    where
        F: FnMut(&[Arg<T>]) -> R + 'static,
        R: Into<Chained<T>>,
    {
        let next = Deferred::new();

        let forward = next.clone();
        self.done(move |arguments| match step(arguments).into() {
            Chained::Immediate(values) => {
                forward.resolve(values);
            }
            Chained::Observable(nested) => {
                let on_done = forward.clone();
                let on_fail = forward.clone();
                nested.then(
                    move |inner| {
                        on_done.resolve(inner.to_vec());
                    },
                    move |inner| {
                        on_fail.reject(inner.to_vec());
                    },
                );
            }
        });

        let forward = next.clone();
        self.fail(move |arguments| {
            forward.reject(arguments.to_vec());
        });

        next.promise()
    }

    /// Returns a view with success and failure swapped.
    #[must_use]
    pub fn invert(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
            inverted: !self.inverted,
        }
    }

    /// Returns a fresh read-only handle to the same settle state.
    #[must_use]
    pub fn promise(&self) -> Self {
        self.clone()
    }

    /// Returns the current settle state, as seen through this view.
    ///
    /// An inverted view reports [`SettleState::Fulfilled`] when the
    /// underlying failure path fired, and vice versa.
    #[must_use]
    pub fn state(&self) -> SettleState {
        if self.success().has_fired() {
            SettleState::Fulfilled
        } else if self.failure().has_fired() {
            SettleState::Rejected
        } else {
            SettleState::Pending
        }
    }
}

/// Result of a [`Promise::chain`] step: either plain values the derived
/// promise resolves with immediately, or a nested observable the derived
/// promise tracks.
///
/// The typed payload makes the self-referential cycle (a promise resolving
/// with itself) unrepresentable, so no cycle guard is needed.
pub enum Chained<T> {
    /// Plain values; the derived promise resolves with them at once.
    Immediate(Vec<Arg<T>>),
    /// A nested observable; its settlement forwards to the derived promise.
    Observable(Promise<T>),
}

impl<T> From<Vec<Arg<T>>> for Chained<T> {
    fn from(values: Vec<Arg<T>>) -> Self {
        Self::Immediate(values)
    }
}

impl<T> From<Arg<T>> for Chained<T> {
    fn from(value: Arg<T>) -> Self {
        Self::Immediate(vec![value])
    }
}

impl<T> From<Promise<T>> for Chained<T> {
    fn from(promise: Promise<T>) -> Self {
        Self::Observable(promise)
    }
}

impl<T: Clone + 'static> From<Deferred<T>> for Chained<T> {
    fn from(deferred: Deferred<T>) -> Self {
        Self::Observable(deferred.promise())
    }
}

impl<T: Clone + 'static> core::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Deferred").field("state", &self.state()).finish()
    }
}

impl<T: Clone + 'static> core::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Promise")
            .field("state", &self.state())
            .field("inverted", &self.inverted)
            .finish()
    }
}
