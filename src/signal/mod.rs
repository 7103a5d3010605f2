//! Single-fire broadcaster: the atomic building block of the crate.
//!
//! A [`Broadcaster`] is an ordered callback list that fires exactly once.
//! It is in exactly one of three states at any time:
//!
//! - **Accepting**: callbacks append to the queue
//! - **Fired**: a frozen snapshot of the fire-time arguments replays to any
//!   callback registered afterwards
//! - **Cancelled**: permanently inert; queued callbacks are discarded
//!
//! Once fired or cancelled, a broadcaster never returns to accepting.
//!
//! # Dispatch Semantics
//!
//! `fire` drains the queue in registration order, invoking each callback
//! synchronously on the caller's stack. The queue is re-borrowed per
//! iteration, so a callback may register further callbacks (which the same
//! drain still reaches) or attempt a reentrant fire (suppressed by an
//! explicit firing flag). The frozen snapshot is applied by a drop guard, so
//! the broadcaster reaches its terminal state even if a callback panics.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::types::Arg;

/// A queued callback. Receives the fire-time argument list.
pub type Callback<T> = Box<dyn FnMut(&[Arg<T>])>;

struct BroadcastState<T> {
    /// Callback queue. `None` once cancelled.
    queue: Option<VecDeque<Callback<T>>>,
    /// Frozen argument snapshot. `Some` once fired.
    snapshot: Option<Rc<[Arg<T>]>>,
    /// Reentrancy guard: true while a drain is on the stack.
    firing: bool,
}

/// A single-fire, ordered callback list.
///
/// Clones share the same underlying state; firing through one handle is
/// observed by all of them.
pub struct Broadcaster<T> {
    inner: Rc<RefCell<BroadcastState<T>>>,
}

impl<T> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Broadcaster<T> {
    /// Creates an empty broadcaster in the accepting state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BroadcastState {
                queue: Some(VecDeque::new()),
                snapshot: None,
                firing: false,
            })),
        }
    }

    /// Returns true if the broadcaster has fired or is currently firing.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        let state = self.inner.borrow();
        state.firing || state.snapshot.is_some()
    }

    /// Returns true if the broadcaster was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.borrow().queue.is_none()
    }

    /// Returns true if the broadcaster still accepts callbacks for a future
    /// fire.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        let state = self.inner.borrow();
        state.queue.is_some() && state.snapshot.is_none() && !state.firing
    }

    /// Cancels the broadcaster, discarding queued callbacks.
    ///
    /// Registration and firing become permanent no-ops. Cancelling during a
    /// drain stops the drain at the next iteration.
    pub fn cancel(&self) {
        tracing::trace!("broadcaster cancelled");
        self.inner.borrow_mut().queue = None;
    }
}

impl<T: 'static> Broadcaster<T> {
    /// Registers a callback.
    ///
    /// - Accepting: appended, runs at fire time in registration order.
    /// - Firing: appended; the running drain still reaches it.
    /// - Fired: invoked immediately with the frozen snapshot.
    /// - Cancelled: discarded.
    pub fn register<F>(&self, callback: F)
    where
        F: FnMut(&[Arg<T>]) + 'static,
    {
        self.push(Box::new(callback));
    }

    /// Registers a batch of callbacks in iterator order.
    pub fn register_all<I>(&self, callbacks: I)
    where
        I: IntoIterator<Item = Callback<T>>,
    {
        for callback in callbacks {
            self.push(callback);
        }
    }

    /// Fires the broadcaster with the given argument list.
    ///
    /// No-op if already fired, cancelled, or currently firing. Every queued
    /// callback is invoked synchronously in registration order with the
    /// argument snapshot; the snapshot is frozen on exit even if a callback
    /// panics.
    pub fn fire(&self, arguments: Vec<Arg<T>>) {
        let snapshot: Rc<[Arg<T>]> = {
            let mut state = self.inner.borrow_mut();
            if state.firing || state.snapshot.is_some() || state.queue.is_none() {
                return;
            }
            state.firing = true;
            Rc::from(arguments)
        };
        tracing::trace!(arguments = snapshot.len(), "broadcaster firing");

        // The guard freezes the snapshot and clears the firing flag on every
        // exit path, including unwinding out of a callback.
        let _guard = FreezeGuard {
            inner: Rc::clone(&self.inner),
            snapshot: Some(Rc::clone(&snapshot)),
        };
        self.drain(&snapshot);
    }

    fn push(&self, callback: Callback<T>) {
        let replay = {
            let mut state = self.inner.borrow_mut();
            let Some(queue) = state.queue.as_mut() else {
                // Cancelled: discard.
                return;
            };
            queue.push_back(callback);
            if state.firing {
                // The in-flight drain will reach the new entry.
                None
            } else {
                state.snapshot.clone()
            }
        };
        if let Some(snapshot) = replay {
            self.drain(&snapshot);
        }
    }

    /// Pops and invokes queued callbacks until the queue is empty or the
    /// broadcaster is cancelled. The borrow is released before each
    /// invocation so callbacks may re-enter.
    fn drain(&self, snapshot: &[Arg<T>]) {
        loop {
            let next = {
                let mut state = self.inner.borrow_mut();
                state.queue.as_mut().and_then(VecDeque::pop_front)
            };
            match next {
                Some(mut callback) => callback(snapshot),
                None => break,
            }
        }
    }
}

struct FreezeGuard<T> {
    inner: Rc<RefCell<BroadcastState<T>>>,
    snapshot: Option<Rc<[Arg<T>]>>,
}

impl<T> Drop for FreezeGuard<T> {
    fn drop(&mut self) {
        let mut state = self.inner.borrow_mut();
        state.snapshot = self.snapshot.take();
        state.firing = false;
    }
}

impl<T> core::fmt::Debug for Broadcaster<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.inner.borrow();
        let name = if state.queue.is_none() {
            "cancelled"
        } else if state.firing {
            "firing"
        } else if state.snapshot.is_some() {
            "fired"
        } else {
            "accepting"
        };
        f.debug_struct("Broadcaster").field("state", &name).finish()
    }
}
