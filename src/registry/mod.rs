//! Owner-attributed task tracking and group quiescence.
//!
//! A [`TaskRegistry`] lets independent producers announce outstanding work
//! against a shared set of owners without coordinating on a completion
//! object, and lets any consumer ask for one promise that settles when all
//! tasks *currently* pending against a set of owners have finished.
//!
//! # Bookkeeping Invariants
//!
//! - A task id appears in the owner index for every owner in its record and
//!   nowhere else.
//! - Settlement of a task's completion signal, success or failure alike,
//!   prunes the record and all its index entries.
//! - An owner whose index set becomes empty is removed entirely; the index
//!   holds no empty residue.
//!
//! # Context, Not a Global
//!
//! The registry is an explicit context object passed to all operations.
//! Callers construct one and clone handles freely; clones share state. The
//! prune hooks hold only weak references, so dropping every registry handle
//! drops the bookkeeping even while tasks are still pending.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::combinator::{when, WhenInput};
use crate::deferred::{Deferred, Promise};
use crate::types::{Arg, TaskId};

/// How a task's completion signal is held.
enum Completion<T> {
    /// The registry holds the owning handle; the task was attached without
    /// work and can be settled by id.
    Held(Deferred<T>),
    /// The registry only watches an externally-settled promise.
    Watched(Promise<T>),
}

impl<T: Clone + 'static> Completion<T> {
    fn promise(&self) -> Promise<T> {
        match self {
            Self::Held(deferred) => deferred.promise(),
            Self::Watched(promise) => promise.clone(),
        }
    }
}

struct TaskRecord<O, T> {
    /// Owners the task is attributed to, in attachment order.
    owners: SmallVec<[O; 2]>,
    completion: Completion<T>,
}

struct RegistryState<O, T> {
    next_id: u64,
    tasks: HashMap<TaskId, TaskRecord<O, T>>,
    /// Reverse index: owner to its live task ids. Ordered sets keep scans
    /// deterministic.
    owner_index: HashMap<O, BTreeSet<TaskId>>,
}

/// A table of pending tasks attributed to owners, with a reverse index for
/// group-quiescence queries.
///
/// `O` is the owner identity (any `Clone + Eq + Hash` type); `T` is the
/// settlement payload carried by completion signals.
pub struct TaskRegistry<O, T> {
    inner: Rc<RefCell<RegistryState<O, T>>>,
}

impl<O, T> Clone for TaskRegistry<O, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<O, T> Default for TaskRegistry<O, T>
where
    O: Clone + Eq + Hash + 'static,
    T: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<O, T> TaskRegistry<O, T>
where
    O: Clone + Eq + Hash + 'static,
    T: Clone + 'static,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryState {
                next_id: 0,
                tasks: HashMap::new(),
                owner_index: HashMap::new(),
            })),
        }
    }

    /// Attaches a unit of work to the given owners.
    ///
    /// The work inputs collapse through [`when`] into one completion signal.
    /// On settlement, success or failure alike, the task is pruned from the
    /// table and from every owner's index. If the collapsed signal is
    /// already settled, the task is pruned before this call returns.
    pub fn attach<I>(&self, owners: &[O], work: I) -> TaskId
    where
        I: IntoIterator<Item = WhenInput<T>>,
    {
        self.insert(owners, Completion::Watched(when(work)))
    }

    /// Attaches a task with no work supplied, returning the deferred the
    /// caller must later settle.
    ///
    /// The registry keeps the owning handle too, so the task can also be
    /// finished by id via [`finish`](Self::finish) / [`abort`](Self::abort).
    pub fn attach_pending(&self, owners: &[O]) -> (TaskId, Deferred<T>) {
        let handle: Deferred<T> = Deferred::new();
        let id = self.insert(owners, Completion::Held(handle.clone()));
        (id, handle)
    }

    /// Builds the aggregate promise for everything currently outstanding on
    /// the given owners.
    ///
    /// Snapshot semantics: only tasks live at call time are watched, each
    /// counted once even when shared between requested owners. The aggregate
    /// resolves with the owner collection as its sole argument once every
    /// watched task succeeded, and rejects with the owner collection the
    /// moment any watched task fails. With nothing outstanding it resolves
    /// during this call, with no observable pending period.
    pub fn quiescence(&self, owners: &[O]) -> Promise<O> {
        let watched: Vec<Promise<T>> = {
            let state = self.inner.borrow();
            let mut seen: BTreeSet<TaskId> = BTreeSet::new();
            let mut watched = Vec::new();
            for owner in owners {
                if let Some(ids) = state.owner_index.get(owner) {
                    for id in ids {
                        if seen.insert(*id) {
                            if let Some(record) = state.tasks.get(id) {
                                watched.push(record.completion.promise());
                            }
                        }
                    }
                }
            }
            watched
        };
        tracing::debug!(owners = owners.len(), watched = watched.len(), "quiescence query");

        let aggregate: Deferred<O> = Deferred::new();
        let owner_args: Vec<Arg<O>> =
            vec![Arg::List(owners.iter().cloned().map(Arg::Value).collect())];
        // Bias of 1, released after subscription; see the when combinator.
        let remaining = Rc::new(std::cell::Cell::new(1_usize));

        for completion in watched {
            remaining.set(remaining.get() + 1);

            let remaining_done = Rc::clone(&remaining);
            let resolve = aggregate.clone();
            let resolved_args = owner_args.clone();
            completion.done(move |_| {
                let left = remaining_done.get() - 1;
                remaining_done.set(left);
                if left == 0 {
                    resolve.resolve(resolved_args.clone());
                }
            });

            let reject = aggregate.clone();
            let rejected_args = owner_args.clone();
            completion.fail(move |_| {
                reject.reject(rejected_args.clone());
            });
        }

        let left = remaining.get() - 1;
        remaining.set(left);
        if left == 0 {
            aggregate.resolve(owner_args);
        }
        aggregate.promise()
    }

    /// Settles a registry-held pending task by id on the success path.
    ///
    /// For a task attached with external work, only the bookkeeping is
    /// dropped; the external signal keeps its own lifecycle. Returns whether
    /// the id was live.
    pub fn finish(&self, id: TaskId) -> bool {
        self.settle_by_id(id, true)
    }

    /// Settles a registry-held pending task by id on the failure path.
    ///
    /// Same bookkeeping rules as [`finish`](Self::finish). Returns whether
    /// the id was live.
    pub fn abort(&self, id: TaskId) -> bool {
        self.settle_by_id(id, false)
    }

    /// Number of live tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    /// Returns true if no task is outstanding.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.inner.borrow().tasks.is_empty()
    }

    /// Returns true if the id refers to a live task.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.inner.borrow().tasks.contains_key(&id)
    }

    /// Live task ids attributed to the owner, in id order.
    #[must_use]
    pub fn tasks_for(&self, owner: &O) -> Vec<TaskId> {
        self.inner
            .borrow()
            .owner_index
            .get(owner)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Owners a live task is attributed to, in attachment order.
    #[must_use]
    pub fn owners_of(&self, id: TaskId) -> Vec<O> {
        self.inner
            .borrow()
            .tasks
            .get(&id)
            .map(|record| record.owners.to_vec())
            .unwrap_or_default()
    }

    fn insert(&self, owners: &[O], completion: Completion<T>) -> TaskId {
        let signal = completion.promise();
        let id = {
            let mut state = self.inner.borrow_mut();
            let id = TaskId::from_raw(state.next_id);
            state.next_id += 1;
            for owner in owners {
                state.owner_index.entry(owner.clone()).or_default().insert(id);
            }
            state.tasks.insert(
                id,
                TaskRecord {
                    owners: owners.iter().cloned().collect(),
                    completion,
                },
            );
            id
        };
        tracing::debug!(task = %id, owners = owners.len(), "task attached");

        // Registered after the borrow is released: an already-settled signal
        // replays the hook immediately and prunes the fresh record.
        let registry = Rc::downgrade(&self.inner);
        signal.always(move |_| {
            prune(&registry, id);
        });
        id
    }

    fn settle_by_id(&self, id: TaskId, success: bool) -> bool {
        let held = {
            let state = self.inner.borrow();
            match state.tasks.get(&id) {
                None => return false,
                Some(record) => match &record.completion {
                    Completion::Held(deferred) => Some(deferred.clone()),
                    Completion::Watched(_) => None,
                },
            }
        };
        match held {
            Some(deferred) => {
                // Settling runs the prune hook synchronously.
                if success {
                    deferred.resolve(Vec::new());
                } else {
                    deferred.reject(Vec::new());
                }
            }
            None => prune(&Rc::downgrade(&self.inner), id),
        }
        true
    }
}

/// Removes a task record and every owner-index entry pointing at it.
fn prune<O, T>(registry: &Weak<RefCell<RegistryState<O, T>>>, id: TaskId)
where
    O: Clone + Eq + Hash,
{
    let Some(inner) = registry.upgrade() else {
        return;
    };
    let mut state = inner.borrow_mut();
    let Some(record) = state.tasks.remove(&id) else {
        return;
    };
    for owner in &record.owners {
        if let Some(ids) = state.owner_index.get_mut(owner) {
            ids.remove(&id);
            if ids.is_empty() {
                state.owner_index.remove(owner);
            }
        }
    }
    tracing::trace!(task = %id, "task pruned");
}

impl<O, T> core::fmt::Debug for TaskRegistry<O, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("TaskRegistry")
            .field("tasks", &state.tasks.len())
            .field("indexed_owners", &state.owner_index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{args, SettleState};

    type Registry = TaskRegistry<&'static str, i32>;

    #[test]
    fn attach_pending_tracks_until_settled() {
        let registry = Registry::new();
        let (id, handle) = registry.attach_pending(&["a"]);

        assert!(registry.contains(id));
        assert_eq!(registry.tasks_for(&"a"), vec![id]);

        handle.resolve(args([1]));
        assert!(!registry.contains(id));
        assert!(registry.tasks_for(&"a").is_empty());
        assert!(registry.is_idle());
    }

    #[test]
    fn failure_prunes_like_success() {
        let registry = Registry::new();
        let (id, handle) = registry.attach_pending(&["a"]);
        handle.reject(args([0]));
        assert!(!registry.contains(id));
        assert!(registry.is_idle());
    }

    #[test]
    fn attach_with_settled_work_prunes_immediately() {
        let registry = Registry::new();
        let done: Deferred<i32> = Deferred::new();
        done.resolve(args([1]));

        let id = registry.attach(&["a"], [WhenInput::from(done)]);
        assert!(!registry.contains(id));
        assert!(registry.is_idle());
    }

    #[test]
    fn owner_index_has_no_empty_residue() {
        let registry = Registry::new();
        let (_, h1) = registry.attach_pending(&["a", "b"]);
        let (_, h2) = registry.attach_pending(&["b"]);

        h1.resolve(Vec::new());
        // "a" emptied and removed; "b" still holds the second task.
        assert!(registry.tasks_for(&"a").is_empty());
        assert_eq!(registry.tasks_for(&"b").len(), 1);

        h2.resolve(Vec::new());
        assert!(registry.tasks_for(&"b").is_empty());
        assert!(registry.is_idle());
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let registry = Registry::new();
        let (id1, h1) = registry.attach_pending(&["a"]);
        h1.resolve(Vec::new());
        let (id2, _h2) = registry.attach_pending(&["a"]);
        assert!(id2 > id1);
    }

    #[test]
    fn quiescence_waits_for_outstanding_work() {
        let registry = Registry::new();
        let (_, handle) = registry.attach_pending(&["a", "b"]);

        let aggregate = registry.quiescence(&["a"]);
        assert_eq!(aggregate.state(), SettleState::Pending);

        handle.resolve(Vec::new());
        assert_eq!(aggregate.state(), SettleState::Fulfilled);
    }

    #[test]
    fn quiescence_resolves_with_the_owner_collection() {
        let registry = Registry::new();
        let aggregate = registry.quiescence(&["a", "b"]);

        let resolved: Rc<RefCell<Vec<Vec<Arg<&'static str>>>>> =
            Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&resolved);
        aggregate.done(move |a| sink.borrow_mut().push(a.to_vec()));

        assert_eq!(
            *resolved.borrow(),
            vec![vec![Arg::list(["a", "b"])]]
        );
    }

    #[test]
    fn quiescence_with_no_tasks_is_never_observably_pending() {
        let registry = Registry::new();
        let aggregate = registry.quiescence(&["a"]);
        // Settled before any callback registered after the call could see a
        // pending period.
        assert_eq!(aggregate.state(), SettleState::Fulfilled);
    }

    #[test]
    fn quiescence_rejects_when_any_watched_task_fails() {
        let registry = Registry::new();
        let (_, ok) = registry.attach_pending(&["a"]);
        let (_, bad) = registry.attach_pending(&["a"]);

        let aggregate = registry.quiescence(&["a"]);
        bad.reject(Vec::new());
        assert_eq!(aggregate.state(), SettleState::Rejected);

        // The other task settling later has no further effect.
        ok.resolve(Vec::new());
        assert_eq!(aggregate.state(), SettleState::Rejected);
    }

    #[test]
    fn shared_task_is_counted_once() {
        let registry = Registry::new();
        let (_, shared) = registry.attach_pending(&["a", "b"]);

        let aggregate = registry.quiescence(&["a", "b"]);
        assert_eq!(aggregate.state(), SettleState::Pending);

        // One settlement suffices; double counting would leave it pending.
        shared.resolve(Vec::new());
        assert_eq!(aggregate.state(), SettleState::Fulfilled);
    }

    #[test]
    fn tasks_attached_after_the_query_are_not_awaited() {
        let registry = Registry::new();
        let (_, before) = registry.attach_pending(&["a"]);
        let aggregate = registry.quiescence(&["a"]);

        let (_, after) = registry.attach_pending(&["a"]);
        before.resolve(Vec::new());

        // The later task is still pending, but the snapshot aggregate is done.
        assert_eq!(aggregate.state(), SettleState::Fulfilled);
        after.resolve(Vec::new());
    }

    #[test]
    fn finish_settles_a_held_task_by_id() {
        let registry = Registry::new();
        let (id, handle) = registry.attach_pending(&["a"]);

        assert!(registry.finish(id));
        assert_eq!(handle.state(), SettleState::Fulfilled);
        assert!(!registry.contains(id));
        assert!(!registry.finish(id));
    }

    #[test]
    fn abort_settles_on_the_failure_path() {
        let registry = Registry::new();
        let (id, handle) = registry.attach_pending(&["a"]);

        assert!(registry.abort(id));
        assert_eq!(handle.state(), SettleState::Rejected);
        assert!(!registry.contains(id));
    }

    #[test]
    fn finish_on_watched_work_drops_only_the_bookkeeping() {
        let registry = Registry::new();
        let external: Deferred<i32> = Deferred::new();
        let id = registry.attach(&["a"], [WhenInput::from(external.clone())]);

        assert!(registry.finish(id));
        assert!(!registry.contains(id));
        // The external signal is untouched.
        assert_eq!(external.state(), SettleState::Pending);
    }

    #[test]
    fn dropping_the_registry_does_not_break_settlement() {
        let external: Deferred<i32> = Deferred::new();
        {
            let registry = Registry::new();
            registry.attach(&["a"], [WhenInput::from(external.clone())]);
        }
        // The prune hook's weak handle is dead; settling is still fine.
        external.resolve(args([1]));
        assert_eq!(external.state(), SettleState::Fulfilled);
    }
}
