//! Grouped completion tracking E2E suite.
//!
//! Validates the registry contract across producers and consumers:
//! - **Snapshot semantics**: a quiescence query watches exactly the tasks
//!   live at call time
//! - **Deduplication**: a task shared between requested owners counts once
//! - **Pruning**: settlement removes the record and every index entry, with
//!   no empty residue
//! - **Immediate quiescence**: idle owners resolve with no observable
//!   pending period

use quiesce::test_utils::{init_test_logging, Recorder};
use quiesce::{args, Arg, Deferred, SettleState, TaskRegistry, WhenInput};

type Registry = TaskRegistry<&'static str, i32>;

#[test]
fn aggregate_waits_for_work_live_at_query_time() {
    init_test_logging();
    let registry = Registry::new();
    let (_, task) = registry.attach_pending(&["a", "b"]);

    let aggregate = registry.quiescence(&["a"]);
    assert_eq!(aggregate.state(), SettleState::Pending);

    // A task attached to "b" after the query is not part of this aggregate.
    let (_, later) = registry.attach_pending(&["b"]);

    task.resolve(args([1]));
    assert_eq!(aggregate.state(), SettleState::Fulfilled);
    assert_eq!(later.state(), SettleState::Pending);
    later.resolve(Vec::new());
}

#[test]
fn aggregate_resolves_with_the_requested_owners() {
    init_test_logging();
    let registry = Registry::new();
    let (_, task) = registry.attach_pending(&["a"]);

    let aggregate = registry.quiescence(&["a"]);
    let seen = Recorder::new();
    aggregate.done(seen.callback());

    task.resolve(Vec::new());
    assert_eq!(seen.calls(), vec![vec![Arg::list(["a"])]]);
}

#[test]
fn idle_owners_resolve_without_an_observable_pending_period() {
    init_test_logging();
    let registry = Registry::new();
    let aggregate = registry.quiescence(&["a"]);

    // A callback registered synchronously right after the call must replay.
    let seen = Recorder::new();
    aggregate.done(seen.callback());
    assert_eq!(seen.calls(), vec![vec![Arg::list(["a"])]]);
}

#[test]
fn shared_task_counts_once_across_requested_owners() {
    init_test_logging();
    let registry = Registry::new();
    let (_, shared) = registry.attach_pending(&["a", "b"]);

    let aggregate = registry.quiescence(&["a", "b"]);
    shared.resolve(Vec::new());
    assert_eq!(aggregate.state(), SettleState::Fulfilled);
}

#[test]
fn any_failing_task_rejects_the_aggregate_with_the_owners() {
    init_test_logging();
    let registry = Registry::new();
    let (_, good) = registry.attach_pending(&["a"]);
    let (_, bad) = registry.attach_pending(&["b"]);

    let aggregate = registry.quiescence(&["a", "b"]);
    let failures = Recorder::new();
    aggregate.fail(failures.callback());

    bad.reject(args([0]));
    assert_eq!(failures.calls(), vec![vec![Arg::list(["a", "b"])]]);

    good.resolve(Vec::new());
    assert_eq!(aggregate.state(), SettleState::Rejected);
    assert_eq!(failures.count(), 1);
}

#[test]
fn attached_work_collapses_through_the_aggregate_combinator() {
    init_test_logging();
    let registry = Registry::new();
    let part1: Deferred<i32> = Deferred::new();
    let part2: Deferred<i32> = Deferred::new();

    let id = registry.attach(
        &["a"],
        [WhenInput::from(part1.clone()), WhenInput::from(part2.clone())],
    );

    let aggregate = registry.quiescence(&["a"]);
    part1.resolve(args([1]));
    assert_eq!(aggregate.state(), SettleState::Pending);
    assert!(registry.contains(id));

    part2.resolve(args([2]));
    assert_eq!(aggregate.state(), SettleState::Fulfilled);
    assert!(!registry.contains(id));
}

#[test]
fn failure_prunes_bookkeeping_like_success() {
    init_test_logging();
    let registry = Registry::new();
    let (id, task) = registry.attach_pending(&["a", "b"]);

    task.reject(args([0]));
    assert!(!registry.contains(id));
    assert!(registry.tasks_for(&"a").is_empty());
    assert!(registry.tasks_for(&"b").is_empty());
    assert!(registry.is_idle());
}

#[test]
fn independent_producers_one_consumer() {
    init_test_logging();
    let registry = Registry::new();

    // Three producers that know nothing about each other.
    let (_, upload) = registry.attach_pending(&["doc"]);
    let (_, render) = registry.attach_pending(&["doc", "screen"]);
    let (_, audit) = registry.attach_pending(&["screen"]);

    let doc_idle = registry.quiescence(&["doc"]);
    let all_idle = registry.quiescence(&["doc", "screen"]);

    upload.resolve(Vec::new());
    assert_eq!(doc_idle.state(), SettleState::Pending);

    render.resolve(Vec::new());
    assert_eq!(doc_idle.state(), SettleState::Fulfilled);
    assert_eq!(all_idle.state(), SettleState::Pending);

    audit.resolve(Vec::new());
    assert_eq!(all_idle.state(), SettleState::Fulfilled);
    assert!(registry.is_idle());
}

#[test]
fn reentrant_queries_from_completion_callbacks() {
    init_test_logging();
    let registry = Registry::new();
    let (_, task) = registry.attach_pending(&["a"]);

    let aggregate = registry.quiescence(&["a"]);
    let follow_up = Recorder::new();
    {
        let registry = registry.clone();
        let follow_up = follow_up.callback();
        let mut follow_up = Some(follow_up);
        aggregate.done(move |_| {
            // Query again from inside the aggregate's own callback: the
            // registry has already pruned, so this resolves immediately.
            let inner = registry.quiescence(&["a"]);
            if let Some(cb) = follow_up.take() {
                inner.done(cb);
            }
        });
    }

    task.resolve(Vec::new());
    assert_eq!(follow_up.calls(), vec![vec![Arg::list(["a"])]]);
}

#[test]
fn finish_and_abort_by_id() {
    init_test_logging();
    let registry = Registry::new();
    let (id_ok, ok) = registry.attach_pending(&["a"]);
    let (id_bad, bad) = registry.attach_pending(&["a"]);

    assert!(registry.finish(id_ok));
    assert_eq!(ok.state(), SettleState::Fulfilled);

    assert!(registry.abort(id_bad));
    assert_eq!(bad.state(), SettleState::Rejected);

    assert!(registry.is_idle());
    assert!(!registry.finish(id_ok));
    assert!(!registry.abort(id_bad));
}
