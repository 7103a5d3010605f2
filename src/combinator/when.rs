//! The `when` aggregate combinator.
//!
//! # Contract
//!
//! - Zero inputs: an already-resolved promise with no arguments.
//! - One plain value: an already-resolved promise carrying that value.
//! - One observable: *that input's own promise*; no wrapper is interposed,
//!   so nothing about its settlement changes.
//! - Several inputs: a new promise that succeeds once every observable input
//!   succeeded, with an argument list positionally mirroring the inputs, and
//!   fails the moment any observable input fails, forwarding that failure's
//!   arguments. First failure wins; later settlements of other inputs are
//!   ignored because the aggregate settles only once.
//!
//! # Counting
//!
//! The aggregate counter starts at 1 rather than 0. The bias is released
//! only after every input has been scanned, so an input that replays its
//! settlement synchronously during subscription cannot fire the aggregate
//! mid-scan.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::deferred::{Deferred, Promise};
use crate::types::Arg;

/// One input to [`when`]: a plain value passed through positionally, or an
/// observable whose settlement the aggregate tracks.
///
/// The explicit tag replaces runtime capability sniffing: a caller states
/// which inputs are observable, and the type system keeps everything else a
/// plain value.
pub enum WhenInput<T> {
    /// A non-observable input, passed through at its position unchanged.
    Value(Arg<T>),
    /// An observable input; the aggregate subscribes to its settlement.
    Observable(Promise<T>),
}

impl<T> WhenInput<T> {
    /// Wraps a plain value.
    #[must_use]
    pub const fn value(value: T) -> Self {
        Self::Value(Arg::Value(value))
    }
}

impl<T> From<Arg<T>> for WhenInput<T> {
    fn from(value: Arg<T>) -> Self {
        Self::Value(value)
    }
}

impl<T> From<Promise<T>> for WhenInput<T> {
    fn from(promise: Promise<T>) -> Self {
        Self::Observable(promise)
    }
}

impl<T: Clone + 'static> From<Deferred<T>> for WhenInput<T> {
    fn from(deferred: Deferred<T>) -> Self {
        Self::Observable(deferred.promise())
    }
}

/// Aggregates the inputs into one promise per the contract above.
///
/// The resolved argument list preserves input order regardless of the order
/// in which observables settle. An observable that resolved with exactly one
/// argument contributes it directly; with any other count it contributes an
/// [`Arg::List`] at its position.
pub fn when<T, I>(inputs: I) -> Promise<T>
where
    T: Clone + 'static,
    I: IntoIterator<Item = WhenInput<T>>,
{
    let inputs: Vec<WhenInput<T>> = inputs.into_iter().collect();

    if inputs.len() <= 1 {
        return match inputs.into_iter().next() {
            None => settled(Vec::new()),
            Some(WhenInput::Value(value)) => settled(vec![value]),
            Some(WhenInput::Observable(promise)) => promise,
        };
    }

    let total = inputs.len();
    tracing::debug!(inputs = total, "building aggregate");
    let aggregate: Deferred<T> = Deferred::new();
    let slots: Rc<RefCell<Vec<Option<Arg<T>>>>> =
        Rc::new(RefCell::new((0..total).map(|_| None).collect()));
    // Bias of 1, released after the scan below.
    let remaining = Rc::new(Cell::new(1_usize));

    for (index, input) in inputs.into_iter().enumerate() {
        match input {
            WhenInput::Value(value) => {
                slots.borrow_mut()[index] = Some(value);
            }
            WhenInput::Observable(promise) => {
                remaining.set(remaining.get() + 1);

                let slots_done = Rc::clone(&slots);
                let remaining_done = Rc::clone(&remaining);
                let resolve = aggregate.clone();
                promise.done(move |arguments| {
                    slots_done.borrow_mut()[index] = Some(contribution(arguments));
                    let left = remaining_done.get() - 1;
                    remaining_done.set(left);
                    if left == 0 {
                        resolve.resolve(collect(&slots_done));
                    }
                });

                let reject = aggregate.clone();
                promise.fail(move |arguments| {
                    reject.reject(arguments.to_vec());
                });
            }
        }
    }

    let left = remaining.get() - 1;
    remaining.set(left);
    if left == 0 {
        aggregate.resolve(collect(&slots));
    }
    aggregate.promise()
}

/// Maps one observable's resolved arguments onto its aggregate position.
fn contribution<T: Clone>(arguments: &[Arg<T>]) -> Arg<T> {
    if arguments.len() == 1 {
        arguments[0].clone()
    } else {
        Arg::List(arguments.to_vec())
    }
}

fn collect<T: Clone>(slots: &Rc<RefCell<Vec<Option<Arg<T>>>>>) -> Vec<Arg<T>> {
    slots
        .borrow()
        .iter()
        .map(|slot| slot.clone().unwrap_or_else(|| Arg::List(Vec::new())))
        .collect()
}

fn settled<T: Clone + 'static>(arguments: Vec<Arg<T>>) -> Promise<T> {
    let deferred = Deferred::new();
    deferred.resolve(arguments);
    deferred.promise()
}
