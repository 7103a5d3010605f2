//! Quiesce: single-threaded deferred completion primitives with grouped
//! completion tracking.
//!
//! # Overview
//!
//! Quiesce provides a settle-once future ([`Deferred`] / [`Promise`]) built
//! on a single-fire callback list ([`signal::Broadcaster`]), combinators for
//! aggregating many completion signals into one ([`combinator::when`],
//! [`Promise::chain`]), and a bookkeeping layer ([`registry::TaskRegistry`])
//! that attributes outstanding work to a dynamic set of owners and answers
//! "when has everything currently pending against these owners finished?".
//!
//! # Core Guarantees
//!
//! - **Settle once**: a deferred settles exactly once; the first settlement
//!   permanently cancels the opposite path, and later attempts are no-ops
//! - **Ordered, synchronous dispatch**: callbacks run in registration order
//!   on the caller's stack, with no scheduling delay
//! - **Replay on late subscribe**: callbacks registered after settlement run
//!   immediately with the stored result
//! - **Reentrancy safe**: firing, settling, and registering from within a
//!   running callback never corrupts the callback queue
//! - **No index residue**: a pruned task leaves no empty owner-index entries
//!
//! # Module Structure
//!
//! - [`types`]: Identifier newtypes, the argument model, the settle FSM
//! - [`signal`]: The single-fire broadcaster primitive
//! - [`deferred`]: Deferred and its read-only Promise view
//! - [`combinator`]: The `when` aggregate combinator
//! - [`registry`]: Owner-attributed task tracking and group quiescence
//!
//! # Threading Model
//!
//! The crate is single-threaded by design: state lives behind `Rc<RefCell>`
//! and callbacks dispatch synchronously on the caller's stack. Nothing here
//! implements `Send`; "suspension" only means a callback is stored until
//! whichever party eventually settles the signal.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod combinator;
pub mod deferred;
pub mod registry;
pub mod signal;
pub mod test_utils;
pub mod types;

pub use combinator::{when, WhenInput};
pub use deferred::{Chained, Deferred, Promise};
pub use registry::TaskRegistry;
pub use signal::Broadcaster;
pub use types::{args, Arg, SettleState, TaskId};
