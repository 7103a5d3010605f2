//! Core types: identifiers, the argument model, and the settle state machine.

pub mod arg;
pub mod id;
pub mod state;

pub use arg::{args, Arg};
pub use id::TaskId;
pub use state::SettleState;
