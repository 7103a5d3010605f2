//! Combinators for composing completion signals.
//!
//! The core combinator is [`when`], which collapses any number of inputs
//! (plain values or observables) into one aggregate promise. Derivation
//! combinators (`chain`, `always`, `invert`) live on
//! [`Promise`](crate::deferred::Promise) itself.

mod when;

pub use when::{when, WhenInput};
