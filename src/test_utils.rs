//! Test utilities.
//!
//! Shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - Callback recorders for asserting dispatch order and arguments
//!
//! # Example
//! ```
//! use quiesce::test_utils::init_test_logging;
//!
//! init_test_logging();
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use crate::types::Arg;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Records every invocation's argument list, for asserting both dispatch
/// count and payload shape.
pub struct Recorder<T> {
    log: Rc<RefCell<Vec<Vec<Arg<T>>>>>,
}

impl<T: Clone + 'static> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Recorder<T> {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Returns a callback that appends each invocation's arguments.
    #[must_use]
    pub fn callback(&self) -> impl FnMut(&[Arg<T>]) + 'static {
        let log = Rc::clone(&self.log);
        move |arguments| log.borrow_mut().push(arguments.to_vec())
    }

    /// Number of invocations recorded so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.log.borrow().len()
    }

    /// All recorded argument lists, in invocation order.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<Arg<T>>> {
        self.log.borrow().clone()
    }
}
