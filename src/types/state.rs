//! The settle state machine.
//!
//! A deferred moves through exactly one of two legal transitions:
//! `Pending -> Fulfilled` or `Pending -> Rejected`. Both terminal states are
//! absorbing; there is no path back to `Pending` and no path between the
//! terminal states.

use core::fmt;

/// Observation state of a [`Deferred`](crate::deferred::Deferred) or
/// [`Promise`](crate::deferred::Promise).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettleState {
    /// Neither path has fired yet.
    Pending,
    /// The success path fired.
    Fulfilled,
    /// The failure path fired.
    Rejected,
}

impl SettleState {
    /// Returns true if neither path has fired.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if either path has fired.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !self.is_pending()
    }
}

impl fmt::Display for SettleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_not_settled() {
        assert!(SettleState::Pending.is_pending());
        assert!(!SettleState::Pending.is_settled());
    }

    #[test]
    fn terminal_states_are_settled() {
        assert!(SettleState::Fulfilled.is_settled());
        assert!(SettleState::Rejected.is_settled());
    }

    #[test]
    fn display_names() {
        assert_eq!(SettleState::Pending.to_string(), "pending");
        assert_eq!(SettleState::Fulfilled.to_string(), "fulfilled");
        assert_eq!(SettleState::Rejected.to_string(), "rejected");
    }
}
