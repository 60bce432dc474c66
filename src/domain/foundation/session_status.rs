//! SessionStatus enum for tracking lifecycle of prefill sessions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a prefill session.
///
/// Expiry is a property of the clock, not a stored transition: a session
/// becomes Expired the moment its deadline passes and is reported as such
/// by stores at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Expired,
}

impl SessionStatus {
    /// Returns true if the session can be modified.
    pub fn is_mutable(&self) -> bool {
        matches!(self, SessionStatus::Active)
    }

    /// Validates a transition from this status to another.
    ///
    /// Valid transitions:
    /// - Active -> Expired
    pub fn can_transition_to(&self, target: &SessionStatus) -> bool {
        use SessionStatus::*;
        matches!((self, target), (Active, Expired))
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Active => "Active",
            SessionStatus::Expired => "Expired",
        };
        write!(f, "{}", s)
    }
}
