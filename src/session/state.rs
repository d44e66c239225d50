use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one realtime connection.
///
/// Owned exclusively by the session; everything else reacts to transitions.
/// `Closed` is terminal for a run, but a fresh start is permitted from it.
/// `Error` keeps the failure visible until the caller acknowledges it with a
/// stop; resources are already released by the time it is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Closing,
    Closed,
    Error,
}

impl SessionState {
    /// A start request is honored only from here; anywhere else it is a no-op.
    pub fn can_start(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Closed)
    }

    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
            SessionState::Error => "error",
        };
        write!(f, "{}", name)
    }
}
