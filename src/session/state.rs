use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a relay session
///
/// ```text
/// Connecting ──▶ Streaming ──▶ Draining ──▶ Closed
///      │             │             │
///      └─────────────┴─────────────┴──▶ Failed
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Opening the upstream recognition stream
    #[default]
    Connecting,
    /// Both forwarding loops running
    Streaming,
    /// One side finished normally; the other is winding down
    Draining,
    /// Finished cleanly
    Closed,
    /// Finished with an error
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            (Connecting, Streaming) | (Streaming, Draining) | (Draining, Closed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
