use super::state::SessionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of a finished relay session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,

    /// When the client connected
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Every state the session entered, in order, starting with `Connecting`
    pub transitions: Vec<SessionState>,

    /// Audio frames handed to the recognizer
    pub frames_forwarded: usize,

    /// Zero-length frames dropped before the recognizer
    pub empty_frames_dropped: usize,

    /// Transcript messages delivered to the client
    pub results_forwarded: usize,

    /// Why the session failed, if it did
    pub failure: Option<String>,
}

impl SessionReport {
    pub fn final_state(&self) -> SessionState {
        self.transitions.last().copied().unwrap_or_default()
    }

    pub fn reached(&self, state: SessionState) -> bool {
        self.transitions.contains(&state)
    }
}
