//! Relay session management
//!
//! This module provides the `RelaySession` abstraction that manages:
//! - Opening the upstream recognition stream with the session configuration
//! - Forwarding client audio frames to the recognizer
//! - Forwarding partial/final transcripts back to the client
//! - Session state transitions and teardown of both connections

mod client;
mod config;
mod session;
mod state;
mod stats;

pub use client::{ClientGone, ClientSink, CloseReason, TranscriptMessage};
pub use config::{AudioEncoding, ProcessingMode, SessionConfig, CHANNEL_COUNT, LANGUAGE_WHITELIST, SAMPLE_RATE_HZ};
pub use session::RelaySession;
pub use state::SessionState;
pub use stats::SessionReport;
