use crate::recognition::{RecognitionResult, ResultKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transcript message sent to the client as a JSON text frame
///
/// Serializes as `{"type":"partial","text":"..."}` or
/// `{"type":"final","text":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TranscriptMessage {
    Partial { text: String },
    Final { text: String },
}

impl TranscriptMessage {
    pub fn text(&self) -> &str {
        match self {
            TranscriptMessage::Partial { text } | TranscriptMessage::Final { text } => text,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, TranscriptMessage::Partial { .. })
    }
}

impl From<RecognitionResult> for TranscriptMessage {
    fn from(result: RecognitionResult) -> Self {
        match result.kind {
            ResultKind::Partial => TranscriptMessage::Partial { text: result.text },
            ResultKind::Final => TranscriptMessage::Final { text: result.text },
        }
    }
}

/// How the relay ends a client connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Session finished cleanly
    Normal,
    /// Session failed; the text is a short description
    Error(String),
}

/// The client connection can no longer be written to
#[derive(Debug, Error)]
#[error("client connection closed: {0}")]
pub struct ClientGone(pub String);

/// Write half of a client connection
#[async_trait::async_trait]
pub trait ClientSink: Send {
    /// Deliver one transcript message
    async fn send(&mut self, message: TranscriptMessage) -> Result<(), ClientGone>;

    /// Close the connection; safe to call on an already-closed connection
    async fn close(&mut self, reason: CloseReason);
}
