use thiserror::Error;

/// Errors raised by an upstream recognition stream
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No API key was configured for the session
    #[error("recognizer credential is missing")]
    MissingCredential,

    /// The transport or the call could not be established
    #[error("failed to connect to recognizer: {0}")]
    Connection(String),

    /// Audio was sent after the outbound half was closed
    #[error("outbound audio stream is closed")]
    StreamClosed,

    /// The recognizer failed the call
    #[error("recognizer error ({code:?}): {message}")]
    Backend { code: tonic::Code, message: String },
}

impl BridgeError {
    /// Connection failure reported by the recognizer as a call status
    pub fn rejected(status: &tonic::Status) -> Self {
        BridgeError::Connection(format!("{:?}: {}", status.code(), status.message()))
    }
}

impl From<tonic::Status> for BridgeError {
    fn from(status: tonic::Status) -> Self {
        BridgeError::Backend {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

impl From<tonic::transport::Error> for BridgeError {
    fn from(err: tonic::transport::Error) -> Self {
        BridgeError::Connection(err.to_string())
    }
}
