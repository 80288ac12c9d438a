use crate::recognition::RecognizerBackend;
use crate::session::SessionConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// State handed to every connection
///
/// Sessions share nothing mutable; each one gets its own recognition stream.
#[derive(Clone)]
pub struct AppState {
    /// Recognition parameters sent at the start of every stream
    pub session_config: Arc<SessionConfig>,

    /// Where recognition streams are opened
    pub backend: Arc<dyn RecognizerBackend>,

    /// API key attached to every recognition stream
    pub credential: Arc<str>,

    /// Cancelled when the server starts shutting down
    pub shutdown: CancellationToken,

    /// Running relay sessions, drained on shutdown
    pub sessions: TaskTracker,
}

impl AppState {
    pub fn new(
        session_config: SessionConfig,
        backend: Arc<dyn RecognizerBackend>,
        credential: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            session_config: Arc::new(session_config),
            backend,
            credential: credential.into(),
            shutdown: CancellationToken::new(),
            sessions: TaskTracker::new(),
        }
    }
}
