use super::socket::{audio_frames, WebSocketClient};
use super::state::AppState;
use crate::session::RelaySession;
use axum::{
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
};
use futures::stream::StreamExt;
use tracing::{info, warn};

/// GET any path with `Upgrade: websocket`
/// Relay one client connection to the recognizer
pub async fn relay_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.sessions.clone();
    ws.on_upgrade(move |socket| sessions.track_future(run_session(socket, state)))
}

async fn run_session(socket: WebSocket, state: AppState) {
    let (sender, receiver) = socket.split();

    let session = RelaySession::new(
        state.session_config.clone(),
        state.backend.clone(),
        state.credential.clone(),
    );

    // Server shutdown ends the audio stream as if the client had left
    let frames = audio_frames(receiver)
        .take_until(state.shutdown.clone().cancelled_owned())
        .boxed();

    let report = session.run(frames, WebSocketClient::new(sender)).await;

    match &report.failure {
        Some(reason) => warn!(
            "Session {} failed after {:.1}s: {}",
            report.session_id, report.duration_secs, reason
        ),
        None => info!(
            "Session {} closed after {:.1}s ({} frames, {} results)",
            report.session_id, report.duration_secs, report.frames_forwarded, report.results_forwarded
        ),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
