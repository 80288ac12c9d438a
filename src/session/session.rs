use super::client::{ClientGone, ClientSink, CloseReason, TranscriptMessage};
use super::config::SessionConfig;
use super::state::SessionState;
use super::stats::SessionReport;
use crate::audio::AudioFrame;
use crate::recognition::{BridgeError, Received, RecognizerBackend, UpstreamBridge};
use chrono::Utc;
use futures::stream::{Stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Relays one client connection to one recognition stream
///
/// The session opens an `UpstreamBridge`, then runs two loops side by side:
/// client audio → recognizer, and recognizer results → client. Whichever
/// loop ends first decides how the session ends; the bridge is closed on
/// every exit path before `run` returns.
pub struct RelaySession {
    id: String,
    config: Arc<SessionConfig>,
    backend: Arc<dyn RecognizerBackend>,
    credential: Arc<str>,
    started_at: chrono::DateTime<Utc>,
    transitions: Vec<SessionState>,
    failure: Option<String>,
}

/// Progress counters shared by the two forwarding loops
#[derive(Default)]
struct Counters {
    frames_forwarded: AtomicUsize,
    empty_frames_dropped: AtomicUsize,
    results_forwarded: AtomicUsize,
}

/// Why the client → recognizer loop stopped
enum InboundEnd {
    ClientClosed,
    SendFailed(BridgeError),
}

/// Why the recognizer → client loop stopped
enum OutboundEnd {
    BackendFinished,
    ClientGone(ClientGone),
    BackendFailed(BridgeError),
}

impl RelaySession {
    pub fn new(
        config: Arc<SessionConfig>,
        backend: Arc<dyn RecognizerBackend>,
        credential: Arc<str>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            backend,
            credential,
            started_at: Utc::now(),
            transitions: vec![SessionState::Connecting],
            failure: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.transitions.last().copied().unwrap_or_default()
    }

    /// Relay until either side finishes, then tear everything down
    pub async fn run<I, C>(mut self, frames: I, mut client: C) -> SessionReport
    where
        I: Stream<Item = AudioFrame> + Send + Unpin,
        C: ClientSink,
    {
        info!("Client connected, starting session {}", self.id);

        let bridge = match UpstreamBridge::open(self.backend.as_ref(), &self.config, &self.credential).await {
            Ok(bridge) => bridge,
            Err(e) => {
                error!("Session {}: failed to open recognition stream: {}", self.id, e);
                self.fail(e.to_string());
                client.close(CloseReason::Error(e.to_string())).await;
                return self.into_report(&Counters::default());
            }
        };

        self.transition(SessionState::Streaming);

        let counters = Counters::default();
        let failure = self.relay(&bridge, frames, &mut client, &counters).await;

        bridge.close().await;

        match failure {
            Some(reason) => {
                self.fail(reason.clone());
                client.close(CloseReason::Error(reason)).await;
            }
            None => {
                self.transition(SessionState::Closed);
                client.close(CloseReason::Normal).await;
            }
        }

        info!(
            "Session {} finished: {} frames in, {} results out",
            self.id,
            counters.frames_forwarded.load(Ordering::SeqCst),
            counters.results_forwarded.load(Ordering::SeqCst)
        );

        self.into_report(&counters)
    }

    /// Run both forwarding loops; returns a failure description, if any
    async fn relay<I, C>(
        &mut self,
        bridge: &UpstreamBridge,
        frames: I,
        client: &mut C,
        counters: &Counters,
    ) -> Option<String>
    where
        I: Stream<Item = AudioFrame> + Send + Unpin,
        C: ClientSink,
    {
        let bytes_per_second = self.config.bytes_per_second();
        let inbound = forward_inbound(bridge, frames, counters, bytes_per_second);
        let outbound = forward_outbound(bridge, client, counters);
        tokio::pin!(inbound, outbound);

        tokio::select! {
            end = &mut inbound => match end {
                InboundEnd::ClientClosed => {
                    info!("Session {}: client disconnected", self.id);
                    self.transition(SessionState::Draining);
                    bridge.finish().await;
                    bridge.close().await;

                    // Lets a result already being written reach the client
                    match outbound.await {
                        OutboundEnd::BackendFailed(e) => Some(e.to_string()),
                        OutboundEnd::BackendFinished | OutboundEnd::ClientGone(_) => None,
                    }
                }
                InboundEnd::SendFailed(e) => {
                    warn!("Session {}: failed to forward audio: {}", self.id, e);
                    Some(e.to_string())
                }
            },
            end = &mut outbound => match end {
                OutboundEnd::BackendFinished => {
                    info!("Session {}: recognizer finished the stream", self.id);
                    self.transition(SessionState::Draining);
                    None
                }
                OutboundEnd::ClientGone(gone) => {
                    info!("Session {}: {}", self.id, gone);
                    self.transition(SessionState::Draining);
                    bridge.finish().await;
                    None
                }
                OutboundEnd::BackendFailed(e) => {
                    error!("Session {}: {}", self.id, e);
                    Some(e.to_string())
                }
            },
        }
    }

    fn transition(&mut self, next: SessionState) {
        let current = self.state();
        if !current.can_transition_to(next) {
            warn!(session_id = %self.id, from = %current, to = %next, "ignoring invalid session transition");
            return;
        }

        self.transitions.push(next);
        info!(session_id = %self.id, from = %current, to = %next, "session state changed");
    }

    fn fail(&mut self, reason: String) {
        self.failure = Some(reason);
        self.transition(SessionState::Failed);
    }

    fn into_report(self, counters: &Counters) -> SessionReport {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionReport {
            session_id: self.id,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            transitions: self.transitions,
            frames_forwarded: counters.frames_forwarded.load(Ordering::SeqCst),
            empty_frames_dropped: counters.empty_frames_dropped.load(Ordering::SeqCst),
            results_forwarded: counters.results_forwarded.load(Ordering::SeqCst),
            failure: self.failure,
        }
    }
}

/// Client audio → recognizer, in arrival order
async fn forward_inbound<I>(
    bridge: &UpstreamBridge,
    mut frames: I,
    counters: &Counters,
    bytes_per_second: u32,
) -> InboundEnd
where
    I: Stream<Item = AudioFrame> + Unpin,
{
    while let Some(frame) = frames.next().await {
        if frame.is_empty() {
            debug!("Received empty audio frame");
            counters.empty_frames_dropped.fetch_add(1, Ordering::SeqCst);
            continue;
        }

        debug!(
            "Forwarding {} bytes ({} ms) of audio",
            frame.len(),
            frame.duration(bytes_per_second).as_millis()
        );

        if let Err(e) = bridge.send(frame).await {
            return InboundEnd::SendFailed(e);
        }
        counters.frames_forwarded.fetch_add(1, Ordering::SeqCst);
    }

    InboundEnd::ClientClosed
}

/// Recognizer results → client, in recognizer order
async fn forward_outbound<C>(bridge: &UpstreamBridge, client: &mut C, counters: &Counters) -> OutboundEnd
where
    C: ClientSink,
{
    loop {
        let result = match bridge.receive().await {
            Ok(Received::Result(result)) => result,
            Ok(Received::EndOfStream) => return OutboundEnd::BackendFinished,
            Err(e) => return OutboundEnd::BackendFailed(e),
        };

        let message = TranscriptMessage::from(result);
        debug!("Sending {} result: {}", if message.is_partial() { "partial" } else { "final" }, message.text());

        if let Err(gone) = client.send(message).await {
            return OutboundEnd::ClientGone(gone);
        }
        counters.results_forwarded.fetch_add(1, Ordering::SeqCst);
    }
}
