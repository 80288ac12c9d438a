//! Upstream recognition stream owned by one relay session
//!
//! The bridge has two halves that are used concurrently:
//! - outbound: `send` audio chunks, then `finish` to half-close
//! - inbound: `receive` classified results until end of stream
//!
//! `close` releases the call from either side, any number of times.

use super::backend::{RecognizerBackend, ResponseStream};
use super::classifier::{classify, RecognitionResult};
use super::error::BridgeError;
use super::proto::StreamingRequest;
use crate::audio::AudioFrame;
use crate::session::SessionConfig;
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Requests queued ahead of the transport before `send` waits
const OUTBOUND_QUEUE_DEPTH: usize = 32;

/// Outcome of a successful `receive`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Result(RecognitionResult),
    /// The recognizer finished the call, or the bridge was closed
    EndOfStream,
}

pub struct UpstreamBridge {
    /// Request sender; `None` once half-closed
    outbound: Mutex<Option<mpsc::Sender<StreamingRequest>>>,

    /// Response stream; `None` once drained or released
    inbound: Mutex<Option<ResponseStream>>,

    /// Wakes pending `send`/`receive` calls on close
    shutdown: CancellationToken,

    closed: AtomicBool,
}

impl UpstreamBridge {
    /// Start a recognition call whose first message is `config`
    pub async fn open(
        backend: &dyn RecognizerBackend,
        config: &SessionConfig,
        credential: &str,
    ) -> Result<Self, BridgeError> {
        if credential.trim().is_empty() {
            return Err(BridgeError::MissingCredential);
        }

        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);

        // Queued before the call starts, so nothing can precede it
        tx.send(StreamingRequest::session_options(config.to_streaming_options()))
            .await
            .map_err(|_| BridgeError::StreamClosed)?;

        let responses = backend.start(ReceiverStream::new(rx), credential).await?;

        info!("Opened recognition stream via {}", backend.name());

        Ok(Self {
            outbound: Mutex::new(Some(tx)),
            inbound: Mutex::new(Some(responses)),
            shutdown: CancellationToken::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Queue one audio chunk, waiting while the transport applies backpressure
    pub async fn send(&self, frame: AudioFrame) -> Result<(), BridgeError> {
        let sender = self
            .outbound
            .lock()
            .await
            .clone()
            .ok_or(BridgeError::StreamClosed)?;

        let request = StreamingRequest::chunk(frame.into_bytes());

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(BridgeError::StreamClosed),
            sent = sender.send(request) => sent.map_err(|_| BridgeError::StreamClosed),
        }
    }

    /// Half-close: no more audio will be sent, results keep flowing
    pub async fn finish(&self) {
        if self.outbound.lock().await.take().is_some() {
            debug!("Recognition stream half-closed");
        }
    }

    /// Wait for the next classified result
    pub async fn receive(&self) -> Result<Received, BridgeError> {
        let mut inbound = self.inbound.lock().await;

        loop {
            let Some(responses) = inbound.as_mut() else {
                return Ok(Received::EndOfStream);
            };

            // None: closed while waiting
            let polled = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => None,
                next = responses.next() => Some(next),
            };

            match polled {
                Some(Some(Ok(response))) => match classify(&response) {
                    Some(result) => return Ok(Received::Result(result)),
                    None => debug!("Skipping recognizer response without transcript"),
                },
                Some(Some(Err(status))) => {
                    inbound.take();
                    // A failed call accepts no more audio
                    self.outbound.lock().await.take();
                    return Err(BridgeError::from(status));
                }
                Some(None) | None => {
                    inbound.take();
                    return Ok(Received::EndOfStream);
                }
            }
        }
    }

    /// Release the call; only the first invocation has any effect
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shutdown.cancel();
        self.outbound.lock().await.take();

        // A receive in progress holds the lock and drops the stream itself
        if let Ok(mut inbound) = self.inbound.try_lock() {
            inbound.take();
        }

        info!("Recognition stream closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
