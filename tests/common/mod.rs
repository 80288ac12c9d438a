// Shared test doubles: a scripted recognizer and a recording client sink

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stt_relay::recognition::proto::{AlternativeUpdate, StreamingRequest, StreamingResponse};
use stt_relay::recognition::{BridgeError, RecognizerBackend, RequestStream, ResponseStream};
use stt_relay::session::{ClientGone, ClientSink, CloseReason, TranscriptMessage};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub const WAIT: Duration = Duration::from_secs(5);

/// Counts how many response streams have been dropped
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// One recognition call as seen by the recognizer
pub struct ScriptedCall {
    pub credential: String,
    requests: mpsc::UnboundedReceiver<StreamingRequest>,
    responses: Option<mpsc::UnboundedSender<Result<StreamingResponse, tonic::Status>>>,
    released: Arc<AtomicUsize>,
}

impl ScriptedCall {
    /// Next request the bridge sent; errors if the request stream ended
    pub async fn next_request(&mut self) -> Result<StreamingRequest> {
        tokio::time::timeout(WAIT, self.requests.recv())
            .await
            .map_err(|_| anyhow!("timed out waiting for a request"))?
            .ok_or_else(|| anyhow!("request stream ended"))
    }

    /// Next audio chunk payload
    pub async fn next_chunk(&mut self) -> Result<Vec<u8>> {
        match self.next_request().await?.event {
            Some(stt_relay::recognition::proto::streaming_request::Event::Chunk(chunk)) => Ok(chunk.data),
            other => Err(anyhow!("expected audio chunk, got {:?}", other)),
        }
    }

    /// Wait for the bridge to stop sending
    pub async fn expect_half_close(&mut self) -> Result<()> {
        match tokio::time::timeout(WAIT, self.requests.recv()).await {
            Ok(None) => Ok(()),
            Ok(Some(request)) => Err(anyhow!("expected half-close, got {:?}", request)),
            Err(_) => Err(anyhow!("timed out waiting for half-close")),
        }
    }

    pub fn respond(&self, response: StreamingResponse) {
        if let Some(responses) = &self.responses {
            let _ = responses.send(Ok(response));
        }
    }

    pub fn partial(&self, text: &str) {
        self.respond(StreamingResponse::partial(AlternativeUpdate::with_texts([text])));
    }

    pub fn final_text(&self, text: &str) {
        self.respond(StreamingResponse::final_result(AlternativeUpdate::with_texts([text])));
    }

    pub fn fail(&self, status: tonic::Status) {
        if let Some(responses) = &self.responses {
            let _ = responses.send(Err(status));
        }
    }

    /// Recognizer completes the call normally
    pub fn end_stream(&mut self) {
        self.responses.take();
    }

    /// How many times the response stream has been released
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub async fn wait_released(&self) -> Result<()> {
        wait_until(|| self.released() > 0).await
    }
}

/// Hands out `ScriptedCall`s as the relay opens them
pub struct CallQueue {
    calls: mpsc::UnboundedReceiver<ScriptedCall>,
}

impl CallQueue {
    pub async fn next_call(&mut self) -> Result<ScriptedCall> {
        tokio::time::timeout(WAIT, self.calls.recv())
            .await
            .map_err(|_| anyhow!("timed out waiting for a recognition call"))?
            .ok_or_else(|| anyhow!("recognizer dropped"))
    }
}

/// In-process recognizer driven by the test through `ScriptedCall`
pub struct ScriptedRecognizer {
    calls: mpsc::UnboundedSender<ScriptedCall>,
    rejection: Option<String>,
    started: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new() -> (Arc<Self>, CallQueue) {
        Self::build(None)
    }

    /// Every call is refused with `reason`
    pub fn rejecting(reason: &str) -> (Arc<Self>, CallQueue) {
        Self::build(Some(reason.to_string()))
    }

    fn build(rejection: Option<String>) -> (Arc<Self>, CallQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        let recognizer = Arc::new(Self {
            calls: tx,
            rejection,
            started: AtomicUsize::new(0),
        });
        (recognizer, CallQueue { calls: rx })
    }

    pub fn calls_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecognizerBackend for ScriptedRecognizer {
    async fn start(&self, mut requests: RequestStream, credential: &str) -> Result<ResponseStream, BridgeError> {
        self.started.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = &self.rejection {
            return Err(BridgeError::Connection(reason.clone()));
        }

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(request) = requests.next().await {
                if request_tx.send(request).is_err() {
                    break;
                }
            }
        });

        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let released = Arc::new(AtomicUsize::new(0));
        let guard = ReleaseGuard(released.clone());

        let call = ScriptedCall {
            credential: credential.to_string(),
            requests: request_rx,
            responses: Some(response_tx),
            released,
        };
        let _ = self.calls.send(call);

        Ok(UnboundedReceiverStream::new(response_rx)
            .map(move |response| {
                let _held = &guard;
                response
            })
            .boxed())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct Collected {
    messages: Vec<TranscriptMessage>,
    closes: Vec<CloseReason>,
    gone: bool,
}

/// Client sink that records everything the session sends it
#[derive(Clone, Default)]
pub struct CollectingClient {
    inner: Arc<Mutex<Collected>>,
}

impl CollectingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the client vanishing: every later send fails
    pub fn disconnect(&self) {
        self.inner.lock().unwrap().gone = true;
    }

    pub fn messages(&self) -> Vec<TranscriptMessage> {
        self.inner.lock().unwrap().messages.clone()
    }

    pub fn closes(&self) -> Vec<CloseReason> {
        self.inner.lock().unwrap().closes.clone()
    }

    pub async fn wait_for_messages(&self, count: usize) -> Result<Vec<TranscriptMessage>> {
        wait_until(|| self.messages().len() >= count).await?;
        Ok(self.messages())
    }
}

#[async_trait::async_trait]
impl ClientSink for CollectingClient {
    async fn send(&mut self, message: TranscriptMessage) -> Result<(), ClientGone> {
        let mut inner = self.inner.lock().unwrap();
        if inner.gone {
            return Err(ClientGone("connection reset".to_string()));
        }
        inner.messages.push(message);
        Ok(())
    }

    async fn close(&mut self, reason: CloseReason) {
        self.inner.lock().unwrap().closes.push(reason);
    }
}

/// Poll `condition` until it holds or `WAIT` elapses
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> Result<()> {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            return Err(anyhow!("condition not reached within {:?}", WAIT));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}
