//! Adapters between an axum WebSocket and a relay session

use crate::audio::AudioFrame;
use crate::session::{ClientGone, ClientSink, CloseReason, TranscriptMessage};
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::future;
use futures::stream::{BoxStream, SplitSink, SplitStream, StreamExt};
use futures::SinkExt;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Close frame reasons must fit in a control frame
const MAX_CLOSE_REASON_BYTES: usize = 123;

/// Binary frames from the client as audio, ending at close or on error
pub fn audio_frames(receiver: SplitStream<WebSocket>) -> BoxStream<'static, AudioFrame> {
    receiver
        .take_while(|message| {
            let open = match message {
                Ok(Message::Close(frame)) => {
                    debug!("Client sent close frame: {:?}", frame);
                    false
                }
                Ok(_) => true,
                Err(e) => {
                    debug!("WebSocket receive error: {}", e);
                    false
                }
            };
            future::ready(open)
        })
        .filter_map(|message| {
            let frame = match message {
                Ok(Message::Binary(data)) => Some(AudioFrame::from(data)),
                Ok(Message::Text(text)) => {
                    warn!("Ignoring unexpected text frame ({} bytes)", text.len());
                    None
                }
                _ => None,
            };
            future::ready(frame)
        })
        .boxed()
}

/// Write half of a client WebSocket
pub struct WebSocketClient {
    sender: SplitSink<WebSocket, Message>,
    closed: bool,
}

impl WebSocketClient {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self { sender, closed: false }
    }
}

#[async_trait::async_trait]
impl ClientSink for WebSocketClient {
    async fn send(&mut self, message: TranscriptMessage) -> Result<(), ClientGone> {
        if self.closed {
            return Err(ClientGone("already closed".to_string()));
        }

        let payload = serde_json::to_string(&message).map_err(|e| ClientGone(e.to_string()))?;
        self.sender
            .send(Message::Text(payload))
            .await
            .map_err(|e| ClientGone(e.to_string()))
    }

    async fn close(&mut self, reason: CloseReason) {
        if self.closed {
            return;
        }
        self.closed = true;

        let frame = match reason {
            CloseReason::Normal => CloseFrame {
                code: close_code::NORMAL,
                reason: Cow::Borrowed(""),
            },
            CloseReason::Error(reason) => CloseFrame {
                code: close_code::ERROR,
                reason: Cow::Owned(truncate_reason(&reason)),
            },
        };

        // The peer may already be gone
        if let Err(e) = self.sender.send(Message::Close(Some(frame))).await {
            debug!("Close frame not delivered: {}", e);
        }
        if let Err(e) = self.sender.close().await {
            debug!("WebSocket close failed: {}", e);
        }
    }
}

fn truncate_reason(reason: &str) -> String {
    let mut end = reason.len().min(MAX_CLOSE_REASON_BYTES);
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    reason[..end].to_string()
}
