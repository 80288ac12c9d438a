//! WebSocket streaming client for exercising a running relay with a WAV file

use crate::session::TranscriptMessage;
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use std::io::Write;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// How long to wait for the relay to acknowledge our close
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Relay WebSocket URL
    pub url: String,
    /// Bytes of PCM per binary frame
    pub chunk_size: usize,
    /// Pause between frames
    pub interval: Duration,
    /// How long to keep listening after the last frame
    pub linger: Duration,
    /// Echo transcripts to stdout as they arrive
    pub print_transcripts: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".to_string(),
            chunk_size: 8192,
            interval: Duration::from_millis(100),
            linger: Duration::from_secs(2),
            print_transcripts: true,
        }
    }
}

/// What happened during one streaming run
#[derive(Debug, Clone, Default)]
pub struct ClientSummary {
    pub chunks_sent: usize,
    pub bytes_sent: usize,
    pub transcripts: Vec<TranscriptMessage>,
    /// Close code sent by the relay, if it closed the connection
    pub close_code: Option<u16>,
    pub close_reason: Option<String>,
}

impl ClientSummary {
    pub fn finals(&self) -> impl Iterator<Item = &str> {
        self.transcripts
            .iter()
            .filter(|t| !t.is_partial())
            .map(TranscriptMessage::text)
    }

    /// True when the relay closed with an error code
    pub fn failed(&self) -> bool {
        matches!(self.close_code, Some(code) if code != u16::from(CloseCode::Normal))
    }
}

#[derive(Default)]
struct Received {
    transcripts: Vec<TranscriptMessage>,
    close_code: Option<u16>,
    close_reason: Option<String>,
}

pub struct StreamingClient {
    options: ClientOptions,
}

impl StreamingClient {
    pub fn new(options: ClientOptions) -> Self {
        Self { options }
    }

    /// Stream `pcm` to the relay in real-time-sized chunks and collect transcripts
    pub async fn run(&self, pcm: &[u8]) -> Result<ClientSummary> {
        let chunk_size = self.options.chunk_size.max(1);

        let (socket, _) = tokio_tungstenite::connect_async(self.options.url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", self.options.url))?;
        info!("Connected to {}", self.options.url);

        let (mut write, mut read) = socket.split();
        let print_transcripts = self.options.print_transcripts;

        let mut reader: JoinHandle<Received> = tokio::spawn(async move {
            let mut received = Received::default();

            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<TranscriptMessage>(&text) {
                        Ok(transcript) => {
                            if print_transcripts {
                                print_transcript(&transcript);
                            }
                            received.transcripts.push(transcript);
                        }
                        Err(e) => warn!("Unexpected message from relay: {} ({})", text, e),
                    },
                    Ok(Message::Close(frame)) => {
                        if let Some(frame) = frame {
                            received.close_code = Some(u16::from(frame.code));
                            received.close_reason = Some(frame.reason.into_owned());
                        }
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Relay connection ended: {}", e);
                        break;
                    }
                }
            }

            received
        });

        let mut summary = ClientSummary::default();

        for chunk in pcm.chunks(chunk_size) {
            if chunk.is_empty() {
                continue;
            }
            if reader.is_finished() {
                warn!("Relay closed the connection while streaming");
                break;
            }
            if let Err(e) = write.send(Message::Binary(chunk.to_vec())).await {
                warn!("Failed to send audio chunk: {}", e);
                break;
            }

            summary.chunks_sent += 1;
            summary.bytes_sent += chunk.len();
            tokio::time::sleep(self.options.interval).await;
        }

        info!(
            "Sent {} chunks ({} bytes), waiting {:?} for trailing results",
            summary.chunks_sent, summary.bytes_sent, self.options.linger
        );

        let finished_early = tokio::select! {
            _ = tokio::time::sleep(self.options.linger) => None,
            joined = &mut reader => Some(joined.unwrap_or_default()),
        };

        let received = match finished_early {
            Some(received) => received,
            None => {
                let close = Message::Close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: "".into(),
                }));
                if let Err(e) = write.send(close).await {
                    debug!("Close frame not delivered: {}", e);
                }

                match tokio::time::timeout(CLOSE_TIMEOUT, &mut reader).await {
                    Ok(joined) => joined.unwrap_or_default(),
                    Err(_) => {
                        warn!("Relay did not close within {:?}", CLOSE_TIMEOUT);
                        reader.abort();
                        Received::default()
                    }
                }
            }
        };

        if print_transcripts && received.transcripts.last().is_some_and(TranscriptMessage::is_partial) {
            println!();
        }

        summary.transcripts = received.transcripts;
        summary.close_code = received.close_code;
        summary.close_reason = received.close_reason;

        Ok(summary)
    }
}

/// Partials rewrite the current line, finals end it
fn print_transcript(transcript: &TranscriptMessage) {
    match transcript {
        TranscriptMessage::Partial { text } => {
            print!("\r{}", text);
            let _ = std::io::stdout().flush();
        }
        TranscriptMessage::Final { text } => println!("\r{}", text),
    }
}
