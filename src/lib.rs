pub mod audio;
pub mod client;
pub mod config;
pub mod http;
pub mod recognition;
pub mod session;

pub use audio::{AudioFile, AudioFrame};
pub use client::{ClientOptions, ClientSummary, StreamingClient};
pub use config::Config;
pub use http::{create_router, AppState, BoundServer, SessionServer};
pub use recognition::{
    classify, BridgeError, Received, RecognitionResult, RecognizerBackend, ResultKind, SpeechKitRecognizer,
    UpstreamBridge,
};
pub use session::{RelaySession, SessionConfig, SessionReport, SessionState, TranscriptMessage};
