//! Upstream speech recognition
//!
//! This module owns everything on the recognizer side of the relay:
//! - wire messages for the SpeechKit STT v3 streaming call
//! - the `RecognizerBackend` seam and its gRPC implementation
//! - classification of raw responses into partial/final results
//! - `UpstreamBridge`, the per-session handle on one streaming call

pub mod backend;
pub mod bridge;
pub mod classifier;
pub mod error;
pub mod proto;

pub use backend::{RecognizerBackend, RequestStream, ResponseStream, SpeechKitRecognizer};
pub use bridge::{Received, UpstreamBridge};
pub use classifier::{classify, RecognitionResult, ResultKind};
pub use error::BridgeError;
