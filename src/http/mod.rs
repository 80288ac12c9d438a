//! WebSocket front end
//!
//! Every connection is upgraded to a WebSocket and handed to its own
//! `RelaySession`:
//! - binary frames → PCM16 audio for the recognizer
//! - text frames ← `{"type":"partial"|"final","text":...}` transcripts
//! - GET /health - Health check

mod handlers;
mod routes;
mod server;
mod socket;
mod state;

pub use routes::create_router;
pub use server::{BoundServer, SessionServer};
pub use socket::{audio_frames, WebSocketClient};
pub use state::AppState;
