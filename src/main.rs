use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stt_relay::session::SAMPLE_RATE_HZ;
use stt_relay::{AudioFile, ClientOptions, Config, SessionConfig, SessionServer, SpeechKitRecognizer, StreamingClient};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stt-relay")]
#[command(about = "Relay live PCM audio from WebSocket clients to a streaming speech recognizer", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Accept WebSocket clients and relay their audio
    Serve {
        /// Config file (defaults to config/stt-relay.toml if present)
        #[arg(short, long)]
        config: Option<String>,

        /// Port to listen on, overriding config and PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Stream a 16 kHz PCM16 WAV file to a running relay
    Stream {
        /// WAV file to stream
        wav: PathBuf,

        /// Relay WebSocket URL
        #[arg(short, long, default_value = "ws://127.0.0.1:8000")]
        url: String,

        /// Bytes of audio per frame
        #[arg(long, default_value = "8192")]
        chunk_size: usize,

        /// Milliseconds between frames
        #[arg(long, default_value = "100")]
        interval_ms: u64,

        /// Milliseconds to wait for trailing results after the last frame
        #[arg(long, default_value = "2000")]
        linger_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stt_relay=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Serve { config, port } => serve(config.as_deref(), port).await,
        Command::Stream {
            wav,
            url,
            chunk_size,
            interval_ms,
            linger_ms,
        } => {
            let options = ClientOptions {
                url,
                chunk_size,
                interval: Duration::from_millis(interval_ms),
                linger: Duration::from_millis(linger_ms),
                print_transcripts: true,
            };
            stream(wav, options).await
        }
    }
}

async fn serve(config_path: Option<&str>, port: Option<u16>) -> Result<()> {
    let mut cfg = Config::load(config_path)?;
    if let Some(port) = port {
        cfg.service.http.port = port;
    }

    info!("Loaded config: {}", cfg.service.name);
    info!("Recognizer endpoint: {}", cfg.recognizer.endpoint);
    info!("API key loaded: {}", cfg.credential().is_some());
    cfg.validate()?;

    let backend = Arc::new(SpeechKitRecognizer::new(
        cfg.recognizer.endpoint.clone(),
        cfg.connect_timeout(),
    ));
    let credential = cfg.credential().unwrap_or_default().to_string();

    let server = SessionServer::new(cfg.service.http.clone(), SessionConfig::build(), backend, credential);
    let bound = server.bind().await?;
    info!("STT relay listening on ws://{}", bound.local_addr()?);

    bound.serve(shutdown_signal()).await
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down");
}

async fn stream(wav: PathBuf, options: ClientOptions) -> Result<()> {
    let audio = AudioFile::open(&wav)?;
    let pcm = audio.pcm_bytes(SAMPLE_RATE_HZ)?;

    info!("Streaming {:.1}s of audio to {}", audio.duration_seconds, options.url);

    let summary = StreamingClient::new(options).run(&pcm).await?;

    info!(
        "Done: {} chunks ({} bytes) sent, {} transcripts received",
        summary.chunks_sent,
        summary.bytes_sent,
        summary.transcripts.len()
    );

    if summary.failed() {
        bail!(
            "Relay closed the session with code {}: {}",
            summary.close_code.unwrap_or_default(),
            summary.close_reason.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
