// Integration tests for the WebSocket server
//
// These run the real axum server on a loopback port with a scripted
// recognizer behind it, and talk to it with the streaming client.

mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{ScriptedCall, ScriptedRecognizer};
use std::sync::Arc;
use std::time::Duration;
use stt_relay::config::HttpConfig;
use futures::{SinkExt, StreamExt};
use stt_relay::{ClientOptions, SessionConfig, SessionServer, StreamingClient, TranscriptMessage};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

const CHUNK: usize = 3200;

fn loopback() -> HttpConfig {
    HttpConfig {
        bind: "127.0.0.1".to_string(),
        port: 0,
    }
}

fn client_options(url: String) -> ClientOptions {
    ClientOptions {
        url,
        chunk_size: CHUNK,
        interval: Duration::from_millis(10),
        linger: Duration::from_millis(300),
        print_transcripts: false,
    }
}

async fn start_server(recognizer: Arc<ScriptedRecognizer>, credential: &str) -> Result<(String, JoinHandle<Result<()>>)> {
    let server = SessionServer::new(loopback(), SessionConfig::build(), recognizer, credential.to_string());
    let bound = server.bind().await?;
    let url = format!("ws://{}/", bound.local_addr()?);

    let handle = tokio::spawn(bound.serve(std::future::pending()));
    Ok((url, handle))
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let (recognizer, _calls) = ScriptedRecognizer::new();
    let server = SessionServer::new(loopback(), SessionConfig::build(), recognizer, "key");

    let response = server
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"OK");
    Ok(())
}

#[tokio::test]
async fn test_plain_http_request_is_not_upgraded() -> Result<()> {
    let (recognizer, _calls) = ScriptedRecognizer::new();
    let server = SessionServer::new(loopback(), SessionConfig::build(), recognizer.clone(), "key");

    let response = server
        .router()
        .oneshot(Request::builder().uri("/").body(Body::empty())?)
        .await?;

    assert!(response.status().is_client_error());
    assert_eq!(recognizer.calls_started(), 0);
    Ok(())
}

#[tokio::test]
async fn test_stream_wav_pcm_end_to_end() -> Result<()> {
    let (recognizer, mut calls) = ScriptedRecognizer::new();
    let (url, server) = start_server(recognizer, "key").await?;

    // Recognizer echoes a partial per chunk and a final after the last one
    let driver: JoinHandle<Result<ScriptedCall>> = tokio::spawn(async move {
        let mut call = calls.next_call().await?;
        call.next_request().await?;

        for i in 1..=4 {
            let chunk = call.next_chunk().await?;
            assert_eq!(chunk.len(), CHUNK);
            call.partial(&format!("chunk {}", i));
        }
        call.final_text("four chunks");

        call.expect_half_close().await?;
        Ok(call)
    });

    let pcm = vec![0u8; CHUNK * 4];
    let summary = StreamingClient::new(client_options(url)).run(&pcm).await?;

    assert_eq!(summary.chunks_sent, 4);
    assert_eq!(summary.bytes_sent, CHUNK * 4);
    assert_eq!(summary.transcripts.len(), 5);
    assert!(summary.transcripts[..4].iter().all(TranscriptMessage::is_partial));
    assert_eq!(summary.finals().collect::<Vec<_>>(), vec!["four chunks"]);
    assert!(!summary.failed());

    let call = tokio::time::timeout(common::WAIT, driver).await???;
    call.wait_released().await?;

    server.abort();
    Ok(())
}

#[tokio::test]
async fn test_missing_credential_closes_with_error() -> Result<()> {
    let (recognizer, _calls) = ScriptedRecognizer::new();
    let (url, server) = start_server(recognizer.clone(), "").await?;

    let summary = StreamingClient::new(client_options(url)).run(&[]).await?;

    assert!(summary.failed());
    assert_eq!(summary.chunks_sent, 0);
    assert_eq!(summary.close_code, Some(1011));
    assert!(summary.transcripts.is_empty());
    assert_eq!(recognizer.calls_started(), 0);

    server.abort();
    Ok(())
}

#[tokio::test]
async fn test_silence_then_speech_yields_exact_json_frames() -> Result<()> {
    let (recognizer, mut calls) = ScriptedRecognizer::new();
    let (url, server) = start_server(recognizer, "key").await?;

    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
    let mut call = calls.next_call().await?;
    call.next_request().await?;

    let silence = vec![0u8; 8192];
    let speech: Vec<u8> = (0..4096i16).flat_map(|s| (s * 7).to_le_bytes()).collect();

    socket.send(Message::Binary(silence.clone())).await?;
    socket.send(Message::Binary(speech.clone())).await?;
    assert_eq!(call.next_chunk().await?, silence);
    assert_eq!(call.next_chunk().await?, speech);

    call.partial("привет");
    call.final_text("привет мир");

    let mut frames = Vec::new();
    while frames.len() < 2 {
        match tokio::time::timeout(common::WAIT, socket.next()).await? {
            Some(Ok(Message::Text(text))) => frames.push(text),
            Some(Ok(_)) => {}
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    assert_eq!(
        frames,
        vec![
            r#"{"type":"partial","text":"привет"}"#.to_string(),
            r#"{"type":"final","text":"привет мир"}"#.to_string(),
        ]
    );

    socket.close(None).await?;
    call.expect_half_close().await?;

    server.abort();
    Ok(())
}

#[tokio::test]
async fn test_shutdown_closes_open_sessions() -> Result<()> {
    let (recognizer, mut calls) = ScriptedRecognizer::new();
    let bound = SessionServer::new(loopback(), SessionConfig::build(), recognizer, "key")
        .bind()
        .await?;
    let url = format!("ws://{}/", bound.local_addr()?);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(bound.serve(async move {
        let _ = stop_rx.await;
    }));

    let mut options = client_options(url);
    options.linger = Duration::from_secs(30);
    let client = tokio::spawn(async move { StreamingClient::new(options).run(&[0u8; CHUNK]).await });

    let mut call = calls.next_call().await?;
    call.next_request().await?;
    call.next_chunk().await?;

    let _ = stop_tx.send(());
    call.expect_half_close().await?;

    tokio::time::timeout(common::WAIT, server).await???;
    let summary = tokio::time::timeout(common::WAIT, client).await???;

    assert_eq!(summary.close_code, Some(1000));
    assert!(!summary.failed());
    call.wait_released().await?;
    Ok(())
}
