//! Stream gateway with a fake decoder script
#![cfg(unix)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use vtunerlineup::{Channel, DeviceIdentity, Lineup, TunerState, create_router};

const ENDLESS_DECODER: &str = r#"#!/bin/sh
printf 'frame=  10 fps=25 q=-1.0 size=  100kB time=00:00:01.00 bitrate= 100.0kbits/s speed=1x\r' >&2
while true; do
  printf 'TSDATA'
  sleep 0.05
done
"#;

const SHORT_DECODER: &str = r#"#!/bin/sh
printf 'TSDATA'
exit 0
"#;

fn decoder_script(dir: &TempDir, body: &str) -> String {
    let path = dir.path().join("fake-ffmpeg");
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn tuner(decoder: &str, shutdown: CancellationToken) -> TunerState {
    let channel = Channel {
        number: "5".into(),
        name: "France 5".into(),
        stream_url: "http://source.example/5.m3u8".into(),
        ..Default::default()
    };
    let lineup = Lineup::new(DeviceIdentity::default(), "127.0.0.1", 6077)
        .with_channels(vec![channel.clone()]);
    TunerState::new(
        lineup,
        None,
        vec![channel],
        Some(decoder.to_string()),
        shutdown,
    )
}

async fn open(router: &Router, uri: &str) -> Response {
    router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", what));
}

fn process_gone(pid: u32) -> bool {
    !Path::new(&format!("/proc/{}", pid)).exists() || !cfg!(target_os = "linux")
}

#[tokio::test]
async fn test_client_disconnect_kills_decoder() {
    let dir = TempDir::new().unwrap();
    let state = tuner(&decoder_script(&dir, ENDLESS_DECODER), CancellationToken::new());
    let router = create_router(state.clone());

    let response = open(&router, "/auto/v5").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp2t");

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let data = frame.into_data().unwrap();
    assert!(data.starts_with(b"TSDATA"));

    let sessions = state.gateway.sessions().clone();
    assert_eq!(sessions.len(), 1);
    let session = sessions.list().remove(0);
    assert_eq!(session.channel_number, "5");
    let pid = session.pid.unwrap();

    // progression lue sur stderr
    wait_until("decoder status", || {
        sessions
            .get(session.id)
            .and_then(|s| s.status)
            .is_some_and(|s| s.speed == "1.000x" && s.frames == "10")
    })
    .await;

    drop(body);

    wait_until("session cleanup", || sessions.is_empty()).await;
    assert!(process_gone(pid));
}

#[tokio::test]
async fn test_shutdown_ends_streams() {
    let dir = TempDir::new().unwrap();
    let shutdown = CancellationToken::new();
    let state = tuner(&decoder_script(&dir, ENDLESS_DECODER), shutdown.clone());
    let router = create_router(state.clone());

    let response = open(&router, "/auto/v5").await;
    assert_eq!(response.status(), StatusCode::OK);
    let mut body = response.into_body();
    assert!(body.frame().await.is_some());

    let sessions = state.gateway.sessions().clone();
    let pid = sessions.list()[0].pid.unwrap();

    shutdown.cancel();

    // le flux se termine sans que le client ne le lâche
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(frame) = body.frame().await {
            frame.unwrap();
        }
    })
    .await
    .expect("body did not end after shutdown");

    wait_until("session cleanup", || sessions.is_empty()).await;
    assert!(process_gone(pid));
}

#[tokio::test]
async fn test_decoder_exit_ends_stream() {
    let dir = TempDir::new().unwrap();
    let state = tuner(&decoder_script(&dir, SHORT_DECODER), CancellationToken::new());
    let router = create_router(state.clone());

    let response = open(&router, "/auto/v5").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = tokio::time::timeout(Duration::from_secs(10), response.into_body().collect())
        .await
        .expect("body did not end")
        .unwrap()
        .to_bytes();
    assert_eq!(&body[..], b"TSDATA");

    let sessions = state.gateway.sessions().clone();
    wait_until("session cleanup", || sessions.is_empty()).await;
}

#[tokio::test]
async fn test_missing_decoder_is_a_server_error() {
    let state = tuner("/nonexistent/ffmpeg", CancellationToken::new());
    let router = create_router(state.clone());

    let response = open(&router, "/auto/v5").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(state.gateway.sessions().is_empty());
}

#[tokio::test]
async fn test_unknown_channel_spawns_nothing() {
    let dir = TempDir::new().unwrap();
    let state = tuner(&decoder_script(&dir, ENDLESS_DECODER), CancellationToken::new());
    let router = create_router(state.clone());

    let response = open(&router, "/auto/v42").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(state.gateway.sessions().is_empty());
}
