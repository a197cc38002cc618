//! Daemon API Integration Tests
//!
//! These tests run the real HTTP client against a mock daemon and verify:
//! - Config fetch and field mapping
//! - The socks-port/socket-port compatibility mirror on the wire
//! - Rejected mutations surfacing as errors
//! - Version fetch defaults and edition detection
//! - Bearer secret propagation
//! - Log streaming end to end through the session layer

use proxyscope::buffer::EventBuffer;
use proxyscope::daemon::{DaemonClient, DaemonError};
use proxyscope::models::LogLevel;
use proxyscope::session::{SessionEvent, SessionEventKind, SessionHandle, SessionState, StreamKey, StreamKind};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn fetch_config_maps_daemon_field_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "port": 7890,
            "socks-port": 7891,
            "mixed-port": 0,
            "mode": "rule",
            "log-level": "warning",
            "allow-lan": true,
            "sniffing": false,
            "tun": { "enable": true, "stack": "gVisor" }
        })))
        .mount(&server)
        .await;

    let client = DaemonClient::new(server.uri(), None);
    let config = client.fetch_config().await.unwrap();
    assert_eq!(config.port, Some(7890));
    assert_eq!(config.socks_port, Some(7891));
    assert_eq!(config.mode, "rule");
    assert_eq!(config.log_level, LogLevel::Warning);
    assert!(config.allow_lan);
    assert!(config.tun.enable);
    assert_eq!(config.tun.stack, "gVisor");
}

#[tokio::test]
async fn patch_mirrors_socks_port_under_legacy_name_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/configs"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = DaemonClient::new(server.uri(), None);
    client.patch_config(json!({ "socks-port": 1080 })).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["socks-port"], 1080);
    assert_eq!(body["socket-port"], 1080);
}

#[tokio::test]
async fn rejected_patch_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/configs"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid port"))
        .mount(&server)
        .await;

    let client = DaemonClient::new(server.uri(), None);
    let err = client.patch_config(json!({ "port": 1 })).await.unwrap_err();
    match err {
        DaemonError::ConfigRejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "invalid port");
        }
        other => panic!("expected ConfigRejected, got {}", other),
    }
}

#[tokio::test]
async fn version_falls_back_to_defaults_when_unavailable() {
    // No mock mounted: every request gets a 404.
    let server = MockServer::start().await;
    let client = DaemonClient::new(server.uri(), None);

    let version = client.fetch_version().await;
    assert_eq!(version.version, "v1.0.0");
    assert!(!version.premium);
    assert!(!version.plus_pro);
}

#[tokio::test]
async fn version_detects_plus_pro_edition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "version": "2.1.0-PlusPro", "premium": true })),
        )
        .mount(&server)
        .await;

    let client = DaemonClient::new(server.uri(), None);
    let version = client.fetch_version().await;
    assert_eq!(version.version, "2.1.0-PlusPro");
    assert!(version.premium);
    assert!(version.plus_pro);
}

#[tokio::test]
async fn secret_travels_as_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/connections"))
        .and(header("Authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = DaemonClient::new(server.uri(), Some("s3cret".to_string()));
    client.close_all_connections().await.unwrap();
}

#[tokio::test]
async fn log_stream_flows_from_wire_to_buffer() {
    let body = concat!(
        r#"{"type":"info","payload":"dns resolved"}"#,
        "\n",
        r#"{"type":"warning","payload":"rule miss"}"#,
        "\n",
    );
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let client = DaemonClient::new(server.uri(), None);
    let key = StreamKey {
        base_url: server.uri(),
        level: Some(LogLevel::Info),
    };
    let (tx, mut rx) = mpsc::unbounded_channel::<SessionEvent>();
    let _handle = SessionHandle::spawn(41, key, StreamKind::Logs, client, tx);

    let mut buffer = EventBuffer::new(100);
    let mut saw_streaming = false;
    loop {
        match rx.recv().await.unwrap().kind {
            SessionEventKind::Logs(lines) => {
                for line in lines {
                    buffer.append(line);
                }
            }
            SessionEventKind::StateChanged(SessionState::Streaming) => saw_streaming = true,
            // The mock body ends, which the session reports as a failure; by
            // then every line has been delivered.
            SessionEventKind::StateChanged(state) if state.is_terminal() => break,
            _ => {}
        }
    }
    assert!(saw_streaming);

    let snapshot = buffer.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].payload, "dns resolved");
    assert_eq!(snapshot[0].level, LogLevel::Info);
    assert_eq!(snapshot[1].payload, "rule miss");
    assert_eq!(snapshot[1].level, LogLevel::Warning);
}
