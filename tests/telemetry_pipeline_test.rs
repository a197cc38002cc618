//! Telemetry Pipeline Integration Tests
//!
//! These tests drive the full stream-to-buffer pipeline with scripted
//! transports and verify:
//! - Decoded events reach the buffer in arrival order across chunk boundaries
//! - Pausing releases the session without dropping buffered events
//! - Resuming starts a fresh session whose events continue the same buffer
//! - Buffer eviction under sustained streaming

use bytes::Bytes;
use futures_util::stream;
use futures_util::StreamExt;
use proxyscope::buffer::EventBuffer;
use proxyscope::daemon::ByteStream;
use proxyscope::models::LogLevel;
use proxyscope::session::{
    SessionEvent, SessionEventKind, SessionHandle, SessionState, StreamKey, StreamKind,
};
use tokio::sync::mpsc;

fn key() -> StreamKey {
    StreamKey {
        base_url: "http://127.0.0.1:9090".to_string(),
        level: Some(LogLevel::Info),
    }
}

/// A transport yielding `count` log lines split into uneven chunks, then
/// staying open.
fn scripted_log_stream(start: usize, count: usize) -> ByteStream {
    let mut wire = String::new();
    for n in start..start + count {
        wire.push_str(&format!(r#"{{"type":"info","payload":"event {}"}}"#, n));
        wire.push('\n');
    }
    let bytes = wire.into_bytes();
    // Chunk size 17 lands mid-record on purpose.
    let chunks: Vec<Result<Bytes, _>> = bytes
        .chunks(17)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    Box::pin(stream::iter(chunks).chain(stream::pending()))
}

/// Pump session events into the buffer until `expected` events arrived.
async fn pump_into(
    rx: &mut mpsc::UnboundedReceiver<SessionEvent>,
    session: u64,
    buffer: &mut EventBuffer,
    expected: usize,
) {
    let mut seen = 0;
    while seen < expected {
        let event = rx.recv().await.expect("event channel closed");
        assert_eq!(event.session, session);
        if let SessionEventKind::Logs(lines) = event.kind {
            for line in lines {
                buffer.append(line);
                seen += 1;
            }
        }
    }
}

#[tokio::test]
async fn pause_keeps_buffer_resume_continues_it() {
    let mut buffer = EventBuffer::new(2000);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let first = SessionHandle::spawn_with(101, key(), StreamKind::Logs, tx.clone(), || async {
        Ok(scripted_log_stream(1, 200))
    });
    pump_into(&mut rx, 101, &mut buffer, 200).await;

    // Pause: the session is torn down, the buffer is not.
    first.stop();
    loop {
        if let SessionEventKind::StateChanged(state) = rx.recv().await.unwrap().kind {
            if state == SessionState::Stopped {
                break;
            }
        }
    }
    assert_eq!(buffer.len(), 200);
    let paused_snapshot = buffer.snapshot();
    assert_eq!(paused_snapshot.first().unwrap().payload, "event 1");
    assert_eq!(paused_snapshot.last().unwrap().payload, "event 200");

    // Resume: a fresh session appends to the same buffer, ids keep counting.
    let second = SessionHandle::spawn_with(102, key(), StreamKind::Logs, tx, || async {
        Ok(scripted_log_stream(201, 50))
    });
    pump_into(&mut rx, 102, &mut buffer, 50).await;
    second.stop();

    let snapshot = buffer.snapshot();
    assert_eq!(snapshot.len(), 250);
    assert_eq!(snapshot.last().unwrap().payload, "event 250");
    assert_eq!(snapshot.last().unwrap().id, 250);
    // The pre-pause snapshot is unaffected by post-resume appends.
    assert_eq!(paused_snapshot.len(), 200);
}

#[tokio::test]
async fn events_arrive_in_wire_order_across_chunk_splits() {
    let mut buffer = EventBuffer::new(2000);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = SessionHandle::spawn_with(111, key(), StreamKind::Logs, tx, || async {
        Ok(scripted_log_stream(1, 100))
    });
    pump_into(&mut rx, 111, &mut buffer, 100).await;
    handle.stop();

    let snapshot = buffer.snapshot();
    for (i, event) in snapshot.iter().enumerate() {
        assert_eq!(event.payload, format!("event {}", i + 1));
    }
}

#[tokio::test]
async fn sustained_streaming_evicts_oldest_only() {
    let mut buffer = EventBuffer::new(64);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = SessionHandle::spawn_with(121, key(), StreamKind::Logs, tx, || async {
        Ok(scripted_log_stream(1, 300))
    });
    pump_into(&mut rx, 121, &mut buffer, 300).await;
    handle.stop();

    let snapshot = buffer.snapshot();
    assert_eq!(snapshot.len(), 64);
    assert_eq!(snapshot.first().unwrap().payload, "event 237");
    assert_eq!(snapshot.last().unwrap().payload, "event 300");
}
