//! Streaming session lifecycle for the daemon's telemetry endpoints.
//!
//! One [`SessionHandle`] owns one long-lived streaming connection: the spawned
//! read task has exclusive ownership of the transport, decodes chunks in
//! arrival order, and forwards events tagged with the session's id so stale
//! deliveries from a dead session are cheaply rejected downstream. Cancellation
//! is a watch signal observed at the read loop's only suspension point, which
//! is what guarantees a stopped session never delivers another event.
//!
//! [`SessionController`] sits above the handle: it reconciles the desired
//! stream key (address + filter, compared by value) and the pause gate against
//! whatever session currently exists, reconnecting only when the key actually
//! changed. Pausing fully releases the transport; resuming reconnects fresh.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::daemon::{ByteStream, DaemonClient, DaemonError, CONNECT_TIMEOUT};
use crate::decode::{ConnectionsDecoder, LogDecoder};
use crate::models::{ConnectionsFrame, LogLevel, LogLine};

/// Lifecycle state of one streaming session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No transport held.
    #[default]
    Idle,
    /// Transport-open request in flight, bounded by the connect timeout.
    Connecting,
    /// Read loop active, events flowing.
    Streaming,
    /// Gate engaged; transport released, resume reconnects fresh.
    Paused,
    /// Terminal for this session instance; transport released.
    Stopped,
    /// Transport released; carries the error detail. No silent auto-retry.
    Failed(String),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Failed(_))
    }
}

/// Which telemetry endpoint a session reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Logs,
    Connections,
}

/// Normalized reconnect key: a session must be torn down and rebuilt exactly
/// when this value changes. Compared by value, never by identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamKey {
    pub base_url: String,
    /// Minimum severity; only meaningful for the log stream.
    pub level: Option<LogLevel>,
}

/// Payload forwarded from a session's read task.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEventKind {
    /// Decoded log lines from one chunk, in arrival order.
    Logs(Vec<LogLine>),
    /// One full-replacement connections frame.
    Connections(ConnectionsFrame),
    /// The session entered a new state.
    StateChanged(SessionState),
}

/// An event tagged with the id of the session that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub session: u64,
    pub kind: SessionEventKind,
}

pub type SessionEventSender = mpsc::UnboundedSender<SessionEvent>;

/// Session ids are unique across every controller in the process, so an event
/// can always be attributed to exactly one session.
fn next_session_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// Handle to one spawned streaming session.
///
/// Dropping the handle cancels the session: the read task observes the closed
/// cancel channel at its next suspension point and releases the transport.
pub struct SessionHandle {
    id: u64,
    key: StreamKey,
    cancel_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<SessionState>,
}

impl SessionHandle {
    /// Spawn a session that connects via `connect` and decodes with `kind`'s
    /// decoder. `connect` is injected so tests can supply scripted transports.
    pub fn spawn_with<C, Fut>(
        id: u64,
        key: StreamKey,
        kind: StreamKind,
        events_tx: SessionEventSender,
        connect: C,
    ) -> Self
    where
        C: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<ByteStream, DaemonError>> + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        tokio::spawn(run_session(
            id, kind, connect, events_tx, cancel_rx, state_tx,
        ));
        SessionHandle {
            id,
            key,
            cancel_tx,
            state_rx,
        }
    }

    /// Spawn a session against a real daemon endpoint.
    pub fn spawn(
        id: u64,
        key: StreamKey,
        kind: StreamKind,
        client: DaemonClient,
        events_tx: SessionEventSender,
    ) -> Self {
        let level = key.level.unwrap_or_default();
        Self::spawn_with(id, key, kind, events_tx, move || async move {
            match kind {
                StreamKind::Logs => client.stream_logs(level).await,
                StreamKind::Connections => client.stream_connections().await,
            }
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    /// Current state as last published by the read task.
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state transitions.
    pub fn state_receiver(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Request cancellation. Idempotent: stopping an already-stopped session
    /// is a no-op, and the transport is only ever released once (by the read
    /// task on exit).
    pub fn stop(&self) {
        let _ = self.cancel_tx.send(true);
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The session read task. Owns the transport exclusively from open to drop.
async fn run_session<C, Fut>(
    id: u64,
    kind: StreamKind,
    connect: C,
    events_tx: SessionEventSender,
    mut cancel_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<SessionState>,
) where
    C: FnOnce() -> Fut,
    Fut: Future<Output = Result<ByteStream, DaemonError>>,
{
    let publish = |state: SessionState| {
        let _ = state_tx.send(state.clone());
        let _ = events_tx.send(SessionEvent {
            session: id,
            kind: SessionEventKind::StateChanged(state),
        });
    };

    publish(SessionState::Connecting);

    let mut stream = tokio::select! {
        biased;
        _ = cancelled(&mut cancel_rx) => {
            debug!(session = id, "cancelled while connecting");
            publish(SessionState::Stopped);
            return;
        }
        attempt = timeout(CONNECT_TIMEOUT, connect()) => match attempt {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!(session = id, error = %e, "stream connect failed");
                publish(SessionState::Failed(e.to_string()));
                return;
            }
            Err(_) => {
                warn!(session = id, "stream connect timed out");
                publish(SessionState::Failed("connection attempt timed out".to_string()));
                return;
            }
        },
    };

    // Entering Streaming clears any previous Failed detail.
    publish(SessionState::Streaming);
    info!(session = id, ?kind, "stream connected");

    let mut log_decoder = LogDecoder::new();
    let mut conn_decoder = ConnectionsDecoder::new();

    loop {
        // The read is the only suspension point; cancellation is checked here
        // so no event can be forwarded after stop() wins the race.
        let chunk = tokio::select! {
            biased;
            _ = cancelled(&mut cancel_rx) => {
                debug!(session = id, "cancelled while streaming");
                publish(SessionState::Stopped);
                return;
            }
            chunk = stream.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                let stale = match kind {
                    StreamKind::Logs => {
                        let lines = log_decoder.feed(&bytes);
                        if lines.is_empty() {
                            false
                        } else {
                            events_tx
                                .send(SessionEvent {
                                    session: id,
                                    kind: SessionEventKind::Logs(lines),
                                })
                                .is_err()
                        }
                    }
                    StreamKind::Connections => {
                        let mut stale = false;
                        for frame in conn_decoder.feed(&bytes) {
                            stale |= events_tx
                                .send(SessionEvent {
                                    session: id,
                                    kind: SessionEventKind::Connections(frame),
                                })
                                .is_err();
                        }
                        stale
                    }
                };
                if stale {
                    // Receiver gone; nothing left to feed.
                    let _ = state_tx.send(SessionState::Stopped);
                    return;
                }
            }
            Some(Err(e)) => {
                warn!(session = id, error = %e, "stream read failed");
                publish(SessionState::Failed(e.to_string()));
                return;
            }
            None => {
                debug!(session = id, "stream closed by daemon");
                publish(SessionState::Failed("stream closed by daemon".to_string()));
                return;
            }
        }
    }
}

/// Resolves once cancellation is requested (or the handle was dropped).
async fn cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    loop {
        if *cancel_rx.borrow() {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Reconciles the desired stream key and pause gate against the live session.
pub struct SessionController {
    kind: StreamKind,
    events_tx: SessionEventSender,
    current: Option<SessionHandle>,
    paused: bool,
}

impl SessionController {
    pub fn new(kind: StreamKind, events_tx: SessionEventSender) -> Self {
        SessionController {
            kind,
            events_tx,
            current: None,
            paused: false,
        }
    }

    /// Reconcile toward `key` under the pause gate. This is the single place a
    /// connect can be initiated, so the gate check here covers every path.
    ///
    /// - gate paused: live session is stopped, no connect attempt is made;
    /// - same key and session alive: no-op (guards double-connect);
    /// - changed key or dead session: old session stopped, fresh one spawned.
    pub fn sync(&mut self, client: &DaemonClient, key: StreamKey, paused: bool) {
        self.paused = paused;
        if paused {
            if let Some(old) = self.current.take() {
                info!(session = old.id(), "pause gate engaged, stopping session");
                old.stop();
            }
            return;
        }

        if let Some(current) = &self.current {
            let alive = !current.state().is_terminal();
            if alive && current.key() == &key {
                return;
            }
        }

        if let Some(old) = self.current.take() {
            old.stop();
        }
        let id = next_session_id();
        debug!(session = id, kind = ?self.kind, ?key, "starting stream session");
        self.current = Some(SessionHandle::spawn(
            id,
            key,
            self.kind,
            client.clone(),
            self.events_tx.clone(),
        ));
    }

    /// Retry after a failure. Unlike `sync`, this replaces a session in
    /// `Failed` even though the key is unchanged.
    pub fn retry(&mut self, client: &DaemonClient, key: StreamKey) {
        if let Some(old) = self.current.take() {
            old.stop();
        }
        self.sync(client, key, self.paused);
    }

    /// Stop the live session. Idempotent.
    pub fn stop(&mut self) {
        if let Some(old) = self.current.take() {
            old.stop();
        }
    }

    /// Id of the session whose events should currently be accepted.
    pub fn current_session(&self) -> Option<u64> {
        self.current.as_ref().map(SessionHandle::id)
    }

    /// Controller-level state: `Paused` while the gate is engaged, `Idle` when
    /// no session exists, otherwise the live session's state.
    pub fn state(&self) -> SessionState {
        if self.paused {
            return SessionState::Paused;
        }
        match &self.current {
            Some(handle) => handle.state(),
            None => SessionState::Idle,
        }
    }
}
