//! Application state: wires the telemetry core to the daemon client, the
//! preference store, and the views.

mod handlers;
mod messages;

pub use handlers::ConfigItem;
pub use messages::{AppMessage, DaemonAction};

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::buffer::{BufferSnapshot, EventBuffer};
use crate::daemon::DaemonClient;
use crate::models::{ConfigSnapshot, ConnectionsSnapshot, Version};
use crate::session::{SessionController, SessionEvent, StreamKey, StreamKind};
use crate::storage::{prefs_path, Prefs, ThrottledSaver};
use crate::table::TableModel;

/// Which view is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Logs,
    Connections,
    Config,
}

/// Cursor state for the config view's field list.
#[derive(Debug, Default)]
pub struct ConfigCursor {
    pub selected: usize,
    /// In-progress text edit for a port field.
    pub input: Option<String>,
}

pub struct App {
    pub client: DaemonClient,
    pub prefs: Prefs,
    pub view: View,
    pub should_quit: bool,

    /// Log tail; survives pause/resume, cleared on filter or address change.
    pub logs: EventBuffer,
    /// Snapshot of `logs` taken after the last mutation; what one render pass
    /// sees, immune to tearing from appends that race the draw.
    logs_view: BufferSnapshot,
    pub log_scroll: usize,
    /// Pin the view to the newest line unless the user scrolled up.
    pub follow_logs: bool,
    /// Committed payload substring filter, matched case-insensitively.
    pub log_search: Option<String>,
    /// In-progress search edit; shown in the title while `Some`.
    pub log_search_input: Option<String>,

    pub connections: ConnectionsSnapshot,
    pub table: TableModel,
    pub sort_cursor: usize,

    pub config: Option<ConfigSnapshot>,
    pub version: Version,
    pub config_cursor: ConfigCursor,
    /// Non-blocking failure indicator shown in the status line.
    pub notice: Option<String>,

    pub(crate) log_streams: SessionController,
    pub(crate) conn_streams: SessionController,
    pub(crate) saver: ThrottledSaver,
    pub(crate) message_tx: mpsc::UnboundedSender<AppMessage>,
    /// Pre-mutation config kept for rollback while a PATCH is in flight.
    pub(crate) config_backup: Option<ConfigSnapshot>,
    /// Cumulative counters from the previous snapshot, keyed by connection id,
    /// for instantaneous speed derivation.
    pub(crate) prev_counters: HashMap<String, (u64, u64)>,
}

impl App {
    pub fn new(
        prefs: Prefs,
        session_tx: mpsc::UnboundedSender<SessionEvent>,
        message_tx: mpsc::UnboundedSender<AppMessage>,
    ) -> Self {
        let client = DaemonClient::new(prefs.base_url.clone(), prefs.secret.clone());
        let saver_path = prefs_path().unwrap_or_else(|_| "prefs.json".into());
        let mut logs = EventBuffer::default();
        let logs_view = logs.snapshot();
        let mut app = App {
            client,
            prefs,
            view: View::default(),
            should_quit: false,
            logs,
            logs_view,
            log_scroll: 0,
            follow_logs: true,
            log_search: None,
            log_search_input: None,
            connections: ConnectionsSnapshot::default(),
            table: TableModel::new(),
            sort_cursor: 0,
            config: None,
            version: Version::default(),
            config_cursor: ConfigCursor::default(),
            notice: None,
            log_streams: SessionController::new(StreamKind::Logs, session_tx.clone()),
            conn_streams: SessionController::new(StreamKind::Connections, session_tx),
            saver: ThrottledSaver::new(saver_path),
            message_tx,
            config_backup: None,
            prev_counters: HashMap::new(),
        };
        app.sync_streams();
        app.refresh_config();
        app.refresh_version();
        app
    }

    /// Reconnect key for the log stream: address plus severity filter,
    /// compared by value.
    pub(crate) fn log_key(&self) -> StreamKey {
        StreamKey {
            base_url: self.prefs.base_url.clone(),
            level: Some(self.prefs.log_level),
        }
    }

    pub(crate) fn conn_key(&self) -> StreamKey {
        StreamKey {
            base_url: self.prefs.base_url.clone(),
            level: None,
        }
    }

    /// Reconcile stream sessions with the mounted view and the pause gate.
    /// A view's session exists only while the view is mounted; leaving a view
    /// releases its transport.
    pub fn sync_streams(&mut self) {
        match self.view {
            View::Logs => {
                let key = self.log_key();
                let paused = self.prefs.log_streaming_paused;
                self.log_streams.sync(&self.client, key, paused);
                self.conn_streams.stop();
            }
            View::Connections => {
                let key = self.conn_key();
                self.conn_streams.sync(&self.client, key, false);
                self.log_streams.stop();
            }
            View::Config => {
                self.log_streams.stop();
                self.conn_streams.stop();
            }
        }
    }

    pub fn switch_view(&mut self, view: View) {
        if self.view == view {
            return;
        }
        self.view = view;
        self.sync_streams();
    }

    /// Toggle the pause gate. The gate is persisted and the log tail is kept:
    /// resume reconnects fresh without clearing already-displayed events.
    pub fn toggle_pause(&mut self) {
        self.prefs.log_streaming_paused = !self.prefs.log_streaming_paused;
        self.save_prefs();
        self.sync_streams();
    }

    /// Change the log severity filter. The endpoint is parameterized by query
    /// string, so this forces a reconnect and a fresh buffer.
    pub fn set_log_level(&mut self, level: crate::models::LogLevel) {
        if self.prefs.log_level == level {
            return;
        }
        self.prefs.log_level = level;
        self.logs.clear();
        self.refresh_logs_view();
        self.log_scroll = 0;
        self.follow_logs = true;
        self.save_prefs();
        self.sync_streams();
    }

    /// Point at a different daemon. All sessions are recreated and cached
    /// telemetry from the old daemon is dropped.
    pub fn set_base_url(&mut self, base_url: String) {
        if self.prefs.base_url == base_url {
            return;
        }
        self.prefs.base_url = base_url;
        self.client = DaemonClient::new(self.prefs.base_url.clone(), self.prefs.secret.clone());
        self.logs.clear();
        self.refresh_logs_view();
        self.connections = ConnectionsSnapshot::default();
        self.prev_counters.clear();
        self.config = None;
        self.save_prefs();
        self.sync_streams();
        self.refresh_config();
        self.refresh_version();
    }

    /// Manual retry after a `Failed` session state.
    pub fn retry_stream(&mut self) {
        match self.view {
            View::Logs => {
                let key = self.log_key();
                self.log_streams.retry(&self.client, key);
            }
            View::Connections => {
                let key = self.conn_key();
                self.conn_streams.retry(&self.client, key);
            }
            View::Config => {}
        }
    }

    /// State of the stream backing the mounted view.
    pub fn stream_state(&self) -> crate::session::SessionState {
        match self.view {
            View::Logs => self.log_streams.state(),
            View::Connections => self.conn_streams.state(),
            View::Config => crate::session::SessionState::Idle,
        }
    }

    /// Consistent log snapshot for one render pass.
    pub fn logs_snapshot(&self) -> BufferSnapshot {
        self.logs_view.clone()
    }

    /// The log tail with the search filter applied, oldest first. Filtering is
    /// a pure view over the snapshot; the buffer itself is untouched.
    pub fn filtered_logs(&self) -> Vec<std::sync::Arc<crate::models::LogEvent>> {
        match &self.log_search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                self.logs_view
                    .iter()
                    .filter(|e| e.payload.to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            }
            None => self.logs_view.iter().cloned().collect(),
        }
    }

    pub(crate) fn refresh_logs_view(&mut self) {
        self.logs_view = self.logs.snapshot();
    }

    pub fn refresh_config(&self) {
        let client = self.client.clone();
        let tx = self.message_tx.clone();
        tokio::spawn(async move {
            let result = client.fetch_config().await.map_err(|e| e.to_string());
            let _ = tx.send(AppMessage::ConfigFetched(result));
        });
    }

    pub fn refresh_version(&self) {
        let client = self.client.clone();
        let tx = self.message_tx.clone();
        tokio::spawn(async move {
            let version = client.fetch_version().await;
            let _ = tx.send(AppMessage::VersionFetched(version));
        });
    }

    pub(crate) fn save_prefs(&mut self) {
        let prefs = self.prefs.clone();
        self.saver.request_save(&prefs);
    }

    /// Periodic housekeeping driven by the render tick.
    pub fn tick(&mut self) {
        self.saver.tick();
    }

    /// Flush pending state on shutdown.
    pub fn shutdown(&mut self) {
        self.log_streams.stop();
        self.conn_streams.stop();
        self.saver.flush();
    }
}
