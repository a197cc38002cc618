//! Event and message handling for [`App`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use tracing::{info, warn};

use crate::models::{ConnectionRecord, ConnectionsFrame, ConnectionsSnapshot, LogLevel};
use crate::mutation::{ConfigMutation, PortField, ProxyMode, TunStack};
use crate::session::{SessionEvent, SessionEventKind, SessionState};

use super::{App, AppMessage, DaemonAction, View};

/// One row of the config view: a mutable field or a one-shot action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigItem {
    Port(PortField),
    Mode,
    LogLevel,
    AllowLan,
    Sniffing,
    TunEnable,
    TunStack,
    Action(DaemonAction),
}

impl App {
    /// Route one session event. Events are tagged with their session id; an
    /// id that does not match the live session of either stream belongs to a
    /// session that has since been stopped, and is dropped here so a zombie
    /// read can never touch state a newer session owns.
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        let is_log = self.log_streams.current_session() == Some(event.session);
        let is_conn = self.conn_streams.current_session() == Some(event.session);
        if !is_log && !is_conn {
            return;
        }
        match event.kind {
            SessionEventKind::Logs(lines) if is_log => {
                for line in lines {
                    self.logs.append(line);
                }
                self.refresh_logs_view();
                if self.follow_logs {
                    self.log_scroll = self.logs.len().saturating_sub(1);
                }
            }
            SessionEventKind::Connections(frame) if is_conn => {
                self.apply_connections_frame(frame);
            }
            SessionEventKind::StateChanged(state) => {
                if let SessionState::Failed(detail) = &state {
                    self.notice = Some(format!("stream failed: {}", detail));
                }
            }
            // Data event of the wrong kind for the session it claims: ignore.
            _ => {}
        }
    }

    /// Apply one full-replacement connections frame. A connection absent from
    /// the frame is gone; no explicit removal event exists or is needed.
    pub fn apply_connections_frame(&mut self, frame: ConnectionsFrame) {
        let items = frame.connections.unwrap_or_default();
        let mut counters = std::collections::HashMap::with_capacity(items.len());
        let mut records = Vec::with_capacity(items.len());
        for item in items {
            let prev = self.prev_counters.get(&item.id).copied();
            counters.insert(item.id.clone(), (item.download, item.upload));
            records.push(ConnectionRecord::from_item(item, prev));
        }
        // Replacing the counter map drops closed connections' entries.
        self.prev_counters = counters;
        self.table.update_capabilities(&records);
        self.connections = ConnectionsSnapshot {
            download_total: frame.download_total,
            upload_total: frame.upload_total,
            connections: records,
        };
    }

    pub fn handle_message(&mut self, message: AppMessage) {
        match message {
            AppMessage::ConfigFetched(Ok(config)) => {
                self.config = Some(config);
                self.config_backup = None;
                // The item list can shrink when the new config exposes fewer
                // ports; a cursor past the end must not survive.
                let count = self.config_items().len();
                self.config_cursor.selected = self.config_cursor.selected.min(count.saturating_sub(1));
            }
            AppMessage::ConfigFetched(Err(e)) => {
                self.notice = Some(format!("config fetch failed: {}", e));
            }
            AppMessage::VersionFetched(version) => {
                self.version = version;
            }
            AppMessage::MutationOutcome { mutation, result } => match result {
                Ok(()) => {
                    info!(?mutation, "config mutation accepted");
                    self.config_backup = None;
                    if mutation.affects_tun() {
                        self.run_action(DaemonAction::CloseAllConnections);
                    }
                    self.refresh_config();
                }
                Err(e) => {
                    warn!(?mutation, error = %e, "config mutation rejected");
                    // Roll the optimistic update back to the pre-mutation state.
                    if let Some(backup) = self.config_backup.take() {
                        self.config = Some(backup);
                    }
                    self.notice = Some(format!("config change rejected: {}", e));
                }
            },
            AppMessage::ActionOutcome { action, result } => match result {
                Ok(()) => {
                    if action != DaemonAction::CloseAllConnections {
                        self.refresh_config();
                    }
                }
                Err(e) => {
                    self.notice = Some(format!("{} failed: {}", action.label(), e));
                }
            },
        }
    }

    /// Optimistically apply `mutation` and remember the pre-mutation config
    /// for rollback. Returns false when no config is loaded yet.
    pub fn begin_mutation(&mut self, mutation: ConfigMutation) -> bool {
        let Some(config) = self.config.as_mut() else {
            return false;
        };
        self.config_backup = Some(config.clone());
        mutation.apply(config);
        true
    }

    /// Dispatch a mutation: optimistic local apply, then PATCH in the
    /// background. The outcome comes back as a `MutationOutcome` message.
    pub fn dispatch_mutation(&mut self, mutation: ConfigMutation) {
        if !self.begin_mutation(mutation) {
            return;
        }
        let client = self.client.clone();
        let tx = self.message_tx.clone();
        tokio::spawn(async move {
            let result = client
                .patch_config(mutation.payload())
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(AppMessage::MutationOutcome { mutation, result });
        });
    }

    pub fn run_action(&self, action: DaemonAction) {
        let client = self.client.clone();
        let tx = self.message_tx.clone();
        tokio::spawn(async move {
            let result = match action {
                DaemonAction::ReloadConfig => client.reload_config_file().await,
                DaemonAction::UpdateGeoDatabases => client.update_geo_databases().await,
                DaemonAction::FlushFakeIpPool => client.flush_fakeip_pool().await,
                DaemonAction::CloseAllConnections => client.close_all_connections().await,
            }
            .map_err(|e| e.to_string());
            let _ = tx.send(AppMessage::ActionOutcome { action, result });
        });
    }

    /// Rows of the config view, derived from the loaded config: port fields
    /// the daemon does not expose are not listed.
    pub fn config_items(&self) -> Vec<ConfigItem> {
        let Some(config) = &self.config else {
            return Vec::new();
        };
        let mut items = Vec::new();
        for field in PortField::ALL {
            let present = match field {
                PortField::Http => config.port.is_some(),
                PortField::Socks => config.socks_port.is_some(),
                PortField::Mixed => config.mixed_port.is_some(),
                PortField::Redir => config.redir_port.is_some(),
                PortField::Mitm => config.mitm_port.is_some(),
            };
            if present {
                items.push(ConfigItem::Port(field));
            }
        }
        items.extend([
            ConfigItem::Mode,
            ConfigItem::LogLevel,
            ConfigItem::AllowLan,
            ConfigItem::Sniffing,
            ConfigItem::TunEnable,
            ConfigItem::TunStack,
        ]);
        items.extend(
            [
                DaemonAction::ReloadConfig,
                DaemonAction::UpdateGeoDatabases,
                DaemonAction::FlushFakeIpPool,
                DaemonAction::CloseAllConnections,
            ]
            .map(ConfigItem::Action),
        );
        items
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        // An active text edit captures every key, including the global
        // bindings below.
        let editing = match self.view {
            View::Logs => self.log_search_input.is_some(),
            View::Config => self.config_cursor.input.is_some(),
            View::Connections => false,
        };
        if editing {
            match self.view {
                View::Logs => self.handle_logs_key(key),
                View::Config => self.handle_config_key(key),
                View::Connections => {}
            }
            return;
        }
        // Keys that work everywhere.
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('1') => return self.switch_view(View::Logs),
            KeyCode::Char('2') => return self.switch_view(View::Connections),
            KeyCode::Char('3') => return self.switch_view(View::Config),
            _ => {}
        }
        match self.view {
            View::Logs => self.handle_logs_key(key),
            View::Connections => self.handle_connections_key(key),
            View::Config => self.handle_config_key(key),
        }
    }

    fn handle_logs_key(&mut self, key: KeyEvent) {
        // Search edit in progress: text, backspace, commit, cancel.
        if let Some(input) = &mut self.log_search_input {
            match key.code {
                KeyCode::Char(c) => input.push(c),
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Esc => self.log_search_input = None,
                KeyCode::Enter => {
                    let input = self.log_search_input.take().unwrap_or_default();
                    self.log_search = (!input.is_empty()).then_some(input);
                    self.log_scroll = self.filtered_logs().len().saturating_sub(1);
                    self.follow_logs = true;
                }
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Char('p') => self.toggle_pause(),
            KeyCode::Char('r') => self.retry_stream(),
            KeyCode::Char('/') => {
                self.log_search_input = Some(self.log_search.clone().unwrap_or_default());
            }
            KeyCode::Esc if self.log_search.is_some() => {
                self.log_search = None;
                self.log_scroll = self.logs.len().saturating_sub(1);
                self.follow_logs = true;
            }
            KeyCode::Char('l') => {
                let levels = LogLevel::STREAM_LEVELS;
                let pos = levels.iter().position(|l| *l == self.prefs.log_level);
                let next = levels[(pos.unwrap_or(0) + 1) % levels.len()];
                self.set_log_level(next);
            }
            KeyCode::Up => {
                self.follow_logs = false;
                self.log_scroll = self.log_scroll.saturating_sub(1);
            }
            KeyCode::Down => {
                self.log_scroll = (self.log_scroll + 1).min(self.logs.len().saturating_sub(1));
            }
            KeyCode::PageUp => {
                self.follow_logs = false;
                self.log_scroll = self.log_scroll.saturating_sub(20);
            }
            KeyCode::PageDown => {
                self.log_scroll = (self.log_scroll + 20).min(self.logs.len().saturating_sub(1));
            }
            KeyCode::End => {
                self.follow_logs = true;
                self.log_scroll = self.logs.len().saturating_sub(1);
            }
            _ => {}
        }
    }

    fn handle_connections_key(&mut self, key: KeyEvent) {
        let column_count = self.table.columns().len();
        match key.code {
            KeyCode::Char('r') => self.retry_stream(),
            KeyCode::Left => {
                self.sort_cursor = self.sort_cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                self.sort_cursor = (self.sort_cursor + 1).min(column_count.saturating_sub(1));
            }
            KeyCode::Enter | KeyCode::Char('s') => {
                self.table.sort_by_index(self.sort_cursor);
            }
            _ => {}
        }
    }

    fn handle_config_key(&mut self, key: KeyEvent) {
        let items = self.config_items();
        if items.is_empty() {
            return;
        }
        // Port edit in progress: digits, backspace, commit, cancel.
        if let Some(input) = &mut self.config_cursor.input {
            match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() && input.len() < 5 => input.push(c),
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Esc => self.config_cursor.input = None,
                KeyCode::Enter => {
                    let value = self.config_cursor.input.take().unwrap_or_default();
                    if let Some(ConfigItem::Port(field)) = items.get(self.config_cursor.selected) {
                        match ConfigMutation::parse(field.wire_name(), &value) {
                            Ok(mutation) => self.dispatch_mutation(mutation),
                            Err(e) => self.notice = Some(e.to_string()),
                        }
                    }
                }
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Up => {
                self.config_cursor.selected = self.config_cursor.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                self.config_cursor.selected =
                    (self.config_cursor.selected + 1).min(items.len() - 1);
            }
            KeyCode::Enter => {
                // The list may have shrunk since the cursor last moved.
                if let Some(item) = items.get(self.config_cursor.selected) {
                    self.activate_config_item(*item);
                }
            }
            _ => {}
        }
    }

    fn activate_config_item(&mut self, item: ConfigItem) {
        let Some(config) = self.config.clone() else {
            return;
        };
        match item {
            ConfigItem::Port(field) => {
                let current = match field {
                    PortField::Http => config.port,
                    PortField::Socks => config.socks_port,
                    PortField::Mixed => config.mixed_port,
                    PortField::Redir => config.redir_port,
                    PortField::Mitm => config.mitm_port,
                };
                self.config_cursor.input =
                    Some(current.map(|p| p.to_string()).unwrap_or_default());
            }
            ConfigItem::Mode => {
                let modes = ProxyMode::ALL;
                let pos = modes.iter().position(|m| m.as_str() == config.mode);
                let next = modes[(pos.unwrap_or(0) + 1) % modes.len()];
                self.dispatch_mutation(ConfigMutation::Mode(next));
            }
            ConfigItem::LogLevel => {
                let levels = [
                    LogLevel::Debug,
                    LogLevel::Info,
                    LogLevel::Warning,
                    LogLevel::Error,
                    LogLevel::Silent,
                ];
                let pos = levels.iter().position(|l| *l == config.log_level);
                let next = levels[(pos.unwrap_or(0) + 1) % levels.len()];
                self.dispatch_mutation(ConfigMutation::LogLevel(next));
            }
            ConfigItem::AllowLan => {
                self.dispatch_mutation(ConfigMutation::AllowLan(!config.allow_lan));
            }
            ConfigItem::Sniffing => {
                self.dispatch_mutation(ConfigMutation::Sniffing(!config.sniffing));
            }
            ConfigItem::TunEnable => {
                self.dispatch_mutation(ConfigMutation::TunEnable(!config.tun.enable));
            }
            ConfigItem::TunStack => {
                let next = if config.tun.stack == "gVisor" {
                    TunStack::System
                } else {
                    TunStack::Gvisor
                };
                self.dispatch_mutation(ConfigMutation::TunStack(next));
            }
            ConfigItem::Action(action) => self.run_action(action),
        }
    }
}
