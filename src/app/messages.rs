//! Messages delivered to the app from spawned API tasks.

use crate::models::{ConfigSnapshot, Version};
use crate::mutation::ConfigMutation;

/// One-shot daemon actions available from the config view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonAction {
    ReloadConfig,
    UpdateGeoDatabases,
    FlushFakeIpPool,
    CloseAllConnections,
}

impl DaemonAction {
    pub fn label(&self) -> &'static str {
        match self {
            DaemonAction::ReloadConfig => "Reload config file",
            DaemonAction::UpdateGeoDatabases => "Update GEO databases",
            DaemonAction::FlushFakeIpPool => "Flush fake-IP pool",
            DaemonAction::CloseAllConnections => "Close all connections",
        }
    }
}

/// Results of async one-shot calls, sent back over the app's message bus.
#[derive(Debug)]
pub enum AppMessage {
    ConfigFetched(Result<ConfigSnapshot, String>),
    VersionFetched(Version),
    MutationOutcome {
        mutation: ConfigMutation,
        result: Result<(), String>,
    },
    ActionOutcome {
        action: DaemonAction,
        result: Result<(), String>,
    },
}
