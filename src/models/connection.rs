//! Connection stream types.
//!
//! The daemon's `/connections` endpoint delivers full snapshots, not deltas:
//! every frame carries the complete set of currently-open connections, and a
//! connection that closed is simply absent from the next frame.

use serde::Deserialize;

/// One frame from the `/connections` stream, as sent by the daemon.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionsFrame {
    #[serde(default)]
    pub download_total: u64,
    #[serde(default)]
    pub upload_total: u64,
    /// `null` when the daemon has no open connections.
    #[serde(default)]
    pub connections: Option<Vec<ConnectionItem>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionItem {
    pub id: String,
    pub metadata: ConnectionMeta,
    #[serde(default)]
    pub download: u64,
    #[serde(default)]
    pub upload: u64,
    pub start: String,
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default)]
    pub rule: String,
    /// Absent on daemons predating rule groups.
    #[serde(default)]
    pub rule_payload: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMeta {
    #[serde(default)]
    pub network: String,
    #[serde(rename = "type", default)]
    pub conn_type: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub source_ip: String,
    #[serde(default)]
    pub source_port: String,
    #[serde(default)]
    pub destination_ip: String,
    #[serde(default)]
    pub destination_port: String,
    /// Absent on platforms without process attribution.
    #[serde(default)]
    pub process_path: Option<String>,
}

/// A connection row as held by the app, with client-derived speeds.
///
/// `download`/`upload` are cumulative and non-decreasing within a connection's
/// lifetime; `download_speed`/`upload_speed` are instantaneous rates computed
/// from the delta between successive snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRecord {
    pub id: String,
    pub host: String,
    pub process_path: Option<String>,
    pub download: u64,
    pub upload: u64,
    pub download_speed: u64,
    pub upload_speed: u64,
    pub chains: Vec<String>,
    pub rule: String,
    pub rule_group: Option<String>,
    pub start: String,
    pub source: String,
    pub destination_ip: String,
    pub conn_type: String,
}

impl ConnectionRecord {
    /// Build a record from a wire item, with speeds relative to the previous
    /// snapshot's cumulative counters (zero when the connection is new).
    pub fn from_item(item: ConnectionItem, prev: Option<(u64, u64)>) -> Self {
        let (prev_dl, prev_ul) = prev.unwrap_or((item.download, item.upload));
        let host = if item.metadata.host.is_empty() {
            item.metadata.destination_ip.clone()
        } else {
            item.metadata.host.clone()
        };
        ConnectionRecord {
            id: item.id,
            host: format!("{}:{}", host, item.metadata.destination_port),
            process_path: item.metadata.process_path,
            download: item.download,
            upload: item.upload,
            download_speed: item.download.saturating_sub(prev_dl),
            upload_speed: item.upload.saturating_sub(prev_ul),
            chains: item.chains,
            rule: item.rule,
            rule_group: item.rule_payload,
            start: item.start,
            source: format!("{}:{}", item.metadata.source_ip, item.metadata.source_port),
            destination_ip: item.metadata.destination_ip,
            conn_type: format!("{}({})", item.metadata.conn_type, item.metadata.network),
        }
    }
}

/// A fully-applied snapshot: the complete current connection set plus totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionsSnapshot {
    pub download_total: u64,
    pub upload_total: u64,
    pub connections: Vec<ConnectionRecord>,
}
