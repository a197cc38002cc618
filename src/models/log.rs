//! Log stream types.
//!
//! The daemon's `/logs` endpoint emits newline-delimited JSON objects of the
//! form `{"type":"info","payload":"..."}`. `LogLine` is that wire shape;
//! `LogEvent` is the retained form with identity and capture time attached by
//! the event buffer.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Severity of a log line.
///
/// `Silent` is only meaningful as a daemon config value (it disables logging);
/// the stream endpoints never emit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Silent,
}

impl LogLevel {
    /// Levels selectable as a stream filter, in ascending severity.
    pub const STREAM_LEVELS: [LogLevel; 4] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
    ];

    /// The value sent in the `level` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Silent => "silent",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded record from the log stream, before identity is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogLine {
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub payload: String,
}

/// A retained log event with stable identity.
///
/// `id` is assigned by the event buffer in arrival order and is never reused,
/// even after eviction or `clear()`. `time` is the capture time on our side,
/// not a daemon timestamp. `even` is display parity derived from `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub id: u64,
    pub time: DateTime<Local>,
    pub level: LogLevel,
    pub payload: String,
    pub even: bool,
}
