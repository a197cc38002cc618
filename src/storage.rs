//! Persisted user preferences.
//!
//! A single JSON blob under the platform data dir. Writes go through a
//! throttle so a burst of mutations costs at most one write per interval;
//! persistence is best-effort by contract, a dropped or delayed write is
//! acceptable. The pause gate lives here because it is the one piece of
//! session state that must survive a restart.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use color_eyre::{eyre::eyre, eyre::WrapErr, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::LogLevel;

/// Minimum spacing between persistence writes.
pub const SAVE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefs {
    /// Daemon API base URL.
    pub base_url: String,
    /// Optional API secret (bearer token).
    pub secret: Option<String>,
    /// Minimum severity for the log stream.
    pub log_level: LogLevel,
    /// The pause gate: while true no log stream connection is attempted.
    pub log_streaming_paused: bool,
}

impl Default for Prefs {
    fn default() -> Self {
        Prefs {
            base_url: "http://127.0.0.1:9090".to_string(),
            secret: None,
            log_level: LogLevel::Info,
            log_streaming_paused: false,
        }
    }
}

/// Resolve (and create) the application data directory.
pub fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().ok_or_else(|| eyre!("no data directory on this platform"))?;
    let dir = base.join("proxyscope");
    if !dir.exists() {
        fs::create_dir_all(&dir).wrap_err("Failed to create data directory")?;
    }
    Ok(dir)
}

pub fn prefs_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("prefs.json"))
}

/// Load preferences, falling back to defaults when the file is missing or
/// unreadable (a corrupt prefs file must never prevent startup).
pub fn load_prefs(path: &PathBuf) -> Prefs {
    match fs::read_to_string(path) {
        Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!(error = %e, "prefs file corrupt, using defaults");
            Prefs::default()
        }),
        Err(_) => Prefs::default(),
    }
}

pub fn save_prefs(path: &PathBuf, prefs: &Prefs) -> Result<()> {
    let json = serde_json::to_string_pretty(prefs).wrap_err("Failed to serialize prefs")?;
    fs::write(path, json).wrap_err(format!("Failed to write prefs to {:?}", path))?;
    Ok(())
}

/// Coalesces preference writes to at most one per [`SAVE_INTERVAL`].
///
/// `request_save` either writes immediately (interval elapsed) or marks the
/// state dirty; `tick` performs the deferred write once due. Both are lossy on
/// error by design.
pub struct ThrottledSaver {
    path: PathBuf,
    interval: Duration,
    last_write: Option<Instant>,
    pending: Option<Prefs>,
}

impl ThrottledSaver {
    pub fn new(path: PathBuf) -> Self {
        Self::with_interval(path, SAVE_INTERVAL)
    }

    pub fn with_interval(path: PathBuf, interval: Duration) -> Self {
        ThrottledSaver {
            path,
            interval,
            last_write: None,
            pending: None,
        }
    }

    pub fn request_save(&mut self, prefs: &Prefs) {
        let due = self
            .last_write
            .map(|t| t.elapsed() >= self.interval)
            .unwrap_or(true);
        if due {
            self.write(prefs.clone());
        } else {
            self.pending = Some(prefs.clone());
        }
    }

    /// Flush a deferred save once the interval has elapsed.
    pub fn tick(&mut self) {
        let due = self
            .last_write
            .map(|t| t.elapsed() >= self.interval)
            .unwrap_or(true);
        if due {
            if let Some(prefs) = self.pending.take() {
                self.write(prefs);
            }
        }
    }

    /// Write any pending state immediately, ignoring the throttle. Used on
    /// shutdown.
    pub fn flush(&mut self) {
        if let Some(prefs) = self.pending.take() {
            self.write(prefs);
        }
    }

    fn write(&mut self, prefs: Prefs) {
        if let Err(e) = save_prefs(&self.path, &prefs) {
            warn!(error = %e, "prefs save failed");
        }
        self.last_write = Some(Instant::now());
        self.pending = None;
    }
}
