//! Domain and wire types shared across the crate.

pub mod config;
pub mod connection;
pub mod log;
pub mod version;

pub use config::{ConfigSnapshot, TunConfig};
pub use connection::{ConnectionRecord, ConnectionsFrame, ConnectionsSnapshot};
pub use log::{LogEvent, LogLevel, LogLine};
pub use version::Version;
