//! Config mutations as a closed tagged type.
//!
//! Every recognized edit of the daemon config is one variant here; a field
//! name that reaches the boundary without a matching variant is rejected
//! immediately as a caller bug instead of being silently accepted. The app
//! applies a mutation optimistically, keeps the pre-mutation snapshot, and
//! rolls back if the daemon rejects the PATCH.

use serde_json::json;
use thiserror::Error;

use crate::models::{ConfigSnapshot, LogLevel};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MutationError {
    /// Contract violation: the caller dispatched a field this type does not
    /// model. Fatal for the operation, never defaulted.
    #[error("unknown config field: {0}")]
    UnknownField(String),
    #[error("invalid value {value:?} for {field}")]
    InvalidValue { field: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortField {
    Http,
    Socks,
    Mixed,
    Redir,
    Mitm,
}

impl PortField {
    pub fn wire_name(&self) -> &'static str {
        match self {
            PortField::Http => "port",
            PortField::Socks => "socks-port",
            PortField::Mixed => "mixed-port",
            PortField::Redir => "redir-port",
            PortField::Mitm => "mitm-port",
        }
    }

    pub const ALL: [PortField; 5] = [
        PortField::Http,
        PortField::Socks,
        PortField::Mixed,
        PortField::Redir,
        PortField::Mitm,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    Direct,
    Rule,
    Script,
    Global,
}

impl ProxyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMode::Direct => "direct",
            ProxyMode::Rule => "rule",
            ProxyMode::Script => "script",
            ProxyMode::Global => "global",
        }
    }

    pub const ALL: [ProxyMode; 4] = [
        ProxyMode::Direct,
        ProxyMode::Rule,
        ProxyMode::Script,
        ProxyMode::Global,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunStack {
    Gvisor,
    System,
}

impl TunStack {
    pub fn as_str(&self) -> &'static str {
        match self {
            TunStack::Gvisor => "gVisor",
            TunStack::System => "System",
        }
    }
}

/// One recognized config edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMutation {
    Port(PortField, u16),
    Mode(ProxyMode),
    LogLevel(LogLevel),
    AllowLan(bool),
    Sniffing(bool),
    TunEnable(bool),
    TunStack(TunStack),
}

impl ConfigMutation {
    /// Parse a (field, value) pair at the dispatch boundary. Unknown field
    /// names and out-of-domain values are errors, not defaults.
    pub fn parse(field: &str, value: &str) -> Result<Self, MutationError> {
        let invalid = || MutationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };
        match field {
            "port" | "socks-port" | "mixed-port" | "redir-port" | "mitm-port" => {
                let port_field = match field {
                    "port" => PortField::Http,
                    "socks-port" => PortField::Socks,
                    "mixed-port" => PortField::Mixed,
                    "redir-port" => PortField::Redir,
                    _ => PortField::Mitm,
                };
                let port: u16 = value.parse().map_err(|_| invalid())?;
                Ok(ConfigMutation::Port(port_field, port))
            }
            "mode" => match value.to_ascii_lowercase().as_str() {
                "direct" => Ok(ConfigMutation::Mode(ProxyMode::Direct)),
                "rule" => Ok(ConfigMutation::Mode(ProxyMode::Rule)),
                "script" => Ok(ConfigMutation::Mode(ProxyMode::Script)),
                "global" => Ok(ConfigMutation::Mode(ProxyMode::Global)),
                _ => Err(invalid()),
            },
            "log-level" => match value {
                "debug" => Ok(ConfigMutation::LogLevel(LogLevel::Debug)),
                "info" => Ok(ConfigMutation::LogLevel(LogLevel::Info)),
                "warning" => Ok(ConfigMutation::LogLevel(LogLevel::Warning)),
                "error" => Ok(ConfigMutation::LogLevel(LogLevel::Error)),
                "silent" => Ok(ConfigMutation::LogLevel(LogLevel::Silent)),
                _ => Err(invalid()),
            },
            "allow-lan" => parse_bool(value).map(ConfigMutation::AllowLan).ok_or_else(invalid),
            "sniffing" => parse_bool(value).map(ConfigMutation::Sniffing).ok_or_else(invalid),
            "enable" => parse_bool(value).map(ConfigMutation::TunEnable).ok_or_else(invalid),
            "stack" => match value {
                "gVisor" => Ok(ConfigMutation::TunStack(TunStack::Gvisor)),
                "System" => Ok(ConfigMutation::TunStack(TunStack::System)),
                _ => Err(invalid()),
            },
            other => Err(MutationError::UnknownField(other.to_string())),
        }
    }

    /// The partial config transmitted to the daemon. TUN fields nest under
    /// `tun`, everything else is top-level.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            ConfigMutation::Port(field, port) => json!({ field.wire_name(): port }),
            ConfigMutation::Mode(mode) => json!({ "mode": mode.as_str() }),
            ConfigMutation::LogLevel(level) => json!({ "log-level": level.as_str() }),
            ConfigMutation::AllowLan(v) => json!({ "allow-lan": v }),
            ConfigMutation::Sniffing(v) => json!({ "sniffing": v }),
            ConfigMutation::TunEnable(v) => json!({ "tun": { "enable": v } }),
            ConfigMutation::TunStack(stack) => json!({ "tun": { "stack": stack.as_str() } }),
        }
    }

    /// TUN-mode changes force-close open connections after a successful PATCH
    /// so stale routed connections do not linger.
    pub fn affects_tun(&self) -> bool {
        matches!(self, ConfigMutation::TunEnable(_) | ConfigMutation::TunStack(_))
    }

    /// Optimistic local application, before the daemon confirms.
    pub fn apply(&self, cfg: &mut ConfigSnapshot) {
        match self {
            ConfigMutation::Port(PortField::Http, p) => cfg.port = Some(*p),
            ConfigMutation::Port(PortField::Socks, p) => cfg.socks_port = Some(*p),
            ConfigMutation::Port(PortField::Mixed, p) => cfg.mixed_port = Some(*p),
            ConfigMutation::Port(PortField::Redir, p) => cfg.redir_port = Some(*p),
            ConfigMutation::Port(PortField::Mitm, p) => cfg.mitm_port = Some(*p),
            ConfigMutation::Mode(mode) => cfg.mode = mode.as_str().to_string(),
            ConfigMutation::LogLevel(level) => cfg.log_level = *level,
            ConfigMutation::AllowLan(v) => cfg.allow_lan = *v,
            ConfigMutation::Sniffing(v) => cfg.sniffing = *v,
            ConfigMutation::TunEnable(v) => cfg.tun.enable = *v,
            ConfigMutation::TunStack(stack) => cfg.tun.stack = stack.as_str().to_string(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_field_is_rejected_not_defaulted() {
        let err = ConfigMutation::parse("latencyTestUrl", "http://x").unwrap_err();
        assert_eq!(err, MutationError::UnknownField("latencyTestUrl".to_string()));
    }

    #[test]
    fn port_values_are_range_checked_by_type() {
        assert_eq!(
            ConfigMutation::parse("socks-port", "1080"),
            Ok(ConfigMutation::Port(PortField::Socks, 1080))
        );
        assert!(ConfigMutation::parse("socks-port", "65536").is_err());
        assert!(ConfigMutation::parse("socks-port", "-1").is_err());
        assert!(ConfigMutation::parse("socks-port", "not a port").is_err());
    }

    #[test]
    fn tun_fields_nest_in_payload() {
        let payload = ConfigMutation::TunEnable(true).payload();
        assert_eq!(payload, serde_json::json!({ "tun": { "enable": true } }));
        let payload = ConfigMutation::TunStack(TunStack::Gvisor).payload();
        assert_eq!(payload, serde_json::json!({ "tun": { "stack": "gVisor" } }));
    }

    #[test]
    fn only_tun_mutations_trigger_connection_close() {
        assert!(ConfigMutation::TunEnable(false).affects_tun());
        assert!(ConfigMutation::TunStack(TunStack::System).affects_tun());
        assert!(!ConfigMutation::AllowLan(true).affects_tun());
        assert!(!ConfigMutation::Port(PortField::Http, 7890).affects_tun());
    }

    #[test]
    fn apply_mutates_the_snapshot_optimistically() {
        let mut cfg = ConfigSnapshot::default();
        ConfigMutation::parse("allow-lan", "true").unwrap().apply(&mut cfg);
        assert!(cfg.allow_lan);
        ConfigMutation::parse("mode", "Global").unwrap().apply(&mut cfg);
        assert_eq!(cfg.mode, "global");
        ConfigMutation::parse("stack", "System").unwrap().apply(&mut cfg);
        assert_eq!(cfg.tun.stack, "System");
    }

    #[test]
    fn mode_parse_is_case_insensitive_but_closed() {
        assert!(ConfigMutation::parse("mode", "Rule").is_ok());
        assert!(ConfigMutation::parse("mode", "tunnel").is_err());
    }
}
