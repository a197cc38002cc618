//! Daemon general configuration, as returned by `GET /configs`.

use serde::{Deserialize, Serialize};

use super::LogLevel;

/// The daemon's general configuration.
///
/// Port fields are optional because daemons omit ports they are not listening
/// on; the config view only shows the fields that are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConfigSnapshot {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(rename = "socks-port", default)]
    pub socks_port: Option<u16>,
    #[serde(rename = "mixed-port", default)]
    pub mixed_port: Option<u16>,
    #[serde(rename = "redir-port", default)]
    pub redir_port: Option<u16>,
    #[serde(rename = "mitm-port", default)]
    pub mitm_port: Option<u16>,
    #[serde(default)]
    pub mode: String,
    #[serde(rename = "log-level", default)]
    pub log_level: LogLevel,
    #[serde(rename = "allow-lan", default)]
    pub allow_lan: bool,
    #[serde(default)]
    pub sniffing: bool,
    #[serde(default)]
    pub tun: TunConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TunConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub stack: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserializes_kebab_case_fields() {
        let cfg: ConfigSnapshot = serde_json::from_str(
            r#"{
                "port": 7890,
                "socks-port": 7891,
                "mode": "rule",
                "log-level": "warning",
                "allow-lan": true,
                "tun": {"enable": true, "stack": "gVisor"}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.port, Some(7890));
        assert_eq!(cfg.socks_port, Some(7891));
        assert_eq!(cfg.mixed_port, None);
        assert_eq!(cfg.log_level, LogLevel::Warning);
        assert!(cfg.allow_lan);
        assert!(cfg.tun.enable);
        assert_eq!(cfg.tun.stack, "gVisor");
    }

    #[test]
    fn config_round_trips_field_names() {
        let cfg = ConfigSnapshot {
            socks_port: Some(1080),
            ..Default::default()
        };
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["socks-port"], 1080);
        assert_eq!(json["log-level"], "info");
    }
}
