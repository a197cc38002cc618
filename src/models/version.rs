//! Daemon version info, as returned by `GET /version`.

use serde::Deserialize;

/// Daemon version and edition flags.
///
/// Older daemons return a bare `{"version": "..."}`; `plus_pro` is never sent
/// on the wire, it is derived from the version string after fetch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub premium: bool,
    #[serde(skip)]
    pub plus_pro: bool,
}

impl Version {
    /// Fill in defaults and derived fields after deserialization (or when the
    /// daemon gave no usable answer at all).
    pub fn normalized(mut self) -> Self {
        if self.version.is_empty() {
            self.version = "v1.0.0".to_string();
        }
        self.plus_pro = self.version.contains("PlusPro");
        self
    }
}

impl Default for Version {
    fn default() -> Self {
        Version {
            version: String::new(),
            premium: false,
            plus_pro: false,
        }
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_version_gets_defaults() {
        let v = Version::default();
        assert_eq!(v.version, "v1.0.0");
        assert!(!v.premium);
        assert!(!v.plus_pro);
    }

    #[test]
    fn plus_pro_derived_by_substring() {
        let v: Version = serde_json::from_str(r#"{"version":"1.9.0-PlusPro"}"#).unwrap();
        let v = v.normalized();
        assert!(v.plus_pro);

        let v: Version = serde_json::from_str(r#"{"version":"1.9.0","premium":true}"#).unwrap();
        let v = v.normalized();
        assert!(!v.plus_pro);
        assert!(v.premium);
    }
}
