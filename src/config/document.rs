//! Serde model of the persisted configuration document.
//!
//! The document is the source of truth across restarts:
//!
//! ```json
//! {
//!   "wifi":    {"ssid": "...", "password": "..."},
//!   "server":  {"port": 80},
//!   "leds":    {"<id>": {"pin": 2, "color": "...", "location": "...", "type": "led"}},
//!   "motors":  {"<id>": {"pin_on": 4, "pin_dir": 5, "type": "...", "location": "..."}},
//!   "sensors": {"<id>": {"pin": 26, "type": "...", "location": "...", "unit": "...",
//!                        "adc": true, "config": {"type": "linear", "params": {...}}}}
//! }
//! ```
//!
//! Parsing is the library's job; per-entry validation (which produces
//! entry/field-precise errors) lives in the helpers below and in
//! [`BoundConfiguration::bind`](super::BoundConfiguration::bind).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// WiFi credentials, consumed once by network bring-up. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
}

/// HTTP listener settings for the external server layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    80
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Top-level document. Sections are optional at parse time so the loader
/// can report which required section is absent instead of a parse error.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Document {
    pub wifi: Option<WifiConfig>,
    pub server: Option<ServerConfig>,
    pub leds: Option<Map<String, Value>>,
    pub sensors: Option<Map<String, Value>>,
    pub motors: Option<Map<String, Value>>,
}

// ── Per-entry field extraction ────────────────────────────────

pub(crate) fn require_str(
    entry: &Value,
    id: &str,
    field: &'static str,
) -> Result<String, ConfigError> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ConfigError::InvalidField {
            entry: id.to_owned(),
            field,
        })
}

/// Pin fields must be integers in the GPIO range.
pub(crate) fn require_pin(
    entry: &Value,
    id: &str,
    field: &'static str,
) -> Result<u8, ConfigError> {
    entry
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| ConfigError::InvalidField {
            entry: id.to_owned(),
            field,
        })
}

pub(crate) fn optional_bool(entry: &Value, field: &str) -> bool {
    entry.get(field).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_port_defaults_to_80() {
        let server: ServerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(server.port, 80);
        let server: ServerConfig = serde_json::from_str(r#"{"port": 8080}"#).unwrap();
        assert_eq!(server.port, 8080);
    }

    #[test]
    fn absent_sections_parse_as_none() {
        let doc: Document = serde_json::from_str(r#"{"wifi": {"ssid": "s", "password": "p"}}"#)
            .unwrap();
        assert!(doc.wifi.is_some());
        assert!(doc.sensors.is_none());
        assert!(doc.motors.is_none());
    }

    #[test]
    fn pin_fields_reject_non_integers() {
        let entry = serde_json::json!({"pin": "26"});
        let err = require_pin(&entry, "roof_light", "pin").unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidField {
                entry: "roof_light".into(),
                field: "pin",
            }
        );
    }
}
