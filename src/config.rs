use serde::Deserialize;
use std::{fs, path::Path};
use tracing::level_filters::LevelFilter;

use crate::errors::ConfigError;

/// Longest key hold the sweep accepts (ten years).
pub const MAX_KEY_HOLD_SECONDS: u64 = 10 * 365 * 24 * 3600;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// HTTP port to listen on.
    pub port: u16,

    /// Log level for tracing (e.g. "info", "debug").
    pub log_level: String,

    /// Path to the snapshot JSON file.
    pub snapshot_path: String,

    /// Interval (seconds) between automatic snapshot saves.
    pub snapshot_interval: u64,

    pub server_version: String,

    /// Administrator account created at startup when the store has no admin.
    pub admin_username: String,
    pub admin_password: String,

    /// Bearer token lifetime in seconds.
    ///
    /// If `None`, tokens stay valid until logout or restart.
    #[serde(default)]
    pub token_ttl_seconds: Option<u64>,

    /// Maximum time (seconds) the lab key may stay taken before the
    /// sweep loop hands it back automatically.
    ///
    /// If `None`, the key is never reclaimed.
    #[serde(default)]
    pub key_max_hold_seconds: Option<u64>,

    /// How often (seconds) to run the key sweep.
    #[serde(default)]
    pub sweep_interval: Option<u64>,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&file)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg = serde_json::from_str::<AppConfig>(text)?;

        if cfg.snapshot_interval == 0 {
            return Err(ConfigError::Invalid(
                "snapshot_interval must be at least 1 second".to_string(),
            ));
        }
        if cfg.sweep_interval == Some(0) {
            return Err(ConfigError::Invalid(
                "sweep_interval must be at least 1 second".to_string(),
            ));
        }
        if let Some(hold) = cfg.key_max_hold_seconds {
            if hold == 0 || hold > MAX_KEY_HOLD_SECONDS {
                return Err(ConfigError::Invalid(format!(
                    "key_max_hold_seconds must be between 1 and {MAX_KEY_HOLD_SECONDS}"
                )));
            }
        }
        if cfg.admin_username.trim().is_empty() || cfg.admin_password.is_empty() {
            return Err(ConfigError::Invalid(
                "admin_username and admin_password must be set".to_string(),
            ));
        }

        Ok(cfg)
    }

    /// Map `log_level` onto a tracing filter, defaulting to INFO.
    pub fn log_filter(&self) -> LevelFilter {
        match self.log_level.to_lowercase().as_str() {
            "trace" => LevelFilter::TRACE,
            "debug" => LevelFilter::DEBUG,
            "info" => LevelFilter::INFO,
            "warn" => LevelFilter::WARN,
            "error" => LevelFilter::ERROR,
            _ => LevelFilter::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "port": 8000,
        "log_level": "DEBUG",
        "snapshot_path": "snap.json",
        "snapshot_interval": 30,
        "server_version": "1.2.3",
        "admin_username": "admin",
        "admin_password": "pw"
    }"#;

    #[test]
    fn optional_fields_default_to_none() {
        let cfg = AppConfig::from_json(SAMPLE).expect("config");
        assert_eq!(cfg.port, 8000);
        assert!(cfg.token_ttl_seconds.is_none());
        assert!(cfg.key_max_hold_seconds.is_none());
        assert!(cfg.sweep_interval.is_none());
        assert_eq!(cfg.log_filter(), LevelFilter::DEBUG);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let mut cfg = AppConfig::from_json(SAMPLE).expect("config");
        cfg.log_level = "loud".to_string();
        assert_eq!(cfg.log_filter(), LevelFilter::INFO);
    }

    #[test]
    fn zero_snapshot_interval_is_rejected() {
        let text = SAMPLE.replace("\"snapshot_interval\": 30", "\"snapshot_interval\": 0");
        assert!(matches!(
            AppConfig::from_json(&text),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn key_hold_outside_range_is_rejected() {
        for hold in ["0", "18446744073709551615", "10000000000000000"] {
            let text = SAMPLE.replace(
                "\"admin_password\": \"pw\"",
                &format!("\"admin_password\": \"pw\", \"key_max_hold_seconds\": {hold}"),
            );
            assert!(
                matches!(AppConfig::from_json(&text), Err(ConfigError::Invalid(_))),
                "hold {hold} accepted"
            );
        }

        let text = SAMPLE.replace(
            "\"admin_password\": \"pw\"",
            "\"admin_password\": \"pw\", \"key_max_hold_seconds\": 14400",
        );
        let cfg = AppConfig::from_json(&text).expect("config");
        assert_eq!(cfg.key_max_hold_seconds, Some(14400));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            AppConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
