//! Parley configuration system.
//!
//! TOML-based configuration for the realtime connection, typing presence,
//! local identity, and logging. Every section uses serde defaults so a
//! partial (or empty) file works out of the box. Secrets are usually kept
//! out of the file and supplied through the environment.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use parley_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod env;
pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use env::{apply_env_overrides, apply_overrides_from};
pub use schema::{ParleyConfig, CONFIG_SCHEMA_VERSION};

use parley_common::ConfigError;
use std::path::Path;

/// Load config from the platform default path.
///
/// Creates a default `config.toml` if none exists, applies environment
/// overrides, and validates the result.
pub fn load_config() -> Result<ParleyConfig, ConfigError> {
    let mut config = toml_loader::load_default()?;
    apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Like [`load_config`] but reads an explicit file instead of the default path.
pub fn load_config_from(path: &Path) -> Result<ParleyConfig, ConfigError> {
    let mut config = toml_loader::load_from_path(path)?;
    apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
///
/// The realtime API key is masked.
pub fn config_to_json(config: &ParleyConfig) -> String {
    let mut redacted = config.clone();
    if !redacted.realtime.api_key.is_empty() {
        redacted.realtime.api_key = "[REDACTED]".into();
    }
    serde_json::to_string_pretty(&redacted)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let config = ParleyConfig::default();
        let json = config_to_json(&config);
        assert!(json.contains("\"realtime\""));
        assert!(json.contains("\"typing\""));
        assert!(json.contains("\"identity\""));
        assert!(json.contains("\"logging\""));
        assert!(json.contains("\"typing-\""));
    }

    #[test]
    fn config_to_json_masks_api_key() {
        let mut config = ParleyConfig::default();
        config.realtime.api_key = "super-secret-anon-key".into();
        let json = config_to_json(&config);
        assert!(!json.contains("super-secret-anon-key"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let config = ParleyConfig::default();
        let json = config_to_json(&config);
        let parsed: ParleyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.typing.quiet_window_ms, 3000);
        assert_eq!(parsed.typing.channel_prefix, "typing-");
        assert_eq!(parsed.realtime.heartbeat_interval, 25);
    }

    #[test]
    fn load_config_from_applies_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[typing]
quiet_window_ms = 1500
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.typing.quiet_window_ms, 1500);
    }
}
