//! Bootstrap configuration loading
//!
//! Configuration is resolved in priority order:
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables (applied by the binary through clap)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: a warning is logged and compiled
//! defaults are used. A TOML file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application name used for data and config directories
pub const APP_DIR_NAME: &str = "mango";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// SQLite database holding the settings table
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// JSON manifest consumed by the manifest discovery feed
    #[serde(default = "default_library_manifest")]
    pub library_manifest: PathBuf,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            library_manifest: default_library_manifest(),
            logging: LoggingConfig::default(),
            scan: ScanConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Discovery filter configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanConfig {
    /// Items shorter than this are not cataloged
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: u64,

    #[serde(default)]
    pub min_size_bytes: u64,

    /// Drop items whose artist tag is the scanner's unknown marker
    #[serde(default = "default_true")]
    pub hide_unknown_artist: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: default_min_duration_ms(),
            min_size_bytes: 0,
            hide_unknown_artist: true,
        }
    }
}

/// Playback state sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Sampling loop period
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// EventBus channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_min_duration_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_sample_interval_ms() -> u64 {
    100
}

fn default_event_capacity() -> usize {
    100
}

fn default_database_path() -> PathBuf {
    default_data_dir().join("mango.db")
}

fn default_library_manifest() -> PathBuf {
    default_data_dir().join("library.json")
}

/// OS-dependent data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./mango_data"))
}

/// OS-dependent default location of the TOML config file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME).join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("./mango.toml"))
}

/// Parse TOML configuration text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
}

/// Load TOML configuration, falling back to defaults when the file is absent
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let config = parse_toml_config(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.scan.min_duration_ms, 30_000);
        assert!(config.scan.hide_unknown_artist);
        assert_eq!(config.playback.sample_interval_ms, 100);
        assert!(config.database_path.ends_with("mango.db"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = parse_toml_config(
            r#"
            database_path = "/tmp/m.db"

            [scan]
            min_duration_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/m.db"));
        assert_eq!(config.scan.min_duration_ms, 0);
        assert!(config.scan.hide_unknown_artist);
        assert_eq!(config.playback, PlaybackConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = parse_toml_config("database_path = [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
