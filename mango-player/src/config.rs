//! Player configuration
//!
//! Resolves the bootstrap TOML from mango-common against command-line
//! overrides. Priority: command line (and its env fallbacks) > TOML file >
//! compiled defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mango_common::config::{load_toml_config, TomlConfig};
use sqlx::SqlitePool;
use tracing::info;

use crate::discovery::ScanFilter;
use crate::error::{Error, Result};

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub library_manifest: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub scan_filter: ScanFilter,
    /// Sampler period
    pub sample_interval: Duration,
    /// Event bus buffer size
    pub event_capacity: usize,
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub library_manifest: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load the TOML file at `toml_path` and apply `overrides`
    ///
    /// A missing file yields compiled defaults; an unreadable one or an
    /// invalid value is an error.
    pub fn load(toml_path: &Path, overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = load_toml_config(toml_path)?;
        Self::resolve(toml_config, overrides)
    }

    pub fn resolve(toml_config: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        if toml_config.playback.sample_interval_ms == 0 {
            return Err(Error::Config(
                "playback.sample_interval_ms must be greater than zero".to_string(),
            ));
        }

        let config = Self {
            database_path: overrides
                .database_path
                .unwrap_or(toml_config.database_path),
            library_manifest: overrides
                .library_manifest
                .unwrap_or(toml_config.library_manifest),
            log_level: overrides.log_level.unwrap_or(toml_config.logging.level),
            log_file: toml_config.logging.file,
            scan_filter: ScanFilter::from(&toml_config.scan),
            sample_interval: Duration::from_millis(toml_config.playback.sample_interval_ms),
            event_capacity: toml_config.playback.event_capacity.max(1),
        };

        info!("Database: {}", config.database_path.display());
        info!("Library manifest: {}", config.library_manifest.display());
        Ok(config)
    }

    /// Open (creating if needed) the settings database
    pub async fn open_database(&self) -> Result<SqlitePool> {
        Ok(mango_common::db::init_database(&self.database_path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mango_common::config::parse_toml_config;

    #[test]
    fn test_defaults() {
        let config = Config::resolve(TomlConfig::default(), ConfigOverrides::default()).unwrap();
        assert_eq!(config.sample_interval, Duration::from_millis(100));
        assert_eq!(config.scan_filter.min_duration_ms, 30_000);
        assert!(config.scan_filter.hide_unknown_artist);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides_win_over_toml() {
        let toml_config = parse_toml_config(
            r#"
            database_path = "/tmp/from_toml.db"
            library_manifest = "/tmp/from_toml.json"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        let overrides = ConfigOverrides {
            database_path: Some(PathBuf::from("/tmp/from_cli.db")),
            ..Default::default()
        };

        let config = Config::resolve(toml_config, overrides).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/from_cli.db"));
        assert_eq!(config.library_manifest, PathBuf::from("/tmp/from_toml.json"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_zero_sample_interval_rejected() {
        let toml_config = parse_toml_config("[playback]\nsample_interval_ms = 0\n").unwrap();
        assert!(matches!(
            Config::resolve(toml_config, ConfigOverrides::default()),
            Err(Error::Config(_))
        ));
    }
}
