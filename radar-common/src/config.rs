//! Configuration management for Market Radar.
//!
//! The configuration lives at `~/.market-radar/config.json`. Every field has
//! a default, so a missing file yields a working two-universe setup
//! (crypto + US stocks).
//!
//! # Configuration Priority
//!
//! 1. Environment variables (RADAR_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `RADAR_LOG_LEVEL` → observability.log_level
//! - `RADAR_LOG_FORMAT` → observability.log_format
//! - `RADAR_DATA_DIR` → data.snapshot_dir

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".market-radar"),
        |dirs| dirs.home_dir().join(".market-radar"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// JSON Schema reference
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Snapshot source configuration
    #[serde(default)]
    pub data: DataConfig,

    /// Instrument universes to screen
    #[serde(default = "default_universes")]
    pub universes: Vec<UniverseConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: None,
            observability: ObservabilityConfig::default(),
            data: DataConfig::default(),
            universes: default_universes(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("RADAR_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("RADAR_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Ok(dir) = std::env::var("RADAR_DATA_DIR") {
            self.data.snapshot_dir = dir;
        }
    }

    /// Look up a universe by name (case-insensitive).
    pub fn universe(&self, name: &str) -> Option<&UniverseConfig> {
        self.universes
            .iter()
            .find(|u| u.name.eq_ignore_ascii_case(name))
    }

    /// Resolve the snapshot directory, expanding `~`.
    pub fn snapshot_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.data.snapshot_dir);
        PathBuf::from(expanded.as_ref())
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Data Configuration
// ============================================================================

/// Where snapshots come from and how often they are refreshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding one JSON snapshot file per universe
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,

    /// Seconds between pipeline runs in watch mode
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

fn default_snapshot_dir() -> String {
    "~/.market-radar/snapshots".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    60
}

// ============================================================================
// Universe Configuration
// ============================================================================

/// One instrument universe and its screener overrides.
///
/// Unset screener fields fall back to the defaults of the universe's
/// scoring profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// Universe name (e.g., "crypto")
    pub name: String,

    /// Snapshot file name, relative to `data.snapshot_dir`
    pub source: String,

    /// Scoring profile: "ranked" or "unranked"
    #[serde(default)]
    pub profile: Option<String>,

    /// Source cache time-to-live in seconds
    #[serde(default)]
    pub cache_ttl_secs: Option<i64>,

    /// Maximum momentum rows shown in reports
    #[serde(default)]
    pub display_limit: Option<usize>,

    /// Exclusive volume floor
    #[serde(default)]
    pub min_volume: Option<f64>,

    /// Inclusive change floor (%)
    #[serde(default)]
    pub min_change: Option<f64>,

    /// Number of k-means clusters
    #[serde(default)]
    pub cluster_count: Option<usize>,

    /// Minimum candidates before clustering runs
    #[serde(default)]
    pub min_cluster_sample: Option<usize>,

    /// Seed for k-means initialization
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Number of k-means restarts
    #[serde(default)]
    pub n_init: Option<usize>,

    /// Iteration cap per restart
    #[serde(default)]
    pub max_iterations: Option<usize>,

    /// Enables threshold alerts when set
    #[serde(default)]
    pub alert_min_score: Option<f64>,

    /// Score weight overrides
    #[serde(default)]
    pub weights: Option<WeightsConfig>,
}

/// Score weight overrides. Missing weights keep the profile default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeightsConfig {
    #[serde(default)]
    pub change: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub rank: Option<f64>,
}

fn default_universes() -> Vec<UniverseConfig> {
    vec![
        UniverseConfig {
            name: "crypto".to_string(),
            source: "crypto.json".to_string(),
            profile: Some("ranked".to_string()),
            cache_ttl_secs: Some(120),
            display_limit: Some(10),
            min_volume: Some(50_000_000.0),
            min_change: Some(2.0),
            ..Default::default()
        },
        UniverseConfig {
            name: "us_stocks".to_string(),
            source: "us_stocks.json".to_string(),
            profile: Some("unranked".to_string()),
            cache_ttl_secs: Some(300),
            min_volume: Some(0.0),
            min_change: Some(-100.0),
            ..Default::default()
        },
    ]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.observability.log_format, "pretty");
        assert_eq!(config.data.refresh_interval_secs, 60);
        assert_eq!(config.universes.len(), 2);

        let crypto = config.universe("CRYPTO").unwrap();
        assert_eq!(crypto.profile.as_deref(), Some("ranked"));
        assert_eq!(crypto.cache_ttl_secs, Some(120));
        assert_eq!(crypto.min_volume, Some(50_000_000.0));

        let stocks = config.universe("us_stocks").unwrap();
        assert_eq!(stocks.profile.as_deref(), Some("unranked"));
        assert_eq!(stocks.cache_ttl_secs, Some(300));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{ "observability": { "level": "debug" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "pretty");
        assert_eq!(config.universes.len(), 2);
    }

    #[test]
    fn test_universe_overrides_parse() {
        let json = r#"{
            "universes": [{
                "name": "alts",
                "source": "alts.json",
                "profile": "ranked",
                "min_change": 5.5,
                "alert_min_score": 40,
                "weights": { "volume": 20 }
            }]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.universes.len(), 1);
        let alts = &config.universes[0];
        assert_eq!(alts.min_change, Some(5.5));
        assert_eq!(alts.alert_min_score, Some(40.0));
        assert!(alts.min_volume.is_none());
        let weights = alts.weights.as_ref().unwrap();
        assert_eq!(weights.volume, Some(20.0));
        assert!(weights.change.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "data": { "refresh_interval_secs": 15 } }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.data.refresh_interval_secs, 15);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "data": { "snapshot_dir": "/from/file" } }"#).unwrap();

        std::env::set_var("RADAR_DATA_DIR", "/from/env");
        let config = Config::load_with_env(Some(&path));
        std::env::remove_var("RADAR_DATA_DIR");

        assert_eq!(config.unwrap().data.snapshot_dir, "/from/env");
    }

    #[test]
    fn test_load_from_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
