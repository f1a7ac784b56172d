//! Configuration for searchparty-core
//!
//! Centralized configuration for sampling cadence, polling cadences, heatmap
//! decay parameters and storage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::heatmap::{
    DecayCurve, ExponentialDecay, LinearDecay, DEFAULT_LIVE_INTENSITY, DEFAULT_MAX_INTENSITY,
    DEFAULT_MIN_INTENSITY,
};

/// Shortest allowed sampling interval; keeps capture timestamps well apart
/// from the store's millisecond resolution
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 1_000;

/// System-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Position sampling settings
    pub sampling: SamplingConfig,
    /// Presence polling settings
    pub presence: PresenceConfig,
    /// Heatmap aggregation settings
    pub heatmap: HeatmapConfig,
    /// Storage settings
    pub store: StoreConfig,
}

/// Sampler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Interval between samples while the party view is active
    pub interval_ms: u64,
    /// Upper bound on a single device position read
    pub acquire_timeout_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 15_000,
            acquire_timeout_ms: 10_000,
        }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

/// Presence polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub poll_interval_ms: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 15_000,
        }
    }
}

impl PresenceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Shape of the freshness curve applied to history samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecayKind {
    Linear,
    Exponential { half_life_ms: i64 },
}

impl Default for DecayKind {
    fn default() -> Self {
        DecayKind::Linear
    }
}

/// Heatmap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub poll_interval_ms: u64,
    /// Trailing window of visible history
    pub window_ms: i64,
    /// Intensity at the window boundary
    pub min_intensity: f64,
    /// Intensity of a brand-new sample
    pub max_intensity: f64,
    /// Intensity of live (self / other-live) points
    pub live_intensity: f64,
    /// Result-count ceiling for one history query
    pub history_limit: usize,
    pub decay: DecayKind,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 30_000,
            window_ms: 3_600_000,
            min_intensity: DEFAULT_MIN_INTENSITY,
            max_intensity: DEFAULT_MAX_INTENSITY,
            live_intensity: DEFAULT_LIVE_INTENSITY,
            history_limit: 5_000,
            decay: DecayKind::Linear,
        }
    }
}

impl HeatmapConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Decay window; zero (rejected by the aggregator) if out of range
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::try_milliseconds(self.window_ms).unwrap_or_else(chrono::Duration::zero)
    }

    /// Build the configured decay curve
    pub fn curve(&self) -> std::sync::Arc<dyn DecayCurve> {
        match self.decay {
            DecayKind::Linear => std::sync::Arc::new(LinearDecay {
                min: self.min_intensity,
                max: self.max_intensity,
            }),
            DecayKind::Exponential { half_life_ms } => std::sync::Arc::new(ExponentialDecay {
                min: self.min_intensity,
                max: self.max_intensity,
                half_life_ms,
            }),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path; in-memory store when unset
    pub database_path: Option<PathBuf>,
}

impl SearchConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load and validate a config file; `.json` is parsed as JSON, anything
    /// else as TOML
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&contents)?,
            _ => Self::from_toml(&contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling.interval_ms < MIN_SAMPLE_INTERVAL_MS {
            return Err(ConfigError::OutOfRange(format!(
                "sampling.interval_ms must be at least {}",
                MIN_SAMPLE_INTERVAL_MS
            )));
        }

        if self.sampling.acquire_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange(
                "sampling.acquire_timeout_ms must be positive".to_string(),
            ));
        }

        if self.presence.poll_interval_ms == 0 || self.heatmap.poll_interval_ms == 0 {
            return Err(ConfigError::OutOfRange(
                "poll intervals must be positive".to_string(),
            ));
        }

        let heatmap = &self.heatmap;
        if heatmap.window_ms <= 0 {
            return Err(ConfigError::OutOfRange(
                "heatmap.window_ms must be positive".to_string(),
            ));
        }

        for (name, value) in [
            ("min_intensity", heatmap.min_intensity),
            ("max_intensity", heatmap.max_intensity),
            ("live_intensity", heatmap.live_intensity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange(format!(
                    "heatmap.{} must be between 0.0 and 1.0",
                    name
                )));
            }
        }

        if heatmap.min_intensity >= heatmap.max_intensity {
            return Err(ConfigError::InvalidThresholds(
                "heatmap.max_intensity must be greater than min_intensity".to_string(),
            ));
        }

        if let DecayKind::Exponential { half_life_ms } = heatmap.decay {
            if half_life_ms <= 0 {
                return Err(ConfigError::OutOfRange(
                    "heatmap.decay.half_life_ms must be positive".to_string(),
                ));
            }
        }

        if heatmap.history_limit == 0 {
            return Err(ConfigError::OutOfRange(
                "heatmap.history_limit must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation error
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// Threshold values are invalid relative to each other
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),
    /// Config text could not be parsed or serialized
    #[error("Parse error: {0}")]
    Parse(String),
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sampling.interval(), Duration::from_secs(15));
        assert_eq!(config.presence.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.heatmap.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.heatmap.window(), chrono::Duration::hours(1));
    }

    #[test]
    fn test_json_serialization() {
        let config = SearchConfig::default();
        let json = config.to_json().unwrap();
        let parsed = SearchConfig::from_json(&json).unwrap();
        assert_eq!(config.heatmap.window_ms, parsed.heatmap.window_ms);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SearchConfig::from_toml(
            r#"
            [heatmap]
            window_ms = 1800000

            [heatmap.decay]
            kind = "exponential"
            half_life_ms = 600000
            "#,
        )
        .unwrap();

        assert_eq!(config.heatmap.window_ms, 1_800_000);
        assert_eq!(config.heatmap.min_intensity, 0.1);
        assert_eq!(config.sampling.interval_ms, 15_000);
        assert_eq!(
            config.heatmap.decay,
            DecayKind::Exponential {
                half_life_ms: 600_000
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sampling_interval_floor() {
        let mut config = SearchConfig::default();
        config.sampling.interval_ms = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_intensity_range() {
        let mut config = SearchConfig::default();
        config.heatmap.min_intensity = 0.8;
        config.heatmap.max_intensity = 0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds(_))
        ));

        let mut config = SearchConfig::default();
        config.heatmap.live_intensity = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("searchparty.toml");
        std::fs::write(&path, "[sampling]\ninterval_ms = 5000\n").unwrap();

        let config = SearchConfig::load(&path).unwrap();
        assert_eq!(config.sampling.interval_ms, 5_000);

        let missing = SearchConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
