//! Engine configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```json
//! { "sample_rate": 48000, "rom_path": "/sdcard/roms", "endless_loop": true }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spectrum::DEFAULT_SPECTRUM_SIZE;

/// Output rate used unless configured otherwise.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config is not valid JSON for [`EngineConfig`].
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings the engine starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Secondary directory searched for ROMs and banks.
    pub rom_path: Option<PathBuf>,
    /// Loop forever instead of ending.
    pub endless_loop: bool,
    /// Playback speed multiplier.
    pub playback_speed: f64,
    /// Samples kept for spectrum analysis (power of two).
    pub spectrum_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            rom_path: None,
            endless_loop: false,
            playback_speed: 1.0,
            spectrum_size: DEFAULT_SPECTRUM_SIZE,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".into()));
        }
        if !self.playback_speed.is_finite() || self.playback_speed <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "playback_speed must be a positive number, got {}",
                self.playback_speed
            )));
        }
        if self.spectrum_size == 0 || !self.spectrum_size.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "spectrum_size must be a power of two, got {}",
                self.spectrum_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.rom_path, None);
        assert!(!config.endless_loop);
        assert_eq!(config.playback_speed, 1.0);
        assert_eq!(config.spectrum_size, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "sample_rate": 48000, "rom_path": "/roms" }"#).unwrap();
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.rom_path, Some(PathBuf::from("/roms")));
        assert_eq!(config.spectrum_size, DEFAULT_SPECTRUM_SIZE);
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn rejects_out_of_range_values() {
        for json in [
            r#"{ "sample_rate": 0 }"#,
            r#"{ "playback_speed": 0.0 }"#,
            r#"{ "playback_speed": -1.5 }"#,
            r#"{ "spectrum_size": 1000 }"#,
        ] {
            assert!(
                matches!(EngineConfig::from_json_str(json), Err(ConfigError::Invalid(_))),
                "{json}"
            );
        }
    }

    #[test]
    fn reports_parse_and_io_errors() {
        assert!(matches!(
            EngineConfig::from_json_str("{ sample_rate: }"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_file("/definitely/not/here.json"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        let config = EngineConfig {
            endless_loop: true,
            playback_speed: 1.25,
            ..EngineConfig::default()
        };
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(EngineConfig::from_json_file(&path).unwrap(), config);
    }
}
