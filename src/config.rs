//! Configuration using Figment
//!
//! Configuration is layered from:
//! 1. `config/roi_scope.toml` (or a path given on the command line)
//! 2. Environment variables prefixed with `ROI_SCOPE_`, nested keys separated
//!    by a double underscore (`ROI_SCOPE_APPLICATION__LOG_LEVEL=debug`)
//!
//! Every section has defaults, so an empty or missing file yields a usable
//! configuration. Call [`ScopeConfig::validate`] after loading.
//!
//! # Example
//! ```no_run
//! use roi_scope::config::ScopeConfig;
//!
//! let config = ScopeConfig::load()?;
//! config.validate()?;
//! println!("Application: {}", config.application.name);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use roi_camera::MockCameraConfig;
use roi_core::UnitConversion;
use serde::{Deserialize, Serialize};

use crate::telemetry::LogFormat;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/roi_scope.toml";

/// Largest size accepted for the source region, in pixels.
pub const MAX_SOURCE_SIZE: u32 = 400;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Camera and capture settings
    #[serde(default)]
    pub camera: CameraConfig,
    /// Initial region placement
    #[serde(default)]
    pub regions: RegionsConfig,
    /// Measurement settings
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Frames buffered for slow subscribers
    #[serde(default = "default_capture_buffer")]
    pub capture_buffer: usize,
    /// Mock camera driver table, see [`MockCameraConfig`]
    #[serde(default = "empty_table")]
    pub mock: toml::Value,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            capture_buffer: default_capture_buffer(),
            mock: empty_table(),
        }
    }
}

impl CameraConfig {
    /// Parse the mock driver table.
    pub fn mock_config(&self) -> Result<MockCameraConfig, String> {
        MockCameraConfig::from_toml(&self.mock).map_err(|e| e.to_string())
    }
}

/// Region placement when a frame is loaded
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegionsConfig {
    /// Source circle diameter in pixels
    #[serde(default = "default_source_size")]
    pub source_size: f64,
    /// Background square side in pixels
    #[serde(default = "default_background_size")]
    pub background_size: f64,
}

impl Default for RegionsConfig {
    fn default() -> Self {
        Self {
            source_size: default_source_size(),
            background_size: default_background_size(),
        }
    }
}

/// Measurement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Unit transform for displayed quantities
    #[serde(default)]
    pub units: UnitConversion,
    /// Record net counts for plotting
    #[serde(default)]
    pub plot_net: bool,
    /// Number of net count samples kept for plotting
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            units: UnitConversion::default(),
            plot_net: false,
            history_capacity: default_history_capacity(),
        }
    }
}

// Default value functions
fn default_name() -> String {
    "ROI Scope".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_capture_buffer() -> usize {
    16
}

fn empty_table() -> toml::Value {
    toml::Value::Table(toml::map::Map::new())
}

fn default_source_size() -> f64 {
    100.0
}

fn default_background_size() -> f64 {
    300.0
}

fn default_history_capacity() -> usize {
    500
}

impl ScopeConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file path and the environment.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ROI_SCOPE_").split("__"))
            .extract()
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.camera.capture_buffer == 0 {
            return Err("camera.capture_buffer must be at least 1".to_string());
        }
        self.camera.mock_config()?;

        let source = self.regions.source_size;
        if !source.is_finite() || !(0.0..=MAX_SOURCE_SIZE as f64).contains(&source) {
            return Err(format!(
                "Invalid regions.source_size {source}. Must be 0-{MAX_SOURCE_SIZE}"
            ));
        }
        let background = self.regions.background_size;
        if !background.is_finite() || background <= 0.0 {
            return Err(format!(
                "Invalid regions.background_size {background}. Must be positive"
            ));
        }

        self.analysis.units.validate().map_err(|e| e.to_string())?;
        if self.analysis.history_capacity == 0 {
            return Err("analysis.history_capacity must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ScopeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.regions.source_size, 100.0);
        assert_eq!(config.regions.background_size, 300.0);
        assert_eq!(config.camera.mock_config().unwrap(), MockCameraConfig::default());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = ScopeConfig::default();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.application.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn source_size_is_bounded() {
        let mut config = ScopeConfig::default();
        config.regions.source_size = 401.0;
        assert!(config.validate().is_err());
        config.regions.source_size = f64::NAN;
        assert!(config.validate().is_err());
        config.regions.source_size = 400.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rate_mode_needs_exposure() {
        let mut config = ScopeConfig::default();
        config.analysis.units.per_second = true;
        config.analysis.units.exposure_s = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_mock_table_is_reported() {
        let mut config = ScopeConfig::default();
        config.camera.mock = toml::from_str("width = 0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("resolution"));
    }
}
