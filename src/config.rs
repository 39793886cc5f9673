//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section is optional; missing sections and fields take their defaults.
//! Per-profile tuning (deadzone, speeds, repeat timing) lives in the mapping
//! file, not here.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::reconnect::ReconnectPolicy;
use crate::engine::worker::LoopSettings;
use crate::error::{PadBridgeError, Result};
use crate::mapping::calibration::CalibrationOptions;
use crate::mapping::capture::CaptureOptions;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub mapping: MappingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Controller selection
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct DeviceConfig {
    /// Empty means auto-detect
    #[serde(default)]
    pub device_path: String,
}

/// Translation loop timing
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    #[serde(default = "default_reconnect_warn_after_s")]
    pub reconnect_warn_after_s: u64,

    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

/// Mapping file and interactive capture
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MappingConfig {
    #[serde(default = "default_mapping_path")]
    pub path: String,

    #[serde(default = "default_capture_threshold")]
    pub capture_threshold: f32,

    /// 0 waits forever
    #[serde(default)]
    pub calibration_step_timeout_s: u64,
}

/// Log output
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Empty means console only
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_tick_ms() -> u64 { 10 }
fn default_reconnect_interval_ms() -> u64 { 500 }
fn default_reconnect_warn_after_s() -> u64 { 10 }
fn default_stop_timeout_ms() -> u64 { 1000 }

fn default_mapping_path() -> String { "pad-bridge-mapping.json".to_string() }
fn default_capture_threshold() -> f32 { 0.75 }

fn default_log_level() -> String { "info".to_string() }

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            reconnect_warn_after_s: default_reconnect_warn_after_s(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            path: default_mapping_path(),
            capture_threshold: default_capture_threshold(),
            calibration_step_timeout_s: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> PadBridgeError {
    PadBridgeError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pad_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate timing fields
        if self.runtime.tick_ms == 0 || self.runtime.tick_ms > 100 {
            return Err(invalid("tick_ms must be between 1 and 100"));
        }

        if self.runtime.reconnect_interval_ms < 10 || self.runtime.reconnect_interval_ms > 10000 {
            return Err(invalid("reconnect_interval_ms must be between 10 and 10000"));
        }

        if self.runtime.reconnect_warn_after_s == 0 {
            return Err(invalid("reconnect_warn_after_s must be greater than 0"));
        }

        if self.runtime.stop_timeout_ms < 10 || self.runtime.stop_timeout_ms > 60000 {
            return Err(invalid("stop_timeout_ms must be between 10 and 60000"));
        }

        // Validate mapping
        if self.mapping.path.is_empty() {
            return Err(invalid("mapping path cannot be empty"));
        }

        if !(0.1..=1.0).contains(&self.mapping.capture_threshold) {
            return Err(invalid("capture_threshold must be between 0.1 and 1.0"));
        }

        // Validate logging
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "log level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Configured controller node, `None` to auto-detect.
    pub fn device_path(&self) -> Option<PathBuf> {
        match self.device.device_path.trim() {
            "" => None,
            path => Some(PathBuf::from(path)),
        }
    }

    pub fn mapping_path(&self) -> PathBuf {
        PathBuf::from(&self.mapping.path)
    }

    /// Directory for the rolling log file, `None` for console only.
    pub fn log_dir(&self) -> Option<PathBuf> {
        match self.logging.log_dir.trim() {
            "" => None,
            dir => Some(PathBuf::from(dir)),
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.runtime.tick_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.runtime.stop_timeout_ms)
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            tick: self.tick(),
            reconnect: ReconnectPolicy {
                interval: Duration::from_millis(self.runtime.reconnect_interval_ms),
                warn_after: Duration::from_secs(self.runtime.reconnect_warn_after_s),
            },
        }
    }

    fn step_timeout(&self) -> Option<Duration> {
        match self.mapping.calibration_step_timeout_s {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Calibration polling with the profile's `deadzone`.
    pub fn calibration_options(&self, deadzone: f32) -> CalibrationOptions {
        CalibrationOptions {
            deadzone,
            tick: self.tick(),
            step_timeout: self.step_timeout(),
        }
    }

    /// Capture polling; shares the calibration step timeout.
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            threshold: self.mapping.capture_threshold,
            tick: self.tick(),
            timeout: self.step_timeout(),
        }
    }
}
