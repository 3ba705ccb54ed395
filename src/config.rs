//! Configuration management
//!
//! Handles loading and validating link configuration from TOML files.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub writer: WriterSection,
    #[serde(default)]
    pub watchdog: WatchdogSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Link configuration
///
/// Transport setup itself happens outside this crate; these values are
/// handed to whatever opens the device.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Serial device the link is attached to
    #[serde(default = "default_device")]
    pub device: String,
    /// Baud rate
    #[serde(default = "default_baud")]
    pub baud: u32,
}

/// Writer loop configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WriterSection {
    /// Minimum delay between sending passes in milliseconds (unset = none)
    #[serde(default)]
    pub tick_interval_ms: Option<u64>,
}

impl WriterSection {
    pub fn tick_interval(&self) -> Option<Duration> {
        self.tick_interval_ms.map(Duration::from_millis)
    }
}

/// Watchdog configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WatchdogSection {
    /// Seconds without an accepted message before the link counts as lost
    #[serde(default = "default_watchdog_timeout")]
    pub timeout_secs: f64,
    /// Only count heartbeat frames as proof of life
    #[serde(default)]
    pub heartbeat_only: bool,
}

impl WatchdogSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_device() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud() -> u32 {
    57_600
}
fn default_watchdog_timeout() -> f64 {
    5.0
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud: default_baud(),
        }
    }
}

impl Default for WatchdogSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_watchdog_timeout(),
            heartbeat_only: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config =
            toml::from_str(&contents).with_context(|| "Failed to parse config file")?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `TELELINK_DEVICE` / `TELELINK_BAUD` environment overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(device) = std::env::var("TELELINK_DEVICE") {
            self.link.device = device;
        }
        if let Ok(baud) = std::env::var("TELELINK_BAUD") {
            if let Ok(baud) = baud.parse() {
                self.link.baud = baud;
            }
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.link.baud == 0 {
            anyhow::bail!("baud must be > 0");
        }
        if self.watchdog.timeout_secs <= 0.0 {
            anyhow::bail!("watchdog timeout_secs must be > 0");
        }
        if self.writer.tick_interval_ms == Some(0) {
            anyhow::bail!("writer tick_interval_ms must be > 0 when set");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.link.device, "/dev/ttyUSB0");
        assert_eq!(config.link.baud, 57_600);
        assert_eq!(config.watchdog.timeout(), Duration::from_secs(5));
        assert!(config.writer.tick_interval().is_none());
        assert!(!config.watchdog.heartbeat_only);
    }

    #[test]
    fn test_load_and_validate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[link]\ndevice = \"/dev/ttyACM0\"\nbaud = 115200\n\n\
             [writer]\ntick_interval_ms = 20\n\n\
             [watchdog]\ntimeout_secs = 2.5\nheartbeat_only = true\n"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.link.device, "/dev/ttyACM0");
        assert_eq!(config.link.baud, 115_200);
        assert_eq!(config.writer.tick_interval(), Some(Duration::from_millis(20)));
        assert_eq!(config.watchdog.timeout(), Duration::from_secs_f64(2.5));
        assert!(config.watchdog.heartbeat_only);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config: Config = toml::from_str("[watchdog]\ntimeout_secs = 0.0\n").unwrap();
        assert!(config.validate().is_err());
    }
}
