//! Configuration for the fsbrowse navigation engine.
//!
//! TOML-based configuration loading and saving. The default configuration
//! path is `~/.config/fsbrowse/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_usb_slots must be between 1 and 64, got {0}")]
    InvalidMaxUsbSlots(u32),

    #[error("poll_period_secs must be at least 1, got {0}")]
    InvalidPollPeriod(u64),

    #[error("usb_mount_template must contain the slot placeholder {{n}}, got {0}")]
    InvalidUsbMountTemplate(String),

    #[error("at least one standard location must be configured")]
    NoStandardLocations,

    #[error("default_location {0:?} does not name a configured location")]
    UnknownDefaultLocation(String),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the navigation engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Browsing behavior.
    pub browse: BrowseConfig,

    /// Access policy flags.
    pub access: AccessConfig,

    /// Engine-level settings.
    pub engine: EngineConfig,

    /// Standard locations seeded into the registry at startup.
    #[serde(default = "default_locations")]
    pub locations: Vec<LocationEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browse: BrowseConfig::default(),
            access: AccessConfig::default(),
            engine: EngineConfig::default(),
            locations: default_locations(),
        }
    }
}

/// Browsing behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowseConfig {
    /// Start path in wire form (alias or absolute).
    pub start_path: String,

    /// Name of the location used as fallback root.
    pub default_location: String,

    /// Highest USB slot index probed each cycle.
    pub max_usb_slots: u32,

    /// Reconciliation period in seconds.
    pub poll_period_secs: u64,

    /// Mount root template for USB slots; `{n}` is the slot index.
    pub usb_mount_template: String,
}

/// Access policy flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AccessConfig {
    /// Allow browsing outside the registered locations.
    pub full_filesystem: bool,

    /// Allow browsing network-mounted drives.
    pub network_drives: bool,
}

/// Engine-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Application anchor that relative standard-location paths are
    /// rewritten against.
    pub app_root: PathBuf,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// One configured standard location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocationEntry {
    /// Unique browse key.
    pub name: String,

    /// Root path; relative paths are anchored at `engine.app_root`.
    pub path: String,

    /// Localization key for the display label.
    pub display_key: String,

    /// Fallback display label.
    pub display_value: String,

    /// Locale tag for the display label; may be empty.
    pub locale: String,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            start_path: "%ProjectDir%".to_string(),
            default_location: "ProjectDir".to_string(),
            max_usb_slots: 5,
            poll_period_secs: 5,
            usb_mount_template: "/media/usb{n}".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_root: default_app_root(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for LocationEntry {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: String::new(),
            display_key: String::new(),
            display_value: String::new(),
            locale: String::new(),
        }
    }
}

impl LocationEntry {
    /// Creates a standard location entry.
    pub fn new(name: &str, path: &str, display_key: &str, display_value: &str, locale: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            display_key: display_key.to_string(),
            display_value: display_value.to_string(),
            locale: locale.to_string(),
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fsbrowse")
        .join("config.toml")
}

/// Returns the default application anchor directory.
fn default_app_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fsbrowse")
}

/// Returns the default standard locations seeded when none are configured.
pub fn default_locations() -> Vec<LocationEntry> {
    vec![
        LocationEntry::new("AppDir", "", "Location_AppDir", "Application", "en-US"),
        LocationEntry::new("ProjectDir", "project", "Location_ProjectDir", "Project", "en-US"),
    ]
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - FSBROWSE_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - FSBROWSE_START_PATH: Override the start path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("FSBROWSE_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.engine.log_level = level;
            }
        }

        if let Ok(start) = std::env::var("FSBROWSE_START_PATH") {
            if !start.is_empty() {
                tracing::info!("Overriding start_path from environment: {}", start);
                self.browse.start_path = start;
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.browse.max_usb_slots < 1 || self.browse.max_usb_slots > 64 {
            return Err(ConfigError::InvalidMaxUsbSlots(self.browse.max_usb_slots));
        }

        if self.browse.poll_period_secs < 1 {
            return Err(ConfigError::InvalidPollPeriod(self.browse.poll_period_secs));
        }

        if !self.browse.usb_mount_template.contains("{n}") {
            return Err(ConfigError::InvalidUsbMountTemplate(
                self.browse.usb_mount_template.clone(),
            ));
        }

        if self.locations.is_empty() {
            return Err(ConfigError::NoStandardLocations);
        }

        if !self
            .locations
            .iter()
            .any(|entry| entry.name == self.browse.default_location)
        {
            return Err(ConfigError::UnknownDefaultLocation(
                self.browse.default_location.clone(),
            ));
        }

        let level = self.engine.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.engine.log_level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", e.message()))
    }

    /// Save configuration to a file, creating parent directories if needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.browse.start_path, "%ProjectDir%");
        assert_eq!(config.browse.default_location, "ProjectDir");
        assert_eq!(config.browse.max_usb_slots, 5);
        assert_eq!(config.browse.poll_period_secs, 5);
        assert!(!config.access.full_filesystem);
        assert!(!config.access.network_drives);
        assert_eq!(config.engine.log_level, "info");
    }

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_default_locations_seeded() {
        let config = Config::default();
        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.locations[0].name, "AppDir");
        assert_eq!(config.locations[1].name, "ProjectDir");
    }

    #[test]
    fn test_explicit_empty_locations_rejected() {
        let config = Config::from_toml("locations = []").unwrap();
        assert_eq!(config.validate(), Err(ConfigError::NoStandardLocations));
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[browse]
max_usb_slots = 3

[access]
full_filesystem = true
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.browse.max_usb_slots, 3);
        assert!(config.access.full_filesystem);
        assert_eq!(config.browse.poll_period_secs, 5);
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[browse]
start_path = "%Data%/logs"
default_location = "Data"
max_usb_slots = 8
poll_period_secs = 2
usb_mount_template = "/run/media/usb{n}"

[access]
full_filesystem = true
network_drives = true

[engine]
app_root = "/srv/app"
log_level = "debug"

[[locations]]
name = "Data"
path = "/var/data"
display_key = "Location_Data"
display_value = "Data"
locale = "en-US"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.browse.start_path, "%Data%/logs");
        assert_eq!(config.browse.max_usb_slots, 8);
        assert_eq!(config.browse.usb_mount_template, "/run/media/usb{n}");
        assert!(config.access.network_drives);
        assert_eq!(config.engine.app_root, PathBuf::from("/srv/app"));
        assert_eq!(config.locations.len(), 1);
        assert_eq!(config.locations[0].name, "Data");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let result = Config::from_toml("[browse\nmax_usb_slots = 3");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_roundtrip() {
        let mut original = Config::default();
        original.browse.max_usb_slots = 7;
        original.access.network_drives = true;
        original.locations = default_locations();

        let toml = original.to_toml().unwrap();
        let loaded = Config::from_toml(&toml).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_missing_file() {
        let config = Config::load("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.engine.log_level = "debug".to_string();
        original.save(&config_path).unwrap();

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_validate_max_usb_slots_bounds() {
        let mut config = Config::default();

        config.browse.max_usb_slots = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxUsbSlots(0)));

        config.browse.max_usb_slots = 65;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxUsbSlots(65)));

        config.browse.max_usb_slots = 1;
        assert!(config.validate().is_ok());
        config.browse.max_usb_slots = 64;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_poll_period() {
        let mut config = Config::default();
        config.browse.poll_period_secs = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidPollPeriod(0)));
    }

    #[test]
    fn test_validate_usb_mount_template() {
        let mut config = Config::default();
        config.browse.usb_mount_template = "/media/usb".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidUsbMountTemplate("/media/usb".to_string()))
        );
    }

    #[test]
    fn test_validate_unknown_default_location() {
        let mut config = Config::default();
        config.browse.default_location = "Nowhere".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownDefaultLocation("Nowhere".to_string()))
        );
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();

        config.engine.log_level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );

        config.engine.log_level = "WARN".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_override_log_level() {
        std::env::set_var("FSBROWSE_LOG_LEVEL", "trace");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.engine.log_level, "trace");

        std::env::remove_var("FSBROWSE_LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_env_override_start_path() {
        std::env::set_var("FSBROWSE_START_PATH", "%AppDir%/demo");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.browse.start_path, "%AppDir%/demo");

        std::env::remove_var("FSBROWSE_START_PATH");
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        std::env::set_var("FSBROWSE_LOG_LEVEL", "");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.engine.log_level, "info");

        std::env::remove_var("FSBROWSE_LOG_LEVEL");
    }
}
