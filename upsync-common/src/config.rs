//! Configuration loading and config file resolution
//!
//! One `ClientConfig` is built at startup and handed to every component.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (`UPSYNC_*`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "UPSYNC_CONFIG";

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoints: EndpointConfig,
    pub sync: SyncConfig,
    pub submission: SubmissionConfig,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

/// Remote endpoint URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// List endpoint (`GET`)
    pub data: String,
    /// Record-creation endpoint (`POST` JSON)
    pub submit: String,
    /// Upload endpoint prefix; the upload id is appended as a path segment
    pub upload: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            data: "http://localhost:3000/data".to_string(),
            submit: "http://localhost:3000/submit".to_string(),
            upload: "http://localhost:3000/upload".to_string(),
        }
    }
}

/// Background synchronization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Gates both the interval timer and the refresh-signal listener
    pub auto_sync: bool,
    /// Interval between scheduled refreshes
    pub interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            interval_ms: 10_000,
        }
    }
}

/// Submission behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Append the submitted record locally instead of re-downloading the list
    pub append_on_success: bool,
    /// Client-side validation of candidates before any network call
    pub validation_enabled: bool,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            append_on_success: true,
            validation_enabled: true,
        }
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Per-request timeout; `None` leaves requests unbounded
    pub timeout_ms: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_endpoint: Option<String>,
    pub submit_endpoint: Option<String>,
    pub upload_endpoint: Option<String>,
    pub auto_sync: Option<bool>,
    pub sync_interval_ms: Option<u64>,
    pub append_on_success: Option<bool>,
    pub validation_enabled: Option<bool>,
    pub log_level: Option<String>,
}

impl ClientConfig {
    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from a file, or defaults when no file is found
    ///
    /// An explicitly named file (argument or `UPSYNC_CONFIG`) must exist.
    /// The platform default file is optional. Values are not validated here
    /// so command-line and environment overrides can still correct them.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (config, source) = Self::load_with_source(explicit)?;
        log_source(source.as_deref());
        Ok(config)
    }

    /// Like [`ClientConfig::load`], but returns the file used instead of logging it
    pub fn load_with_source(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match resolve_config_path(explicit) {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|source| Error::Io {
                    path: path.clone(),
                    source,
                })?;
                let config = Self::from_toml_str(&content)?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Apply command-line / environment overrides on top of file values
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.data_endpoint {
            self.endpoints.data = url;
        }
        if let Some(url) = overrides.submit_endpoint {
            self.endpoints.submit = url;
        }
        if let Some(url) = overrides.upload_endpoint {
            self.endpoints.upload = url;
        }
        if let Some(enabled) = overrides.auto_sync {
            self.sync.auto_sync = enabled;
        }
        if let Some(interval) = overrides.sync_interval_ms {
            self.sync.interval_ms = interval;
        }
        if let Some(append) = overrides.append_on_success {
            self.submission.append_on_success = append;
        }
        if let Some(enabled) = overrides.validation_enabled {
            self.submission.validation_enabled = enabled;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<()> {
        for (key, url) in [
            ("endpoints.data", &self.endpoints.data),
            ("endpoints.submit", &self.endpoints.submit),
            ("endpoints.upload", &self.endpoints.upload),
        ] {
            if url.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", key)));
            }
        }
        if self.sync.interval_ms == 0 {
            return Err(Error::Config("sync.interval_ms must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Report where the configuration came from
pub fn log_source(source: Option<&Path>) {
    match source {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => warn!("No config file found, using built-in defaults"),
    }
}

/// Config file resolution:
/// 1. Explicit path argument
/// 2. `UPSYNC_CONFIG` environment variable
/// 3. `<config_dir>/upsync/config.toml`, only if it exists
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|path| path.exists())
}

/// Platform config file location, e.g. `~/.config/upsync/config.toml` on Linux
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("upsync").join("config.toml"))
}
