//! Configuration model and TOML loading
//!
//! Resolution order for the config file itself:
//! 1. Explicit path (command-line argument or environment variable)
//! 2. `<config dir>/sonar/<module>.toml` if present
//! 3. Built-in defaults
//!
//! Individual settings may be overridden again by the binary's command-line
//! arguments after loading.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bootstrap configuration loaded from TOML file
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Interface the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Parent directory for per-request temporary files (OS temp dir if unset)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Optional cap on request body size; no limit when unset
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,

    /// External download tool settings
    #[serde(default)]
    pub downloader: DownloaderConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External downloader invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Executable name or path
    #[serde(default = "default_downloader_command")]
    pub command: String,

    /// Arguments appended after the standard ones
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error or a full
    /// `EnvFilter` expression); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_downloader_command() -> String {
    "spotdl".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            scratch_dir: None,
            max_upload_bytes: None,
            downloader: DownloaderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            command: default_downloader_command(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Reject values that would only fail later at bind or spawn time
    pub fn validate(&self) -> Result<()> {
        if self.bind_address.trim().is_empty() {
            return Err(Error::InvalidInput("bind_address must not be empty".to_string()));
        }
        if self.downloader.command.trim().is_empty() {
            return Err(Error::InvalidInput(
                "downloader.command must not be empty".to_string(),
            ));
        }
        if self.max_upload_bytes == Some(0) {
            return Err(Error::InvalidInput(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Platform config path for a module: `<config dir>/sonar/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sonar").join(format!("{}.toml", module_name)))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Resolve the configuration for `module_name`
///
/// An explicit path must exist. The platform default path is optional and
/// silently skipped when missing.
pub fn resolve_config(explicit_path: Option<&Path>, module_name: &str) -> Result<TomlConfig> {
    if let Some(path) = explicit_path {
        info!("Loading config from {}", path.display());
        return load_toml_config(path);
    }

    if let Some(path) = default_config_path(module_name) {
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_toml_config(&path);
        }
        debug!("No config file at {}, using defaults", path.display());
    }

    Ok(TomlConfig::default())
}
