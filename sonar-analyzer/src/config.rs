//! Service configuration for sonar-analyzer
//!
//! **Priority:** command line / environment → TOML file → built-in defaults.
//! The TOML layer is handled by `sonar_common::config`; this module applies
//! the command-line overrides on top and produces the explicit
//! [`ServiceConfig`] handed to the router.

use sonar_common::config::{DownloaderConfig, TomlConfig};
use sonar_common::Result;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Settings given on the command line (or their `SONAR_*` env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub scratch_dir: Option<PathBuf>,
    pub max_upload_bytes: Option<usize>,
    pub downloader_command: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved configuration of one server instance
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    /// Parent directory of every per-request scratch entry
    pub scratch_dir: PathBuf,
    /// `None` disables the body size limit
    pub max_upload_bytes: Option<usize>,
    pub downloader: DownloaderConfig,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default())
    }
}

impl ServiceConfig {
    pub fn from_toml(toml: TomlConfig) -> Self {
        Self {
            bind_address: toml.bind_address,
            port: toml.port,
            scratch_dir: toml.scratch_dir.unwrap_or_else(std::env::temp_dir),
            max_upload_bytes: toml.max_upload_bytes,
            downloader: toml.downloader,
            log_level: toml.logging.level,
        }
    }

    /// Apply `overrides` on top of `toml`, validate, and resolve defaults
    pub fn resolve(mut toml: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(bind_address) = overrides.bind_address {
            toml.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            toml.port = port;
        }
        if let Some(scratch_dir) = overrides.scratch_dir {
            toml.scratch_dir = Some(scratch_dir);
        }
        if let Some(limit) = overrides.max_upload_bytes {
            toml.max_upload_bytes = Some(limit);
        }
        if let Some(command) = overrides.downloader_command {
            toml.downloader.command = command;
        }
        if let Some(level) = overrides.log_level {
            toml.logging.level = level;
        }

        toml.validate()?;
        Ok(Self::from_toml(toml))
    }

    /// Address the HTTP listener binds to
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                sonar_common::Error::Config(format!(
                    "Invalid bind address {}:{}: {}",
                    self.bind_address, self.port, e
                ))
            })
    }
}
