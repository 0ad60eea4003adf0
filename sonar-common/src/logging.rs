//! Tracing subscriber setup shared by all sonar binaries

use crate::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (usually the
/// `[logging] level` value from the TOML config) is used.
pub fn init_tracing(default_directive: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|e| {
            Error::Config(format!("Invalid log directive '{}': {}", default_directive, e))
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))
}
