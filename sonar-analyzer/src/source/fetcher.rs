//! Downloader collaborator
//!
//! Resolves a music-service URL to a local waveform file by running an
//! external command-line tool (`spotdl` by default):
//!
//! ```text
//! <command> <url> --output <dir> --format wav [extra args...]
//! ```
//!
//! The tool names its output itself, so the result is the first `.wav` file
//! found in the output directory afterwards.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use sonar_common::config::DownloaderConfig;

/// Longest stderr excerpt carried in an error message
const STDERR_EXCERPT_CHARS: usize = 500;

/// Downloader errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Downloader binary not found in PATH
    #[error("Downloader '{0}' not found")]
    NotFound(String),

    /// Failed to spawn the downloader
    #[error("Failed to run downloader '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Downloader exited unsuccessfully
    #[error("Downloader '{command}' exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// Output directory could not be listed
    #[error("Failed to read downloader output: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can turn a URL into a local `.wav` file
///
/// Implementations run synchronously on the calling (blocking) thread.
pub trait AudioFetcher: Send + Sync {
    /// Download `url` into `output_dir`
    ///
    /// Returns `Ok(None)` when the download ran but left no waveform file.
    fn fetch(&self, url: &str, output_dir: &Path) -> Result<Option<PathBuf>, FetchError>;
}

/// Runs an external downloader command
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    command: String,
    extra_args: Vec<String>,
}

impl CommandFetcher {
    pub fn new(command: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            extra_args,
        }
    }

    pub fn from_config(config: &DownloaderConfig) -> Self {
        Self::new(config.command.clone(), config.extra_args.clone())
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Check whether the command can be spawned at all
    pub fn is_available(&self) -> bool {
        Command::new(&self.command).arg("--version").output().is_ok()
    }
}

impl AudioFetcher for CommandFetcher {
    fn fetch(&self, url: &str, output_dir: &Path) -> Result<Option<PathBuf>, FetchError> {
        tracing::info!(
            command = %self.command,
            url = %url,
            output_dir = %output_dir.display(),
            "Running downloader"
        );

        let output = Command::new(&self.command)
            .arg(url)
            .arg("--output")
            .arg(output_dir)
            .arg("--format")
            .arg("wav")
            .args(&self.extra_args)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FetchError::NotFound(self.command.clone()),
                _ => FetchError::Spawn {
                    command: self.command.clone(),
                    source: e,
                },
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_CHARS).collect();
            return Err(FetchError::Failed {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: excerpt,
            });
        }

        let found = find_first_wav(output_dir)?;
        tracing::debug!(
            output_dir = %output_dir.display(),
            found = ?found,
            "Downloader finished"
        );
        Ok(found)
    }
}

/// First `.wav` entry of `dir` by file name, if any
pub fn find_first_wav(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().ends_with(".wav") {
            candidates.push(entry.path());
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}
