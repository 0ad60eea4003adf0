//! sonar-analyzer - audio feature analysis microservice
//!
//! Serves `POST /analyze`: upload an audio file (or name a Spotify URL) and
//! get back duration, tempo, key and a spectrogram image as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use sonar_analyzer::config::{ConfigOverrides, ServiceConfig};
use sonar_analyzer::source::CommandFetcher;
use sonar_analyzer::{build_router, AppState};

/// Command-line arguments for sonar-analyzer
#[derive(Parser, Debug)]
#[command(name = "sonar-analyzer")]
#[command(about = "Audio feature analysis microservice")]
#[command(version)]
struct Args {
    /// TOML config file (default: <config dir>/sonar/sonar-analyzer.toml)
    #[arg(short, long, env = "SONAR_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long, env = "SONAR_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SONAR_PORT")]
    port: Option<u16>,

    /// Parent directory for per-request temporary files
    #[arg(long, env = "SONAR_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Reject request bodies larger than this many bytes
    #[arg(long, env = "SONAR_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<usize>,

    /// Downloader executable for Spotify URLs
    #[arg(long, env = "SONAR_DOWNLOADER")]
    downloader: Option<String>,

    /// Default log filter (RUST_LOG still wins)
    #[arg(long, env = "SONAR_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_address: self.bind_address.clone(),
            port: self.port,
            scratch_dir: self.scratch_dir.clone(),
            max_upload_bytes: self.max_upload_bytes,
            downloader_command: self.downloader.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml = sonar_common::config::resolve_config(args.config.as_deref(), "sonar-analyzer")
        .context("Failed to load configuration")?;
    let config = ServiceConfig::resolve(toml, args.overrides())
        .context("Invalid configuration")?;

    sonar_common::logging::init_tracing(&config.log_level)?;

    info!(
        "Starting sonar-analyzer v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("SONAR_GIT_HASH"),
        env!("SONAR_BUILD_TIMESTAMP"),
        env!("SONAR_BUILD_PROFILE")
    );

    std::fs::create_dir_all(&config.scratch_dir).with_context(|| {
        format!("Failed to create scratch directory {}", config.scratch_dir.display())
    })?;
    info!("Scratch directory: {}", config.scratch_dir.display());
    match config.max_upload_bytes {
        Some(limit) => info!("Upload limit: {} bytes", limit),
        None => info!("Upload limit: none"),
    }

    let fetcher = CommandFetcher::from_config(&config.downloader);
    if fetcher.is_available() {
        info!("Downloader: {}", fetcher.command());
    } else {
        warn!(
            "Downloader '{}' not found; spotify_url requests will fail",
            fetcher.command()
        );
    }

    let addr = config.socket_addr()?;
    let state = AppState::new(config, Arc::new(fetcher));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
