//! `GET /health`
//!
//! Liveness plus the pieces an operator needs to tell why analyses fail:
//! whether the scratch directory is usable and which downloader is
//! configured.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// "ok", or "degraded" when the scratch directory is unusable
    pub status: &'static str,
    pub module: &'static str,
    pub build: BuildInfo,
    pub uptime_seconds: u64,
    pub scratch: ScratchStatus,
    /// Downloader executable used for `spotify_url` requests
    pub downloader: String,
    /// `null` when uploads are unlimited
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub profile: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ScratchStatus {
    pub path: String,
    pub available: bool,
}

impl ScratchStatus {
    fn check(path: &Path) -> Self {
        Self {
            path: path.display().to_string(),
            available: path.is_dir(),
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let config = &state.config;
    let scratch = ScratchStatus::check(&config.scratch_dir);
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(HealthReport {
        status: if scratch.available { "ok" } else { "degraded" },
        module: "sonar-analyzer",
        build: BuildInfo {
            version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("SONAR_GIT_HASH"),
            profile: env!("SONAR_BUILD_PROFILE"),
        },
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        scratch,
        downloader: config.downloader.command.clone(),
        max_upload_bytes: config.max_upload_bytes,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
