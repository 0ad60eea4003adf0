//! sonar-analyzer library interface
//!
//! Exposes the router and its building blocks for the binary and for
//! integration testing.

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod source;

pub use crate::config::ServiceConfig;
pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::source::AudioFetcher;

/// Application state shared across handlers
///
/// Immutable after construction; handlers share it read-only.
#[derive(Clone)]
pub struct AppState {
    /// Resolved service configuration
    pub config: Arc<ServiceConfig>,
    /// Downloader used for `spotify_url` requests
    pub fetcher: Arc<dyn AudioFetcher>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServiceConfig, fetcher: Arc<dyn AudioFetcher>) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// CORS is open to every origin on every path. Request bodies are unlimited
/// unless `max_upload_bytes` is configured.
pub fn build_router(state: AppState) -> Router {
    let body_limit = match state.config.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .merge(api::analyze_routes())
        .merge(api::health_routes())
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
