//! Error types for sonar-analyzer
//!
//! `ApiError` is the single error boundary of the service: every failure in
//! the resolve → extract pipeline ends up here and is rendered as
//! `{"error": <message>}` with its status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::source::FetchError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Neither `spotify_url` nor `audio` was supplied (400)
    #[error("No audio or Spotify URL provided.")]
    MissingInput,

    /// Downloader ran but left no usable waveform file (400)
    #[error("Audio download failed.")]
    DownloadFailed,

    /// Malformed request body (400)
    #[error("{0}")]
    BadRequest(String),

    /// Body exceeds the configured upload limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Loading, analysis, rendering or downloader failure (500)
    #[error("{0}")]
    Processing(String),

    /// Scratch file I/O error (500)
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Generic error (500)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingInput | ApiError::DownloadFailed | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Processing(_) | ApiError::Io(_) | ApiError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        ApiError::Processing(err.to_string())
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        ApiError::Processing(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
