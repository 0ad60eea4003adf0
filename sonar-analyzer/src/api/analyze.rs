//! POST /analyze
//!
//! Accepts a multipart form carrying either `spotify_url` (text) or `audio`
//! (file part) and answers with the extracted features:
//!
//! ```json
//! {"duration": 12.5, "bpm": 120.2, "key": "A", "spectrogram": "iVBORw0KGgo..."}
//! ```
//!
//! Every failure goes through [`ApiError`] and comes back as
//! `{"error": <message>}`.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::analysis::FeatureResult;
use crate::error::{ApiError, ApiResult};
use crate::pipeline;
use crate::source::{AnalysisRequest, UploadedFile};
use crate::AppState;

/// Successful analysis response
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    /// Seconds
    pub duration: f64,
    pub bpm: f64,
    /// Pitch class label, e.g. "C#"
    pub key: String,
    /// Base64 (standard alphabet, padded) PNG
    pub spectrogram: String,
}

impl From<FeatureResult> for AnalysisResponse {
    fn from(result: FeatureResult) -> Self {
        Self {
            duration: result.duration,
            bpm: result.bpm,
            key: result.key.label().to_string(),
            spectrogram: general_purpose::STANDARD.encode(&result.spectrogram_png),
        }
    }
}

/// Recognized form fields; the first occurrence of each wins
#[derive(Debug, Default)]
struct AnalysisForm {
    spotify_url: Option<String>,
    audio: Option<UploadedFile>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    let message = err.body_text();
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::BadRequest(message)
    }
}

async fn read_form(mut multipart: Multipart) -> ApiResult<AnalysisForm> {
    let mut form = AnalysisForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "spotify_url" if form.spotify_url.is_none() => {
                form.spotify_url = Some(field.text().await.map_err(multipart_error)?);
            }
            // Only file parts count as uploads
            "audio" if form.audio.is_none() && field.file_name().is_some() => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.audio = Some(UploadedFile { filename, bytes });
            }
            _ => {
                tracing::debug!(field = %name, "Ignoring form field");
            }
        }
    }

    Ok(form)
}

/// **POST /analyze**
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<AnalysisResponse>> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("analyze", %request_id);

    // A body that is not multipart at all carries no fields
    let form = match multipart {
        Ok(multipart) => read_form(multipart).instrument(span.clone()).await?,
        Err(rejection) => {
            span.in_scope(|| tracing::debug!(reason = %rejection, "Request has no multipart body"));
            AnalysisForm::default()
        }
    };

    let request = AnalysisRequest::from_fields(form.spotify_url, form.audio)?;
    let fetcher = state.fetcher.clone();
    let scratch_dir = state.config.scratch_dir.clone();

    let features = tokio::task::spawn_blocking(move || {
        span.in_scope(|| pipeline::run_analysis(request, fetcher.as_ref(), &scratch_dir))
    })
    .await
    .map_err(|e| ApiError::Processing(format!("Analysis worker failed: {}", e)))??;

    Ok(Json(AnalysisResponse::from(features)))
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PitchClass;

    #[test]
    fn test_response_encodes_png_as_base64() {
        let result = FeatureResult {
            duration: 1.5,
            bpm: 0.0,
            key: PitchClass::from_index(1).unwrap(),
            spectrogram_png: vec![0x89, b'P', b'N', b'G'],
        };
        let response = AnalysisResponse::from(result);

        assert_eq!(response.key, "C#");
        assert_eq!(response.spectrogram, "iVBORw==");

        let json = serde_json::to_value(&response).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["bpm", "duration", "key", "spectrogram"]);
    }
}
