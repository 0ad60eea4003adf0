//! Shared helpers for sonar-analyzer integration tests
#![allow(dead_code)]

pub mod audio_generator;

pub use audio_generator::{click_track_wav, sine_wav, ToneConfig};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sonar_analyzer::source::{AudioFetcher, FetchError};
use sonar_analyzer::{build_router, AppState, ServiceConfig};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "sonar-test-boundary-7d3f9a";

/// Router plus the scratch directory it writes into
pub struct TestApp {
    pub router: Router,
    pub scratch: TempDir,
}

impl TestApp {
    pub fn new(fetcher: Arc<dyn AudioFetcher>) -> Self {
        Self::with_config(fetcher, |_| {})
    }

    pub fn with_config(
        fetcher: Arc<dyn AudioFetcher>,
        customize: impl FnOnce(&mut ServiceConfig),
    ) -> Self {
        let scratch = TempDir::new().unwrap();
        let mut config = ServiceConfig {
            scratch_dir: scratch.path().to_path_buf(),
            ..ServiceConfig::default()
        };
        customize(&mut config);

        let router = build_router(AppState::new(config, fetcher));
        Self { router, scratch }
    }

    /// Entries left in the scratch directory
    pub fn scratch_entries(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.scratch.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        send(self.router.clone(), request).await
    }
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// One multipart form part
pub enum Part {
    Text(&'static str, String),
    File(&'static str, &'static str, Vec<u8>),
}

pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: audio/wav\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// `POST /analyze` with a multipart body
pub fn analyze_request(parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn upload_request(bytes: Vec<u8>) -> Request<Body> {
    analyze_request(&[Part::File("audio", "track.wav", bytes)])
}

/// Decode the `spectrogram` field and check it is a PNG image
pub fn decode_spectrogram(json: &Value) -> image::DynamicImage {
    use base64::Engine as _;

    let encoded = json["spectrogram"].as_str().expect("spectrogram is a string");
    let png = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .expect("spectrogram is base64");
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    image::load_from_memory_with_format(&png, image::ImageFormat::Png).expect("valid PNG")
}

// ---------------------------------------------------------------------------
// Downloader doubles
// ---------------------------------------------------------------------------

/// Downloader that runs fine but leaves nothing behind
pub struct EmptyFetcher;

impl AudioFetcher for EmptyFetcher {
    fn fetch(&self, _url: &str, _output_dir: &Path) -> Result<Option<PathBuf>, FetchError> {
        Ok(None)
    }
}

/// Downloader that "downloads" fixed WAV bytes and remembers what it saw
pub struct FixtureFetcher {
    wav: Vec<u8>,
    pub calls: Mutex<Vec<(String, PathBuf)>>,
}

impl FixtureFetcher {
    pub fn new(wav: Vec<u8>) -> Self {
        Self {
            wav,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl AudioFetcher for FixtureFetcher {
    fn fetch(&self, url: &str, output_dir: &Path) -> Result<Option<PathBuf>, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), output_dir.to_path_buf()));
        let path = output_dir.join("Some Artist - Some Song.wav");
        std::fs::write(&path, &self.wav)?;
        Ok(Some(path))
    }
}

/// Downloader that exits nonzero
pub struct FailingFetcher;

impl AudioFetcher for FailingFetcher {
    fn fetch(&self, _url: &str, output_dir: &Path) -> Result<Option<PathBuf>, FetchError> {
        // Leave a partial file to prove the directory is still cleaned up
        std::fs::write(output_dir.join("partial.wav.part"), b"RIFF")?;
        Err(FetchError::Failed {
            command: "spotdl".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "No results found for song".to_string(),
        })
    }
}
