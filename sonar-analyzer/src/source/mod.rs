//! Audio source resolution
//!
//! Turns an [`AnalysisRequest`] into exactly one local audio file owned by
//! the request. The file lives in a fresh scratch entry (uniquely named temp
//! file for uploads, temp directory for downloads) that is deleted when the
//! returned [`ResolvedAudio`] is dropped, on every exit path.

pub mod fetcher;

pub use fetcher::{AudioFetcher, CommandFetcher, FetchError};

use axum::body::Bytes;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, TempPath};

use crate::error::{ApiError, ApiResult};

/// An uploaded file part
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// Audio input of one `/analyze` call
#[derive(Debug, Clone)]
pub enum AnalysisRequest {
    Upload(UploadedFile),
    SpotifyUrl(String),
}

impl AnalysisRequest {
    /// Pick the request variant from the submitted form fields
    ///
    /// `spotify_url` wins when both are present.
    pub fn from_fields(spotify_url: Option<String>, audio: Option<UploadedFile>) -> ApiResult<Self> {
        match (spotify_url, audio) {
            (Some(url), _) => Ok(AnalysisRequest::SpotifyUrl(url)),
            (None, Some(upload)) => Ok(AnalysisRequest::Upload(upload)),
            (None, None) => Err(ApiError::MissingInput),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisRequest::Upload(_) => "upload",
            AnalysisRequest::SpotifyUrl(_) => "spotify_url",
        }
    }
}

enum ScratchGuard {
    File(TempPath),
    Dir(TempDir),
}

/// Local audio file owned by one request; removed from disk on drop
pub struct ResolvedAudio {
    path: PathBuf,
    guard: ScratchGuard,
}

impl ResolvedAudio {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the scratch entry now, reporting failures instead of
    /// swallowing them as drop does
    pub fn close(self) -> std::io::Result<()> {
        match self.guard {
            ScratchGuard::File(path) => path.close(),
            ScratchGuard::Dir(dir) => dir.close(),
        }
    }
}

impl std::fmt::Debug for ResolvedAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedAudio").field("path", &self.path).finish()
    }
}

/// Resolve `request` to a local audio file under `scratch_dir`
pub fn resolve(
    request: AnalysisRequest,
    fetcher: &dyn AudioFetcher,
    scratch_dir: &Path,
) -> ApiResult<ResolvedAudio> {
    match request {
        AnalysisRequest::SpotifyUrl(url) => resolve_download(&url, fetcher, scratch_dir),
        AnalysisRequest::Upload(upload) => persist_upload(&upload, scratch_dir),
    }
}

fn persist_upload(upload: &UploadedFile, scratch_dir: &Path) -> ApiResult<ResolvedAudio> {
    let mut file = tempfile::Builder::new()
        .prefix("sonar-upload-")
        .suffix(".wav")
        .tempfile_in(scratch_dir)?;
    file.write_all(&upload.bytes)?;
    file.flush()?;

    let temp_path = file.into_temp_path();
    tracing::debug!(
        filename = %upload.filename,
        bytes = upload.bytes.len(),
        path = %temp_path.display(),
        "Upload persisted"
    );

    Ok(ResolvedAudio {
        path: temp_path.to_path_buf(),
        guard: ScratchGuard::File(temp_path),
    })
}

fn resolve_download(
    url: &str,
    fetcher: &dyn AudioFetcher,
    scratch_dir: &Path,
) -> ApiResult<ResolvedAudio> {
    let dir = tempfile::Builder::new()
        .prefix("sonar-download-")
        .tempdir_in(scratch_dir)?;

    let Some(candidate) = fetcher.fetch(url, dir.path())? else {
        tracing::warn!(url = %url, "Downloader produced no waveform file");
        return Err(ApiError::DownloadFailed);
    };

    let path = match validate_download(&candidate, dir.path()) {
        Ok(path) => path,
        Err(reason) => {
            tracing::warn!(
                url = %url,
                candidate = %candidate.display(),
                reason = %reason,
                "Rejected downloader output"
            );
            return Err(ApiError::DownloadFailed);
        }
    };

    Ok(ResolvedAudio {
        path,
        guard: ScratchGuard::Dir(dir),
    })
}

/// Downloader output is untrusted: it must be a non-empty regular file that
/// really lives inside the directory handed to the tool
fn validate_download(candidate: &Path, output_dir: &Path) -> Result<PathBuf, String> {
    let dir = output_dir
        .canonicalize()
        .map_err(|e| format!("output directory unavailable: {}", e))?;
    let path = candidate
        .canonicalize()
        .map_err(|e| format!("file unavailable: {}", e))?;

    if !path.starts_with(&dir) {
        return Err("file is outside the output directory".to_string());
    }

    let metadata = std::fs::metadata(&path).map_err(|e| format!("file unavailable: {}", e))?;
    if !metadata.is_file() {
        return Err("not a regular file".to_string());
    }
    if metadata.len() == 0 {
        return Err("file is empty".to_string());
    }
    Ok(path)
}
