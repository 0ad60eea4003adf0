//! Resolve → extract pipeline for one request
//!
//! Runs synchronously on a blocking worker thread. The resolved scratch
//! entry is released before the result is handed back, whether extraction
//! succeeded or not.

use std::path::Path;

use crate::analysis::{self, FeatureResult};
use crate::error::ApiResult;
use crate::source::{self, AnalysisRequest, AudioFetcher};

/// Resolve the request's audio, extract its features, then clean up
pub fn run_analysis(
    request: AnalysisRequest,
    fetcher: &dyn AudioFetcher,
    scratch_dir: &Path,
) -> ApiResult<FeatureResult> {
    tracing::info!(source = request.kind(), "Resolving audio source");
    let resolved = source::resolve(request, fetcher, scratch_dir)?;

    let result = analysis::extract_features(resolved.path());

    let path = resolved.path().to_path_buf();
    if let Err(e) = resolved.close() {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove scratch audio");
    }

    Ok(result?)
}
