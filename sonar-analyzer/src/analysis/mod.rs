//! Feature extraction
//!
//! Decodes an audio file and derives the features reported by `POST /analyze`:
//! duration, a single tempo estimate, the dominant pitch class and a rendered
//! spectrogram PNG.

pub mod chroma;
pub mod decoder;
mod glyphs;
pub mod render;
pub mod stft;
pub mod tempo;

pub use chroma::{dominant_pitch_class, mean_chroma, PitchClass, PITCH_CLASS_LABELS};
pub use decoder::{decode_audio_file, DecodedAudio};
pub use stft::Spectrogram;

use std::path::Path;
use thiserror::Error;

/// Feature extraction errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Audio file could not be opened
    #[error("Failed to open audio file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Container format not recognized
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Container has no decodable audio track
    #[error("No audio track found in file")]
    NoAudioTrack,

    /// Track does not declare a usable sample rate
    #[error("Sample rate unknown or zero")]
    InvalidSampleRate,

    /// Codec or packet level failure
    #[error("Audio decoding failed: {0}")]
    Decode(String),

    /// Decoding produced no samples
    #[error("Audio file contains no samples")]
    EmptySignal,

    /// PNG rendering or encoding failed
    #[error("Spectrogram rendering failed: {0}")]
    Render(String),
}

/// Features of one audio file
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureResult {
    /// Length in seconds
    pub duration: f64,
    /// Tempo estimate in beats per minute (0.0 when no pulse was found)
    pub bpm: f64,
    /// Pitch class with the highest mean chroma energy
    pub key: PitchClass,
    /// Rendered spectrogram, PNG encoded
    pub spectrogram_png: Vec<u8>,
}

/// Decode `path` at its native sample rate and extract all features
pub fn extract_features(path: &Path) -> Result<FeatureResult, AnalysisError> {
    let audio = decode_audio_file(path)?;
    analyze_samples(&audio.samples, audio.sample_rate)
}

/// Extract features from mono samples
pub fn analyze_samples(samples: &[f32], sample_rate: u32) -> Result<FeatureResult, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidSampleRate);
    }
    if samples.is_empty() {
        return Err(AnalysisError::EmptySignal);
    }

    let duration = samples.len() as f64 / sample_rate as f64;
    let spectrogram = Spectrogram::compute(samples, sample_rate);

    let bpm = tempo::estimate_tempo(&spectrogram);
    let chroma = mean_chroma(&spectrogram);
    let key = dominant_pitch_class(&chroma);
    let spectrogram_png = render::render_spectrogram_png(&spectrogram, duration)?;

    tracing::info!(
        duration_seconds = format!("{:.2}", duration),
        bpm = format!("{:.1}", bpm),
        key = %key,
        frames = spectrogram.n_frames(),
        png_bytes = spectrogram_png.len(),
        "Feature extraction complete"
    );

    Ok(FeatureResult {
        duration,
        bpm: bpm as f64,
        key,
        spectrogram_png,
    })
}
