//! Audio decoding
//!
//! Uses symphonia for format-agnostic decoding (WAV, MP3, FLAC, AAC, OGG, ...)
//! and mixes every channel down to mono f32 at the native sample rate.

use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::AnalysisError;

/// Decoded audio
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono samples, range [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Channel count before the mono mix-down
    pub channels: usize,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an audio file to mono f32 PCM samples
///
/// # Errors
/// * File I/O errors
/// * Unsupported or unrecognized container
/// * Missing audio track or sample rate
/// * Corrupt audio data
pub fn decode_audio_file(file_path: &Path) -> Result<DecodedAudio, AnalysisError> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let file = std::fs::File::open(file_path).map_err(|source| AnalysisError::Open {
        path: file_path.display().to_string(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AnalysisError::UnsupportedFormat(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AnalysisError::NoAudioTrack)?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .filter(|&rate| rate > 0)
        .ok_or(AnalysisError::InvalidSampleRate)?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AnalysisError::Decode(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AnalysisError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // A single corrupt packet is recoverable
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(path = %file_path.display(), error = %e, "Skipping corrupt packet");
                continue;
            }
            Err(e) => return Err(AnalysisError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let channel_count = spec.channels.count().max(1);
        channels = channel_count;

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        mix_to_mono(buf.samples(), channel_count, &mut samples);
    }

    tracing::debug!(
        path = %file_path.display(),
        sample_rate,
        channels,
        total_samples = samples.len(),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Average interleaved frames into `out`
fn mix_to_mono(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_audio_file_not_found() {
        let result = decode_audio_file(Path::new("/nonexistent/file.wav"));
        let err = result.unwrap_err();
        assert!(matches!(err, AnalysisError::Open { .. }));
        assert!(err.to_string().contains("Failed to open audio file"));
    }

    #[test]
    fn test_decode_garbage_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a RIFF header, just text").unwrap();

        let err = decode_audio_file(&path).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedFormat(_)), "got {:?}", err);
    }

    #[test]
    fn test_mix_to_mono_averages_frames() {
        let mut out = Vec::new();
        mix_to_mono(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_duration_seconds() {
        let audio = DecodedAudio {
            samples: vec![0.0; 44100 * 3],
            sample_rate: 44100,
            channels: 1,
        };
        assert!((audio.duration_seconds() - 3.0).abs() < 1e-9);
    }
}
