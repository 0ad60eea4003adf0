//! Global tempo estimation
//!
//! 1. Onset strength: positive spectral flux of the dB power spectrum,
//!    averaged over frequency bins.
//! 2. Autocorrelation of the onset envelope, `ACF = IFFT(|FFT(env)|²)`,
//!    normalized so lag 0 is 1.
//! 3. Each lag inside [`MIN_BPM`, `MAX_BPM`] is scored by
//!    `ln(1 + 1e6 * acf) + prior`, where the prior is log-normal around
//!    [`PRIOR_CENTER_BPM`] with a one-octave standard deviation. The prior
//!    settles octave ambiguity (60 vs 120 vs 240) toward typical tempos.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use super::Spectrogram;

pub const MIN_BPM: f32 = 30.0;
pub const MAX_BPM: f32 = 320.0;
pub const PRIOR_CENTER_BPM: f32 = 120.0;
const PRIOR_STD_OCTAVES: f32 = 1.0;

const AMIN_POWER: f32 = 1e-10;
const TOP_DB: f32 = 80.0;

fn power_db(magnitude: f32) -> f32 {
    10.0 * (magnitude * magnitude).max(AMIN_POWER).log10()
}

fn fill_db(frame: &[f32], floor: f32, out: &mut Vec<f32>) {
    out.clear();
    out.extend(frame.iter().map(|&m| power_db(m).max(floor)));
}

/// Onset strength per frame; frame 0 is always 0
///
/// Works on two reused dB buffers so memory stays at one frame pair.
pub fn onset_envelope(spectrogram: &Spectrogram) -> Vec<f32> {
    let frames = spectrogram.frames();
    let Some(first) = frames.first() else {
        return Vec::new();
    };

    let floor = power_db(spectrogram.peak()) - TOP_DB;
    let mut prev = Vec::with_capacity(first.len());
    let mut cur = Vec::with_capacity(first.len());
    fill_db(first, floor, &mut prev);

    let mut envelope = Vec::with_capacity(frames.len());
    envelope.push(0.0);
    for frame in &frames[1..] {
        fill_db(frame, floor, &mut cur);
        let flux: f32 = cur
            .iter()
            .zip(prev.iter())
            .map(|(&c, &p)| (c - p).max(0.0))
            .sum();
        envelope.push(flux / cur.len().max(1) as f32);
        std::mem::swap(&mut prev, &mut cur);
    }
    envelope
}

/// Autocorrelation for lags `0..signal.len()`, normalized to `acf[0] == 1`
///
/// Returns all zeros for a zero-energy signal.
pub fn autocorrelate(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    // Zero-pad to avoid circular wrap-around
    let size = (2 * n).next_power_of_two();
    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .map(|&x| Complex::new(x, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(size)
        .collect();

    let mut planner = FftPlanner::<f32>::new();
    planner.plan_fft_forward(size).process(&mut buffer);
    for value in buffer.iter_mut() {
        *value = Complex::new(value.norm_sqr(), 0.0);
    }
    planner.plan_fft_inverse(size).process(&mut buffer);

    let zero_lag = buffer[0].re;
    if zero_lag <= f32::EPSILON {
        return vec![0.0; n];
    }
    buffer[..n].iter().map(|c| c.re / zero_lag).collect()
}

fn log_prior(bpm: f32) -> f32 {
    let octaves = (bpm.log2() - PRIOR_CENTER_BPM.log2()) / PRIOR_STD_OCTAVES;
    -0.5 * octaves * octaves
}

/// Pick the best-scoring tempo from an autocorrelation sampled at `frame_rate`
pub fn tempo_from_autocorrelation(acf: &[f32], frame_rate: f32) -> f32 {
    let mut best: Option<(f32, f32)> = None;

    for (lag, &value) in acf.iter().enumerate().skip(1) {
        let bpm = 60.0 * frame_rate / lag as f32;
        if bpm > MAX_BPM {
            continue;
        }
        if bpm < MIN_BPM {
            break;
        }

        let score = (1e6 * value.max(0.0)).ln_1p() + log_prior(bpm);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((bpm, score));
        }
    }

    best.map(|(bpm, _)| bpm).unwrap_or(0.0)
}

/// Single tempo estimate for the whole signal, 0.0 when there is no pulse
pub fn estimate_tempo(spectrogram: &Spectrogram) -> f32 {
    let envelope = onset_envelope(spectrogram);
    if envelope.len() < 2 || envelope.iter().all(|&v| v <= 0.0) {
        tracing::debug!(frames = envelope.len(), "No onset energy, tempo unavailable");
        return 0.0;
    }

    let acf = autocorrelate(&envelope);
    let bpm = tempo_from_autocorrelation(&acf, spectrogram.frame_rate());

    tracing::debug!(
        frames = envelope.len(),
        frame_rate = spectrogram.frame_rate(),
        bpm,
        "Tempo estimated"
    );
    bpm
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    /// Short 1 kHz bursts every `60 / bpm` seconds
    fn click_track(bpm: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let total = (sample_rate as f32 * seconds) as usize;
        let period = (60.0 / bpm * sample_rate as f32) as usize;
        let burst = (0.01 * sample_rate as f32) as usize;
        (0..total)
            .map(|i| {
                if i % period < burst {
                    (2.0 * PI * 1000.0 * i as f32 / sample_rate as f32).sin()
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Full dB matrix, floored at the global maximum minus `TOP_DB`
    fn reference_envelope(spec: &Spectrogram) -> Vec<f32> {
        let db: Vec<Vec<f32>> = spec
            .frames()
            .iter()
            .map(|frame| frame.iter().map(|&m| power_db(m)).collect())
            .collect();
        let floor = db.iter().flatten().copied().fold(f32::NEG_INFINITY, f32::max) - TOP_DB;

        let mut envelope = vec![0.0];
        for pair in db.windows(2) {
            let flux: f32 = pair[1]
                .iter()
                .zip(pair[0].iter())
                .map(|(&c, &p)| (c.max(floor) - p.max(floor)).max(0.0))
                .sum();
            envelope.push(flux / pair[1].len() as f32);
        }
        envelope
    }

    #[test]
    fn test_onset_envelope_matches_full_matrix() {
        let samples = click_track(100.0, 22050, 3.0);
        let spec = Spectrogram::compute(&samples, 22050);

        let envelope = onset_envelope(&spec);
        let expected = reference_envelope(&spec);

        assert_eq!(envelope.len(), spec.n_frames());
        for (i, (got, want)) in envelope.iter().zip(expected.iter()).enumerate() {
            assert!((got - want).abs() < 1e-3, "frame {}: {} vs {}", i, got, want);
        }
        assert!(envelope.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn test_onset_envelope_of_silence_is_flat() {
        let spec = Spectrogram::compute(&vec![0.0; 8192], 22050);
        let envelope = onset_envelope(&spec);
        assert_eq!(envelope.len(), spec.n_frames());
        assert!(envelope.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_autocorrelation_of_impulse_train() {
        let mut signal = vec![0.0f32; 64];
        for i in (0..64).step_by(8) {
            signal[i] = 1.0;
        }
        let acf = autocorrelate(&signal);

        assert!((acf[0] - 1.0).abs() < 1e-4);
        assert!(acf[8] > 0.8);
        assert!(acf[4].abs() < 1e-4);
    }

    #[test]
    fn test_autocorrelation_of_silence_is_zero() {
        let acf = autocorrelate(&[0.0; 32]);
        assert!(acf.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_prior_prefers_center() {
        assert!(log_prior(120.0) > log_prior(60.0));
        assert!(log_prior(120.0) > log_prior(240.0));
        assert!((log_prior(60.0) - log_prior(240.0)).abs() < 1e-5);
    }

    #[test]
    fn test_click_track_120_bpm() {
        let samples = click_track(120.0, 44100, 8.0);
        let spec = Spectrogram::compute(&samples, 44100);
        let bpm = estimate_tempo(&spec);

        assert!((bpm - 120.0).abs() < 3.0, "expected ~120 BPM, got {}", bpm);
    }

    #[test]
    fn test_silence_has_no_tempo() {
        let spec = Spectrogram::compute(&vec![0.0; 44100], 44100);
        assert_eq!(estimate_tempo(&spec), 0.0);
    }

    #[test]
    fn test_no_lag_in_range_is_zero() {
        // Only lag 0 available
        assert_eq!(tempo_from_autocorrelation(&[1.0], 86.0), 0.0);
    }
}
