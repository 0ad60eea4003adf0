//! Chroma features and dominant pitch class

use std::fmt;

use super::Spectrogram;

/// Pitch class labels, index 0 = C
pub const PITCH_CLASS_LABELS: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Lowest peak frequency mapped to a pitch class (C2)
const MIN_FREQ: f32 = 65.41;
/// Highest peak frequency mapped to a pitch class (C8)
const MAX_FREQ: f32 = 4186.01;
/// Spread of a peak's energy over neighbouring pitch classes, in semitones
const SOFT_MAPPING_SIGMA: f32 = 0.5;
/// Peaks this far below the frame maximum (power ratio, -80 dB) are ignored
const PEAK_FLOOR: f32 = 1e-8;

/// One of the 12 equal-tempered pitch classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PitchClass(u8);

impl PitchClass {
    /// `None` unless `index < 12`
    pub fn from_index(index: usize) -> Option<Self> {
        (index < 12).then_some(Self(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn label(self) -> &'static str {
        PITCH_CLASS_LABELS[self.index()]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Spectral peak with its interpolated frequency and power
#[derive(Debug, Clone, Copy, PartialEq)]
struct Peak {
    frequency: f32,
    power: f32,
}

/// Local maxima of one magnitude frame, refined by fitting a parabola
/// through the log magnitudes around each maximum
///
/// Bin centres are more than a semitone apart below a few hundred Hz, so
/// the refined frequency, not the bin centre, decides the pitch class.
fn spectral_peaks(frame: &[f32], bin_hz: f32) -> Vec<Peak> {
    let max_power = frame.iter().fold(0.0f32, |acc, &m| acc.max(m * m));
    if max_power <= f32::MIN_POSITIVE {
        return Vec::new();
    }
    let floor = max_power * PEAK_FLOOR;

    let mut peaks = Vec::new();
    for k in 1..frame.len().saturating_sub(1) {
        let (left, centre, right) = (frame[k - 1], frame[k], frame[k + 1]);
        if !(centre > left && centre >= right) || centre * centre < floor {
            continue;
        }

        let a = left.max(f32::MIN_POSITIVE).ln();
        let b = centre.ln();
        let c = right.max(f32::MIN_POSITIVE).ln();
        // b > a and b >= c, so the curvature is strictly negative
        let offset = 0.5 * (a - c) / (a - 2.0 * b + c);
        let log_peak = b - 0.25 * (a - c) * offset;

        peaks.push(Peak {
            frequency: (k as f32 + offset) * bin_hz,
            power: (2.0 * log_peak).exp(),
        });
    }
    peaks
}

/// Gaussian weight of `class` for a pitch `semitones` above C
fn soft_weight(semitones: f32, class: usize) -> f32 {
    let d = (semitones - class as f32).rem_euclid(12.0);
    let d = d.min(12.0 - d);
    (-d * d / (2.0 * SOFT_MAPPING_SIGMA * SOFT_MAPPING_SIGMA)).exp()
}

/// Chroma of one frame, before normalization
fn frame_chroma(frame: &[f32], bin_hz: f32) -> [f64; 12] {
    let mut chroma = [0.0f64; 12];
    for peak in spectral_peaks(frame, bin_hz) {
        if !(MIN_FREQ..=MAX_FREQ).contains(&peak.frequency) {
            continue;
        }
        // Semitones above C, octave ignored (A sits at index 9)
        let semitones = 12.0 * (peak.frequency / 440.0).log2() + 9.0;
        for (class, value) in chroma.iter_mut().enumerate() {
            *value += (peak.power * soft_weight(semitones, class)) as f64;
        }
    }
    chroma
}

/// Time-averaged chroma vector
///
/// Per frame, the power of each spectral peak between C2 and C8 is spread
/// over the pitch classes around its interpolated frequency, and the 12
/// values are normalized by their maximum. Silent frames contribute zeros.
pub fn mean_chroma(spectrogram: &Spectrogram) -> [f32; 12] {
    let bin_hz = spectrogram.bin_frequency(1);

    let mut sum = [0.0f64; 12];
    for frame in spectrogram.frames() {
        let chroma = frame_chroma(frame, bin_hz);

        let max = chroma.iter().copied().fold(0.0f64, f64::max);
        if max > f64::EPSILON {
            for (acc, value) in sum.iter_mut().zip(chroma.iter()) {
                *acc += value / max;
            }
        }
    }

    let n_frames = spectrogram.n_frames().max(1) as f64;
    let mut mean = [0.0f32; 12];
    for (out, acc) in mean.iter_mut().zip(sum.iter()) {
        *out = (acc / n_frames) as f32;
    }
    mean
}

/// Index of the maximum mean energy; the first maximum wins ties
pub fn dominant_pitch_class(chroma: &[f32; 12]) -> PitchClass {
    let mut best = 0;
    for (index, &value) in chroma.iter().enumerate().skip(1) {
        if value > chroma[best] {
            best = index;
        }
    }
    PitchClass(best as u8)
}
