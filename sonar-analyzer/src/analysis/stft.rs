//! Short-time Fourier transform
//!
//! Centered frames (the signal is zero-padded by `n_fft / 2` on both sides),
//! periodic Hann window, magnitude only.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;

/// FFT frame size
pub const N_FFT: usize = 2048;

/// Samples between consecutive frames
pub const HOP_LENGTH: usize = 512;

/// Magnitude spectrogram, frame-major (`frames()[t][bin]`)
#[derive(Debug, Clone)]
pub struct Spectrogram {
    frames: Vec<Vec<f32>>,
    sample_rate: u32,
    n_fft: usize,
    hop_length: usize,
}

impl Spectrogram {
    /// STFT with the default frame and hop sizes
    pub fn compute(samples: &[f32], sample_rate: u32) -> Self {
        Self::with_params(samples, sample_rate, N_FFT, HOP_LENGTH)
    }

    pub fn with_params(samples: &[f32], sample_rate: u32, n_fft: usize, hop_length: usize) -> Self {
        let n_fft = n_fft.max(2);
        let hop_length = hop_length.max(1);
        let n_bins = n_fft / 2 + 1;
        let pad = n_fft / 2;
        let n_frames = 1 + samples.len() / hop_length;

        let window: Vec<f32> = (0..n_fft)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n_fft as f32).cos())
            .collect();

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];

        let mut frames = Vec::with_capacity(n_frames);
        for t in 0..n_frames {
            let start = t * hop_length;
            for (i, slot) in buffer.iter_mut().enumerate() {
                // Index into the virtual zero-padded signal
                let sample = (start + i)
                    .checked_sub(pad)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * window[i], 0.0);
            }

            fft.process(&mut buffer);
            frames.push(buffer[..n_bins].iter().map(|c| c.norm()).collect());
        }

        Self {
            frames,
            sample_rate,
            n_fft,
            hop_length,
        }
    }

    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Center frequency of `bin` in Hz
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.n_fft as f32
    }

    /// Frames per second
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_length as f32
    }

    /// Largest magnitude in the whole spectrogram
    pub fn peak(&self) -> f32 {
        self.frames
            .iter()
            .flat_map(|frame| frame.iter().copied())
            .fold(0.0f32, f32::max)
    }
}
