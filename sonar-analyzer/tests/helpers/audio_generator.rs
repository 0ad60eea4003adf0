//! Audio Test Fixture Generator
//!
//! WAV fixtures with known duration, pitch and pulse, generated in memory
//! with hound.

use std::f32::consts::PI;
use std::io::Cursor;

/// Configuration for a generated sine tone
#[derive(Debug, Clone)]
pub struct ToneConfig {
    pub frequency: f32,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            duration_seconds: 2.0,
            sample_rate: 44100,
            channels: 1,
        }
    }
}

impl ToneConfig {
    pub fn total_frames(&self) -> usize {
        (self.duration_seconds * self.sample_rate as f64) as usize
    }

    /// Duration the analyzer should report for this fixture
    pub fn expected_duration(&self) -> f64 {
        self.total_frames() as f64 / self.sample_rate as f64
    }
}

fn encode_wav(channels: u16, sample_rate: u32, frames: impl Iterator<Item = f32>) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for value in frames {
            let sample = (value.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            for _ in 0..channels {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Sine tone at 30% amplitude, identical on every channel
pub fn sine_wav(config: &ToneConfig) -> Vec<u8> {
    let rate = config.sample_rate as f32;
    let frequency = config.frequency;
    let frames = (0..config.total_frames())
        .map(move |i| 0.3 * (2.0 * PI * frequency * i as f32 / rate).sin());
    encode_wav(config.channels, config.sample_rate, frames)
}

/// 10 ms 1 kHz bursts every beat, silence in between
pub fn click_track_wav(bpm: f32, duration_seconds: f64, sample_rate: u32) -> Vec<u8> {
    let total = (duration_seconds * sample_rate as f64) as usize;
    let period = (60.0 / bpm * sample_rate as f32) as usize;
    let burst = (0.01 * sample_rate as f32) as usize;
    let rate = sample_rate as f32;
    let frames = (0..total).map(move |i| {
        if i % period < burst {
            0.8 * (2.0 * PI * 1000.0 * i as f32 / rate).sin()
        } else {
            0.0
        }
    });
    encode_wav(1, sample_rate, frames)
}

