//! Spectrogram rendering
//!
//! Magnitudes are converted to dB relative to the spectrogram's own peak,
//! floored at `-TOP_DB`, and drawn as a heat map (time on x, linear
//! frequency on y, low frequencies at the bottom) next to a color-bar legend.
//! Output is a 600x300 PNG.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use super::glyphs::{self, GLYPH_HEIGHT};
use super::{AnalysisError, Spectrogram};

pub const IMAGE_WIDTH: u32 = 600;
pub const IMAGE_HEIGHT: u32 = 300;

/// Dynamic range shown, in dB below the peak
pub const TOP_DB: f32 = 80.0;
const AMIN: f32 = 1e-5;

const PLOT_LEFT: u32 = 60;
const PLOT_TOP: u32 = 34;
const PLOT_WIDTH: u32 = 420;
const PLOT_HEIGHT: u32 = 220;
const BAR_LEFT: u32 = 496;
const BAR_WIDTH: u32 = 14;
const LEGEND_STEP_DB: i32 = 20;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Magma control points, evenly spaced over [0, 1]
const MAGMA: [[u8; 3]; 9] = [
    [0, 0, 4],
    [28, 16, 68],
    [79, 18, 123],
    [129, 37, 129],
    [181, 54, 122],
    [229, 80, 100],
    [251, 135, 97],
    [254, 194, 135],
    [252, 253, 191],
];

/// `20 * log10(magnitude / reference)` with both sides clamped to `AMIN`
pub fn amplitude_to_db(magnitude: f32, reference: f32) -> f32 {
    20.0 * magnitude.max(AMIN).log10() - 20.0 * reference.max(AMIN).log10()
}

/// Color for `t` in [0, 1]; out-of-range values are clamped
pub fn magma(t: f32) -> Rgb<u8> {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (MAGMA.len() - 1) as f32;
    let lower = (scaled.floor() as usize).min(MAGMA.len() - 2);
    let frac = scaled - lower as f32;

    let (a, b) = (MAGMA[lower], MAGMA[lower + 1]);
    let mix = |i: usize| (a[i] as f32 + (b[i] as f32 - a[i] as f32) * frac).round() as u8;
    Rgb([mix(0), mix(1), mix(2)])
}

fn db_color(db: f32) -> Rgb<u8> {
    magma((db + TOP_DB) / TOP_DB)
}

/// Max-pool the spectrogram down to a `PLOT_WIDTH` x `PLOT_HEIGHT` grid of
/// dB values, row 0 being the highest frequency band
fn pooled_db(spectrogram: &Spectrogram) -> Vec<Vec<f32>> {
    let frames = spectrogram.frames();
    let n_frames = frames.len().max(1);
    let n_bins = spectrogram.n_bins();
    let peak = spectrogram.peak();
    let span = |index: u32, cells: u32, len: usize| {
        let start = index as usize * len / cells as usize;
        let end = ((index as usize + 1) * len / cells as usize).max(start + 1).min(len);
        (start.min(len.saturating_sub(1)), end)
    };

    let mut grid = vec![vec![-TOP_DB; PLOT_WIDTH as usize]; PLOT_HEIGHT as usize];
    let mut column = vec![0.0f32; n_bins];

    for px in 0..PLOT_WIDTH {
        column.iter_mut().for_each(|v| *v = 0.0);
        let (f_start, f_end) = span(px, PLOT_WIDTH, n_frames);
        for frame in frames.iter().take(f_end).skip(f_start) {
            for (acc, &m) in column.iter_mut().zip(frame.iter()) {
                *acc = acc.max(m);
            }
        }

        for row in 0..PLOT_HEIGHT {
            let band = PLOT_HEIGHT - 1 - row;
            let (b_start, b_end) = span(band, PLOT_HEIGHT, n_bins);
            let magnitude = column[b_start..b_end].iter().copied().fold(0.0f32, f32::max);
            let db = amplitude_to_db(magnitude, peak).max(-TOP_DB);
            grid[row as usize][px as usize] = db;
        }
    }
    grid
}

fn draw_text(img: &mut RgbImage, x: u32, y: u32, text: &str, scale: u32) {
    for (i, c) in text.chars().enumerate() {
        let origin_x = x + i as u32 * glyphs::ADVANCE * scale;
        for (row, bits) in glyphs::glyph(c).iter().enumerate() {
            for col in 0..glyphs::GLYPH_WIDTH {
                if bits & (1 << (glyphs::GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = origin_x + col * scale + dx;
                        let py = y + row as u32 * scale + dy;
                        if px < img.width() && py < img.height() {
                            img.put_pixel(px, py, BLACK);
                        }
                    }
                }
            }
        }
    }
}

fn draw_text_right(img: &mut RgbImage, right: u32, y: u32, text: &str) {
    let width = glyphs::text_width(text, 1);
    draw_text(img, right.saturating_sub(width), y, text, 1);
}

fn draw_frame(img: &mut RgbImage, left: u32, top: u32, width: u32, height: u32) {
    let (right, bottom) = (left + width, top + height);
    for x in left.saturating_sub(1)..=right {
        img.put_pixel(x, top.saturating_sub(1), BLACK);
        img.put_pixel(x, bottom, BLACK);
    }
    for y in top.saturating_sub(1)..=bottom {
        img.put_pixel(left.saturating_sub(1), y, BLACK);
        img.put_pixel(right, y, BLACK);
    }
}

/// Render the spectrogram heat map with title, axes and color bar as PNG
pub fn render_spectrogram_png(
    spectrogram: &Spectrogram,
    duration_seconds: f64,
) -> Result<Vec<u8>, AnalysisError> {
    let mut img = RgbImage::from_pixel(IMAGE_WIDTH, IMAGE_HEIGHT, WHITE);

    let grid = pooled_db(spectrogram);
    for (row, values) in grid.iter().enumerate() {
        for (col, &db) in values.iter().enumerate() {
            img.put_pixel(PLOT_LEFT + col as u32, PLOT_TOP + row as u32, db_color(db));
        }
    }
    draw_frame(&mut img, PLOT_LEFT, PLOT_TOP, PLOT_WIDTH, PLOT_HEIGHT);

    // Color bar, 0 dB at the top
    for row in 0..PLOT_HEIGHT {
        let db = -TOP_DB * row as f32 / (PLOT_HEIGHT - 1) as f32;
        let color = db_color(db);
        for col in 0..BAR_WIDTH {
            img.put_pixel(BAR_LEFT + col, PLOT_TOP + row, color);
        }
    }
    draw_frame(&mut img, BAR_LEFT, PLOT_TOP, BAR_WIDTH, PLOT_HEIGHT);

    let steps = (TOP_DB as i32) / LEGEND_STEP_DB;
    for step in 0..=steps {
        let db = -LEGEND_STEP_DB * step;
        let y = PLOT_TOP + (step as u32 * (PLOT_HEIGHT - 1)) / steps as u32;
        for x in BAR_LEFT + BAR_WIDTH..BAR_LEFT + BAR_WIDTH + 4 {
            img.put_pixel(x, y, BLACK);
        }
        let label = format!("{:+} dB", db);
        draw_text(&mut img, BAR_LEFT + BAR_WIDTH + 7, y.saturating_sub(GLYPH_HEIGHT / 2), &label, 1);
    }

    let title = "Spectrogram";
    let title_x = PLOT_LEFT + (PLOT_WIDTH - glyphs::text_width(title, 2)) / 2;
    draw_text(&mut img, title_x, 10, title, 2);

    // Time axis
    let axis_y = PLOT_TOP + PLOT_HEIGHT + 5;
    draw_text(&mut img, PLOT_LEFT, axis_y, "0", 1);
    draw_text_right(&mut img, PLOT_LEFT + PLOT_WIDTH, axis_y, &format!("{:.1}", duration_seconds));
    let time_label_x = PLOT_LEFT + (PLOT_WIDTH - glyphs::text_width("Time", 1)) / 2;
    draw_text(&mut img, time_label_x, axis_y + 13, "Time", 1);

    // Frequency axis, linear up to Nyquist
    let nyquist = spectrogram.sample_rate() / 2;
    draw_text_right(&mut img, PLOT_LEFT - 5, PLOT_TOP, &nyquist.to_string());
    draw_text_right(&mut img, PLOT_LEFT - 5, PLOT_TOP + PLOT_HEIGHT - GLYPH_HEIGHT, "0");
    draw_text(&mut img, 8, PLOT_TOP + PLOT_HEIGHT / 2 - GLYPH_HEIGHT / 2, "Hz", 1);

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| AnalysisError::Render(e.to_string()))?;
    Ok(bytes)
}
