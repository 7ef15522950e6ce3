//! Heuristic check that an uploaded photo looks like an ID card.
//!
//! No text is read. The score is built from the image size, the density of
//! edges found by a Laplacian filter (text and borders produce many), and
//! simple shape, contrast and lighting statistics. A result is valid from a
//! confidence of 60 upwards.

use image::{DynamicImage, GrayImage};
use serde::Serialize;

pub const MIN_DIMENSION: u32 = 200;
pub const VALID_CONFIDENCE: f64 = 60.0;

const EDGE_THRESHOLD: u8 = 100;
const MIN_EDGE_DENSITY: f64 = 0.05;
const MAX_EDGE_DENSITY: f64 = 0.40;
const CONTRAST_STDEV: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdValidationResult {
    pub is_valid: bool,
    pub confidence: f64,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_density: Option<f64>,
}

impl IdValidationResult {
    fn rejected(confidence: f64, reasons: Vec<String>, edge_density: Option<f64>) -> Self {
        Self {
            is_valid: false,
            confidence,
            reasons,
            edge_density,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ChannelStats {
    mean: f64,
    stdev: f64,
}

fn rgb_stats(image: &DynamicImage) -> [ChannelStats; 3] {
    let rgb = image.to_rgb8();
    let n = f64::from(rgb.width()) * f64::from(rgb.height());
    let mut sum = [0f64; 3];
    let mut sum_sq = [0f64; 3];
    for pixel in rgb.pixels() {
        for c in 0..3 {
            let v = f64::from(pixel[c]);
            sum[c] += v;
            sum_sq[c] += v * v;
        }
    }
    std::array::from_fn(|c| {
        let mean = sum[c] / n;
        let variance = (sum_sq[c] / n - mean * mean).max(0.0);
        ChannelStats {
            mean,
            stdev: variance.sqrt(),
        }
    })
}

fn stretch_contrast(gray: &mut GrayImage) {
    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max <= min {
        return;
    }
    let range = f64::from(max - min);
    for p in gray.pixels_mut() {
        p[0] = ((f64::from(p[0] - min) / range) * 255.0).round() as u8;
    }
}

/// Share of pixels whose 3x3 Laplacian response exceeds the threshold.
pub fn edge_density(image: &DynamicImage) -> f64 {
    let mut gray = image.to_luma8();
    stretch_contrast(&mut gray);

    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }

    let mut edges = 0u64;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut acc = 8 * i32::from(gray.get_pixel(x, y)[0]);
            for (dx, dy) in [(-1i32, -1i32), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)] {
                let nx = (x as i32 + dx) as u32;
                let ny = (y as i32 + dy) as u32;
                acc -= i32::from(gray.get_pixel(nx, ny)[0]);
            }
            if acc.clamp(0, 255) > i32::from(EDGE_THRESHOLD) {
                edges += 1;
            }
        }
    }

    edges as f64 / (f64::from(w) * f64::from(h))
}

fn quality_score(aspect: f64, stats: &[ChannelStats; 3]) -> f64 {
    let mut score: f64 = 50.0;
    if aspect > 1.4 && aspect < 1.9 {
        score += 10.0;
    }
    if has_contrast(stats) {
        score += 15.0;
    }
    if has_good_lighting(stats) {
        score += 10.0;
    }
    score.min(85.0)
}

fn has_contrast(stats: &[ChannelStats; 3]) -> bool {
    stats.iter().any(|c| c.stdev > CONTRAST_STDEV)
}

fn has_good_lighting(stats: &[ChannelStats; 3]) -> bool {
    let brightness = stats.iter().map(|c| c.mean).sum::<f64>() / 3.0;
    brightness > 60.0 && brightness < 200.0
}

pub fn validate_id_image(bytes: &[u8]) -> IdValidationResult {
    match image::load_from_memory(bytes) {
        Ok(image) => validate_decoded(&image),
        Err(err) => IdValidationResult::rejected(
            0.0,
            vec![format!("Failed to process image: {err}")],
            None,
        ),
    }
}

pub fn validate_decoded(image: &DynamicImage) -> IdValidationResult {
    let mut reasons = Vec::new();
    let (width, height) = (image.width(), image.height());

    if width < MIN_DIMENSION || height < MIN_DIMENSION {
        reasons.push("Image dimensions are too small for an ID card (minimum 200x200 pixels)".into());
        return IdValidationResult::rejected(0.0, reasons, None);
    }
    let mut confidence = 15.0;
    reasons.push("Image size is adequate".into());

    let density = edge_density(image);
    if !(MIN_EDGE_DENSITY..=MAX_EDGE_DENSITY).contains(&density) {
        reasons.push("Image lacks sufficient text content - does not appear to be an ID card".into());
        reasons.push("IDs typically contain multiple text fields (name, number, dates, etc.)".into());
        return IdValidationResult::rejected(f64::min(confidence, 15.0), reasons, Some(density));
    }
    confidence += 25.0;
    reasons.push("Image contains sufficient text content".into());

    let aspect = f64::from(width) / f64::from(height);
    let stats = rgb_stats(image);

    let quality = quality_score(aspect, &stats);
    if quality < 50.0 {
        reasons.push("Image quality is too low or does not appear to be an ID card".into());
        return IdValidationResult::rejected(f64::min(confidence, 25.0), reasons, Some(density));
    }
    confidence += f64::min(30.0, quality * 0.5);
    reasons.push("Image quality is acceptable for ID verification".into());

    if aspect > 1.3 && aspect < 2.0 {
        confidence += 10.0;
        reasons.push("Image has ID card-like proportions".into());
    } else {
        reasons.push("Image dimensions do not match typical ID card shape".into());
    }

    if has_contrast(&stats) {
        confidence += 10.0;
        reasons.push("Image has good contrast and text definition".into());
    } else {
        reasons.push("Image has poor contrast - text may not be readable".into());
    }

    if has_good_lighting(&stats) {
        confidence += 10.0;
        reasons.push("Image has proper lighting".into());
    } else {
        reasons.push("Image is too dark or too bright".into());
    }

    let is_valid = confidence >= VALID_CONFIDENCE;
    if !is_valid {
        reasons.push("Overall confidence is too low - please provide a clearer ID image".into());
    }

    IdValidationResult {
        is_valid,
        confidence,
        reasons,
        edge_density: Some(density),
    }
}
