//! Texture analysis from adjacent-pixel differences
//!
//! Draws pixel pairs with a seeded RNG, so the same image always produces the
//! same reading. High variance of the summed |ΔR|+|ΔG|+|ΔB| suggests spots or
//! lesions; very low variance suggests a uniform coating.

use super::scoring_table::TextureThresholds;
use super::types::{DetectionMethod, DiseaseDetection};
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TexturePattern {
    Spotting,
    UniformCoating,
    Normal,
    /// Image too small to form a pixel pair
    Insufficient,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextureReading {
    pub variance: Option<f64>,
    pub pattern: TexturePattern,
}

impl TextureReading {
    pub fn is_abnormal(&self) -> bool {
        matches!(self.pattern, TexturePattern::Spotting | TexturePattern::UniformCoating)
    }
}

fn pixel_difference(image: &RgbImage, a: (u32, u32), b: (u32, u32)) -> f64 {
    let pa = image.get_pixel(a.0, a.1);
    let pb = image.get_pixel(b.0, b.1);
    (0..3)
        .map(|c| (pa[c] as i32 - pb[c] as i32).unsigned_abs())
        .sum::<u32>() as f64
}

/// Summed RGB differences for `count` randomly drawn neighbour pairs.
///
/// Pairs are horizontal; a one-pixel-wide image falls back to vertical pairs.
pub fn sample_differences(image: &RgbImage, count: usize, seed: u64) -> Vec<f64> {
    let (w, h) = image.dimensions();
    let horizontal = w >= 2;
    if (!horizontal && h < 2) || w == 0 {
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            if horizontal {
                let x = rng.gen_range(0..w - 1);
                let y = rng.gen_range(0..h);
                pixel_difference(image, (x, y), (x + 1, y))
            } else {
                let y = rng.gen_range(0..h - 1);
                pixel_difference(image, (0, y), (0, y + 1))
            }
        })
        .collect()
}

/// Population variance; `None` when empty
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    Some(values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n)
}

pub fn analyze_texture(image: &RgbImage, thresholds: &TextureThresholds) -> TextureReading {
    let diffs = sample_differences(image, thresholds.sample_pairs, thresholds.seed);
    let Some(var) = variance(&diffs) else {
        return TextureReading {
            variance: None,
            pattern: TexturePattern::Insufficient,
        };
    };

    let pattern = if var > thresholds.spotting_variance {
        TexturePattern::Spotting
    } else if var < thresholds.uniform_variance {
        TexturePattern::UniformCoating
    } else {
        TexturePattern::Normal
    };

    TextureReading {
        variance: Some(var),
        pattern,
    }
}

/// Detection implied by a texture reading
pub fn texture_detection(reading: &TextureReading, thresholds: &TextureThresholds) -> Option<DiseaseDetection> {
    let outcome = match reading.pattern {
        TexturePattern::Spotting => &thresholds.spotting,
        TexturePattern::UniformCoating => &thresholds.uniform,
        TexturePattern::Normal | TexturePattern::Insufficient => return None,
    };
    Some(DiseaseDetection::new(
        &outcome.disease,
        outcome.confidence,
        outcome.severity,
        DetectionMethod::TextureAnalysis,
    ))
}
