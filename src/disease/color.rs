//! Color-ratio analysis
//!
//! Averages RGB over a strided sample of pixels, derives channel ratios and the
//! HSL of the mean color, then walks the ordered color rules. The first rule
//! whose condition holds decides the outcome.

use super::scoring_table::ColorRule;
use super::types::{ColorProfile, DetectionMethod, DiseaseDetection};
use image::RgbImage;
use serde::Serialize;

/// Compute the color profile, sampling at most `sample_limit` pixels.
///
/// Returns `None` for an image with no pixels.
pub fn color_profile(image: &RgbImage, sample_limit: usize) -> Option<ColorProfile> {
    let total = image.width() as usize * image.height() as usize;
    if total == 0 {
        return None;
    }
    let stride = total.div_ceil(sample_limit.max(1)).max(1);

    let (mut r, mut g, mut b, mut n) = (0u64, 0u64, 0u64, 0usize);
    for px in image.pixels().step_by(stride) {
        r += px[0] as u64;
        g += px[1] as u64;
        b += px[2] as u64;
        n += 1;
    }

    let avg_red = r as f64 / n as f64;
    let avg_green = g as f64 / n as f64;
    let avg_blue = b as f64 / n as f64;
    let sum = avg_red + avg_green + avg_blue;
    let (red_ratio, green_ratio, blue_ratio) = if sum > 0.0 {
        (avg_red / sum, avg_green / sum, avg_blue / sum)
    } else {
        (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
    };
    let (hue, saturation, lightness) = rgb_to_hsl(avg_red, avg_green, avg_blue);

    Some(ColorProfile {
        avg_red,
        avg_green,
        avg_blue,
        red_ratio,
        green_ratio,
        blue_ratio,
        hue,
        saturation,
        lightness,
        sampled_pixels: n,
    })
}

/// RGB in 0..=255 to (hue degrees, saturation, lightness)
pub fn rgb_to_hsl(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let (r, g, b) = (r / 255.0, g / 255.0, b / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;

    if d == 0.0 {
        return (0.0, 0.0, l);
    }

    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        ((g - b) / d).rem_euclid(6.0)
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h * 60.0, s, l)
}

/// Outcome of the color stage
#[derive(Debug, Clone, Serialize)]
pub struct ColorVerdict {
    /// Name of the first matching rule, if any matched
    pub rule: Option<String>,
    pub detection: Option<DiseaseDetection>,
}

impl ColorVerdict {
    pub fn is_abnormal(&self) -> bool {
        self.detection.is_some()
    }
}

pub fn evaluate_color_rules(profile: &ColorProfile, rules: &[ColorRule]) -> ColorVerdict {
    for rule in rules {
        if !rule.condition.matches(profile) {
            continue;
        }
        let detection = rule.outcome.as_ref().map(|o| {
            let mut d = DiseaseDetection::new(&o.disease, o.confidence, o.severity, DetectionMethod::ColorAnalysis);
            d.color_profile = Some(*profile);
            d
        });
        tracing::debug!("Color rule '{}' matched", rule.name);
        return ColorVerdict {
            rule: Some(rule.name.clone()),
            detection,
        };
    }

    ColorVerdict {
        rule: None,
        detection: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::scoring_table::ScoringTable;
    use crate::disease::types::Severity;
    use approx::assert_relative_eq;
    use image::Rgb;

    fn solid(r: u8, g: u8, b: u8) -> RgbImage {
        RgbImage::from_pixel(16, 16, Rgb([r, g, b]))
    }

    fn verdict(image: &RgbImage) -> ColorVerdict {
        let table = ScoringTable::default();
        let profile = color_profile(image, table.color_sample_limit).unwrap();
        evaluate_color_rules(&profile, &table.color_rules)
    }

    #[test]
    fn test_profile_of_solid_image() {
        let p = color_profile(&solid(60, 120, 60), 10_000).unwrap();
        assert_relative_eq!(p.avg_green, 120.0);
        assert_relative_eq!(p.green_ratio, 0.5);
        assert_relative_eq!(p.hue, 120.0);
        assert_eq!(p.sampled_pixels, 256);
    }

    #[test]
    fn test_sampling_limit_respected() {
        let p = color_profile(&solid(10, 10, 10), 50).unwrap();
        assert!(p.sampled_pixels <= 50);
        assert!(p.sampled_pixels > 0);
    }

    #[test]
    fn test_black_image_has_even_ratios() {
        let p = color_profile(&solid(0, 0, 0), 100).unwrap();
        assert_relative_eq!(p.red_ratio, 1.0 / 3.0);
    }

    #[test]
    fn test_empty_image_has_no_profile() {
        assert!(color_profile(&RgbImage::new(0, 0), 100).is_none());
    }

    #[test]
    fn test_hsl() {
        let (h, s, l) = rgb_to_hsl(255.0, 0.0, 0.0);
        assert_relative_eq!(h, 0.0);
        assert_relative_eq!(s, 1.0);
        assert_relative_eq!(l, 0.5);

        let (h, _, _) = rgb_to_hsl(0.0, 0.0, 255.0);
        assert_relative_eq!(h, 240.0);
    }

    #[test]
    fn test_healthy_green_has_no_disease() {
        let v = verdict(&solid(60, 160, 60));
        assert_eq!(v.rule.as_deref(), Some("healthy"));
        assert!(!v.is_abnormal());
    }

    #[test]
    fn test_yellow_leaf_is_chlorosis() {
        let d = verdict(&solid(240, 160, 40)).detection.unwrap();
        assert_eq!(d.disease_name, "Chlorosis");
        assert_relative_eq!(d.confidence, 0.72);
        assert!(d.color_profile.is_some());
    }

    #[test]
    fn test_brown_leaf_is_blight() {
        let d = verdict(&solid(120, 80, 50)).detection.unwrap();
        assert_eq!(d.disease_name, "Leaf Blight");
        assert_eq!(d.severity, Severity::Severe);
    }

    #[test]
    fn test_white_coating_is_mildew() {
        let d = verdict(&solid(230, 232, 225)).detection.unwrap();
        assert_eq!(d.disease_name, "Powdery Mildew");
    }

    #[test]
    fn test_red_leaf_is_rust() {
        // red ratio 0.5, green ratio 0.3; red above the browning cap
        let d = verdict(&solid(200, 120, 80)).detection.unwrap();
        assert_eq!(d.disease_name, "Rust");
    }

    #[test]
    fn test_dark_leaf_is_leaf_spot() {
        let d = verdict(&solid(40, 50, 45)).detection.unwrap();
        assert_eq!(d.disease_name, "Leaf Spot");
    }

    #[test]
    fn test_rule_order_is_configurable() {
        let mut table = ScoringTable::default();
        // Without the healthy rule first, a pale green-white image reads as mildew
        let image = solid(205, 255, 205);
        let p = color_profile(&image, 100).unwrap();
        assert_eq!(evaluate_color_rules(&p, &table.color_rules).rule.as_deref(), Some("healthy"));

        table.color_rules.rotate_left(1);
        let v = evaluate_color_rules(&p, &table.color_rules);
        assert_eq!(v.rule.as_deref(), Some("powdery_mildew"));
    }

    #[test]
    fn test_no_rule_matches() {
        // Neutral grey matches none of the defaults
        assert!(verdict(&solid(128, 128, 128)).rule.is_none());
    }
}
