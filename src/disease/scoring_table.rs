//! Heuristic constants for the disease pipeline
//!
//! Every threshold, confidence and penalty the scanner uses lives here so a
//! deployment can tune them from a JSON file without touching code. The
//! defaults reproduce the field-tested values.

use super::types::{ColorProfile, Severity};
use crate::reference::Bounds;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Keyword entry matched against classifier labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordRule {
    pub disease: String,
    pub keywords: Vec<String>,
    /// Minimum confidence for the detection to be kept
    pub threshold: f64,
    pub severity: Severity,
}

impl KeywordRule {
    fn new(disease: &str, keywords: &[&str], threshold: f64, severity: Severity) -> Self {
        Self {
            disease: disease.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            threshold,
            severity,
        }
    }
}

/// Predicate over a [`ColorProfile`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorCondition {
    /// Dominant, reasonably bright green
    Healthy { min_green_ratio: f64, min_avg_green: f64 },
    /// Bright red and green with little blue (yellowing)
    Yellowing { min_red: f64, min_green: f64, max_blue: f64 },
    /// Low green share with brown tones (red > green > blue, red capped)
    Browning { max_green_ratio: f64, max_red: f64 },
    /// Every channel above the floor (white coating)
    Bright { min_channel: f64 },
    /// Red-dominant with a moderate green share
    Reddish { min_red_ratio: f64, green_ratio: Bounds },
    /// Every channel below the ceiling (dark lesions)
    Dark { max_channel: f64 },
}

impl ColorCondition {
    pub fn matches(&self, p: &ColorProfile) -> bool {
        match *self {
            ColorCondition::Healthy { min_green_ratio, min_avg_green } => {
                p.green_ratio > min_green_ratio && p.avg_green > min_avg_green
            }
            ColorCondition::Yellowing { min_red, min_green, max_blue } => {
                p.avg_red > min_red && p.avg_green > min_green && p.avg_blue < max_blue
            }
            ColorCondition::Browning { max_green_ratio, max_red } => {
                p.green_ratio < max_green_ratio
                    && p.avg_red > p.avg_green
                    && p.avg_green > p.avg_blue
                    && p.avg_red < max_red
            }
            ColorCondition::Bright { min_channel } => {
                p.avg_red > min_channel && p.avg_green > min_channel && p.avg_blue > min_channel
            }
            ColorCondition::Reddish { min_red_ratio, green_ratio } => {
                p.red_ratio > min_red_ratio && green_ratio.contains(p.green_ratio)
            }
            ColorCondition::Dark { max_channel } => {
                p.avg_red < max_channel && p.avg_green < max_channel && p.avg_blue < max_channel
            }
        }
    }
}

/// What a matching rule reports. `None` on a rule means "no disease".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub disease: String,
    pub confidence: f64,
    pub severity: Severity,
}

impl RuleOutcome {
    fn new(disease: &str, confidence: f64, severity: Severity) -> Self {
        Self {
            disease: disease.to_string(),
            confidence,
            severity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorRule {
    pub name: String,
    pub condition: ColorCondition,
    #[serde(default)]
    pub outcome: Option<RuleOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureThresholds {
    pub sample_pairs: usize,
    pub seed: u64,
    /// Variance above this reads as spotting / lesions
    pub spotting_variance: f64,
    /// Variance below this reads as a uniform coating
    pub uniform_variance: f64,
    pub spotting: RuleOutcome,
    pub uniform: RuleOutcome,
}

impl Default for TextureThresholds {
    fn default() -> Self {
        Self {
            sample_pairs: 100,
            seed: 42,
            spotting_variance: 60.0,
            uniform_variance: 15.0,
            spotting: RuleOutcome::new("Leaf Spot", 0.60, Severity::Moderate),
            uniform: RuleOutcome::new("Powdery Mildew", 0.55, Severity::Mild),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthPenalties {
    pub severe: f64,
    pub moderate: f64,
    pub mild: f64,
    /// Color abnormality with no classifier detection of the same disease
    pub unresolved_color: f64,
    pub texture_abnormality: f64,
    pub healthy_min: f64,
    pub moderate_min: f64,
    pub multiple_issues_min: f64,
}

impl HealthPenalties {
    pub fn for_severity(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Severe => self.severe,
            Severity::Moderate => self.moderate,
            Severity::Mild => self.mild,
        }
    }
}

impl Default for HealthPenalties {
    fn default() -> Self {
        Self {
            severe: 0.4,
            moderate: 0.25,
            mild: 0.15,
            unresolved_color: 0.2,
            texture_abnormality: 0.1,
            healthy_min: 0.7,
            moderate_min: 0.5,
            multiple_issues_min: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringTable {
    /// Classifier labels considered per image
    pub top_k_labels: usize,
    pub max_detections: usize,
    /// Confidence multiplier per matched keyword
    pub keyword_boost: f64,
    pub keyword_confidence_cap: f64,
    /// Upper bound on pixels averaged for the color profile
    pub color_sample_limit: usize,
    pub keyword_rules: Vec<KeywordRule>,
    /// Evaluated in order, first match wins
    pub color_rules: Vec<ColorRule>,
    pub texture: TextureThresholds,
    pub health: HealthPenalties,
}

impl Default for ScoringTable {
    fn default() -> Self {
        Self {
            top_k_labels: 5,
            max_detections: 5,
            keyword_boost: 0.2,
            keyword_confidence_cap: 0.95,
            color_sample_limit: 10_000,
            keyword_rules: default_keyword_rules(),
            color_rules: default_color_rules(),
            texture: TextureThresholds::default(),
            health: HealthPenalties::default(),
        }
    }
}

impl ScoringTable {
    /// Load a table from JSON; missing fields fall back to defaults
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scoring table: {:?}", path))?;

        let table: ScoringTable = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse scoring table JSON: {:?}", path))?;

        if table.color_rules.is_empty() {
            tracing::warn!("Scoring table {:?} has no color rules; color stage disabled", path);
        }

        Ok(table)
    }

    pub fn keyword_rule(&self, disease: &str) -> Option<&KeywordRule> {
        self.keyword_rules
            .iter()
            .find(|r| r.disease.eq_ignore_ascii_case(disease))
    }
}

fn default_keyword_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new("Leaf Blight", &["blight", "necrosis", "wilt", "scorch"], 0.6, Severity::Severe),
        KeywordRule::new("Powdery Mildew", &["mildew", "powder", "fungus", "mold"], 0.55, Severity::Moderate),
        KeywordRule::new("Rust", &["rust", "pustule", "orange"], 0.6, Severity::Moderate),
        KeywordRule::new("Leaf Spot", &["spot", "lesion", "speck", "blotch"], 0.5, Severity::Mild),
        KeywordRule::new("Chlorosis", &["yellow", "chlorosis", "pale", "lemon"], 0.55, Severity::Mild),
        KeywordRule::new("Mosaic Virus", &["mosaic", "mottle", "virus"], 0.7, Severity::Severe),
    ]
}

fn default_color_rules() -> Vec<ColorRule> {
    vec![
        ColorRule {
            name: "healthy".to_string(),
            condition: ColorCondition::Healthy { min_green_ratio: 0.38, min_avg_green: 100.0 },
            outcome: None,
        },
        ColorRule {
            name: "chlorosis".to_string(),
            condition: ColorCondition::Yellowing { min_red: 150.0, min_green: 150.0, max_blue: 100.0 },
            outcome: Some(RuleOutcome::new("Chlorosis", 0.72, Severity::Mild)),
        },
        ColorRule {
            name: "blight".to_string(),
            condition: ColorCondition::Browning { max_green_ratio: 0.33, max_red: 150.0 },
            outcome: Some(RuleOutcome::new("Leaf Blight", 0.68, Severity::Severe)),
        },
        ColorRule {
            name: "powdery_mildew".to_string(),
            condition: ColorCondition::Bright { min_channel: 200.0 },
            outcome: Some(RuleOutcome::new("Powdery Mildew", 0.70, Severity::Moderate)),
        },
        ColorRule {
            name: "rust".to_string(),
            condition: ColorCondition::Reddish { min_red_ratio: 0.42, green_ratio: Bounds::new(0.28, 0.38) },
            outcome: Some(RuleOutcome::new("Rust", 0.65, Severity::Moderate)),
        },
        ColorRule {
            name: "leaf_spot".to_string(),
            condition: ColorCondition::Dark { max_channel: 60.0 },
            outcome: Some(RuleOutcome::new("Leaf Spot", 0.63, Severity::Mild)),
        },
    ]
}
