//! Disease Detector
//!
//! Runs the full scan on one image:
//! 1. Classifier pass (top-K labels); failure switches to offline mode
//! 2. Keyword scoring of the labels
//! 3. Color-ratio rules
//! 4. Texture sampling
//! 5. Merge + top-N
//! 6. Health score and status
//!
//! Only an undecodable or empty image is an error. Every other failure
//! degrades the report instead of aborting it.

use super::aggregate::merge_detections;
use super::classifier::{ImageClassifier, OfflineClassifier};
use super::color::{color_profile, evaluate_color_rules};
use super::health::{health_score, AbnormalitySignals, HealthStatus};
use super::keyword::score_keywords;
use super::scoring_table::ScoringTable;
use super::texture::{analyze_texture, texture_detection, TextureReading};
use super::types::{ClassLabel, ColorProfile, DiseaseDetection};
use crate::error::{AgronomistError, Result};
use image::RgbImage;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub diseases: Vec<DiseaseDetection>,
    pub health_score: f64,
    pub status: HealthStatus,
    pub status_label: &'static str,
    /// True when the classifier was unavailable and only color/texture ran
    pub offline: bool,
    pub labels: Vec<ClassLabel>,
    pub color_profile: ColorProfile,
    pub color_rule: Option<String>,
    pub texture: TextureReading,
}

pub struct DiseaseDetector {
    table: ScoringTable,
    classifier: Arc<dyn ImageClassifier>,
}

impl Default for DiseaseDetector {
    fn default() -> Self {
        Self::new(ScoringTable::default(), Arc::new(OfflineClassifier))
    }
}

impl DiseaseDetector {
    pub fn new(table: ScoringTable, classifier: Arc<dyn ImageClassifier>) -> Self {
        Self { table, classifier }
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn analyze(&self, image: &RgbImage) -> Result<ScanReport> {
        self.analyze_with(image, self.classifier.as_ref())
    }

    /// Decode PNG/JPEG/WebP bytes and analyze
    pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<ScanReport> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        self.analyze(&image)
    }

    pub fn analyze_bytes_with(&self, bytes: &[u8], classifier: &dyn ImageClassifier) -> Result<ScanReport> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        self.analyze_with(&image, classifier)
    }

    /// Analyze with an explicit classifier instead of the configured one
    pub fn analyze_with(&self, image: &RgbImage, classifier: &dyn ImageClassifier) -> Result<ScanReport> {
        let start = Instant::now();
        let table = &self.table;

        let profile = color_profile(image, table.color_sample_limit).ok_or(AgronomistError::EmptyImage)?;

        let (labels, offline) = match classifier.classify(image, table.top_k_labels) {
            Ok(mut labels) => {
                labels.truncate(table.top_k_labels);
                (labels, false)
            }
            Err(e) => {
                tracing::warn!("Classifier '{}' failed, using color and texture only: {}", classifier.name(), e);
                (Vec::new(), true)
            }
        };

        let keyword_hits = score_keywords(&labels, table);
        let color = evaluate_color_rules(&profile, &table.color_rules);
        let texture = analyze_texture(image, &table.texture);

        let signals = AbnormalitySignals {
            unresolved_color: color
                .detection
                .as_ref()
                .is_some_and(|c| !keyword_hits.iter().any(|k| k.same_disease(&c.disease_name))),
            texture: texture.is_abnormal(),
        };

        let mut candidates = keyword_hits;
        candidates.extend(color.detection);
        candidates.extend(texture_detection(&texture, &table.texture));
        let diseases = merge_detections(candidates, table.max_detections);

        let score = health_score(&diseases, signals, &table.health);
        let status = HealthStatus::from_score(score, &table.health);

        tracing::debug!(
            "Scan: {} disease(s), health {:.2}, offline={} in {:?}",
            diseases.len(),
            score,
            offline,
            start.elapsed()
        );

        Ok(ScanReport {
            diseases,
            health_score: score,
            status,
            status_label: status.label(),
            offline,
            labels,
            color_profile: profile,
            color_rule: color.rule,
            texture,
        })
    }
}
