//! Keyword scoring of classifier labels

use super::scoring_table::ScoringTable;
use super::types::{ClassLabel, DetectionMethod, DiseaseDetection};
use smallvec::SmallVec;

/// Score every keyword rule against the labels.
///
/// A keyword matches when it occurs (case-insensitively) inside a label. The
/// base probability is the highest probability among labels containing any
/// matched keyword, boosted by `keyword_boost` per matched keyword and capped.
pub fn score_keywords(labels: &[ClassLabel], table: &ScoringTable) -> Vec<DiseaseDetection> {
    let lowered: Vec<(String, f64)> = labels
        .iter()
        .map(|l| (l.label.to_lowercase(), l.probability))
        .collect();

    let mut detections = Vec::new();
    for rule in &table.keyword_rules {
        let mut matched: SmallVec<[String; 4]> = SmallVec::new();
        let mut base: f64 = 0.0;

        for keyword in &rule.keywords {
            let needle = keyword.to_lowercase();
            let mut hit = false;
            for (label, p) in &lowered {
                if label.contains(&needle) {
                    hit = true;
                    base = base.max(*p);
                }
            }
            if hit {
                matched.push(keyword.clone());
            }
        }

        if matched.is_empty() {
            continue;
        }

        let confidence = (base * (1.0 + table.keyword_boost * matched.len() as f64)).min(table.keyword_confidence_cap);
        if confidence < rule.threshold {
            tracing::debug!(
                "Keyword rule '{}' below threshold ({:.2} < {:.2})",
                rule.disease,
                confidence,
                rule.threshold
            );
            continue;
        }

        let mut detection = DiseaseDetection::new(&rule.disease, confidence, rule.severity, DetectionMethod::AiClassification);
        detection.matched_keywords = matched;
        detections.push(detection);
    }

    detections
}
