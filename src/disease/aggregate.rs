//! Merging detections from the three stages

use super::types::DiseaseDetection;

/// Merge detections that name the same disease (case-insensitive), then keep
/// the `limit` most confident.
///
/// Merged entries take the highest confidence and the most severe severity,
/// union the methods and keywords, and keep the first color profile seen.
/// Ordering is confidence descending, then name, so merging an already merged
/// list returns it unchanged.
pub fn merge_detections(detections: Vec<DiseaseDetection>, limit: usize) -> Vec<DiseaseDetection> {
    let mut merged: Vec<DiseaseDetection> = Vec::with_capacity(detections.len());

    for detection in detections {
        match merged.iter_mut().find(|m| m.same_disease(&detection.disease_name)) {
            Some(existing) => {
                existing.confidence = existing.confidence.max(detection.confidence);
                existing.severity = existing.severity.max(detection.severity);
                existing.method = existing.method.union(detection.method);
                for keyword in detection.matched_keywords {
                    if !existing.matched_keywords.contains(&keyword) {
                        existing.matched_keywords.push(keyword);
                    }
                }
                if existing.color_profile.is_none() {
                    existing.color_profile = detection.color_profile;
                }
            }
            None => merged.push(detection),
        }
    }

    merged.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.disease_name.to_lowercase().cmp(&b.disease_name.to_lowercase()))
    });
    merged.truncate(limit);
    merged
}
