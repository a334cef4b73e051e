//! Plant health score and status bands

use super::scoring_table::HealthPenalties;
use super::types::DiseaseDetection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    HealthyOrMinor,
    Moderate,
    MultipleIssues,
    Critical,
}

impl HealthStatus {
    pub fn from_score(score: f64, penalties: &HealthPenalties) -> Self {
        if score >= penalties.healthy_min {
            HealthStatus::HealthyOrMinor
        } else if score >= penalties.moderate_min {
            HealthStatus::Moderate
        } else if score >= penalties.multiple_issues_min {
            HealthStatus::MultipleIssues
        } else {
            HealthStatus::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::HealthyOrMinor => "Healthy or minor issues",
            HealthStatus::Moderate => "Moderate concern",
            HealthStatus::MultipleIssues => "Multiple issues detected",
            HealthStatus::Critical => "Critical: immediate attention needed",
        }
    }
}

/// Signals beyond the detection list that lower the score
#[derive(Debug, Clone, Copy, Default)]
pub struct AbnormalitySignals {
    /// Color stage flagged a disease no classifier detection confirms
    pub unresolved_color: bool,
    pub texture: bool,
}

/// 1.0 minus per-severity penalties and abnormality penalties, clamped to [0, 1]
pub fn health_score(detections: &[DiseaseDetection], signals: AbnormalitySignals, penalties: &HealthPenalties) -> f64 {
    let mut score = 1.0;
    for d in detections {
        score -= penalties.for_severity(d.severity);
    }
    if signals.unresolved_color {
        score -= penalties.unresolved_color;
    }
    if signals.texture {
        score -= penalties.texture_abnormality;
    }
    f64::clamp(score, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::types::{DetectionMethod, Severity};
    use approx::assert_relative_eq;

    fn det(severity: Severity) -> DiseaseDetection {
        DiseaseDetection::new("x", 0.7, severity, DetectionMethod::ColorAnalysis)
    }

    #[test]
    fn test_no_detections_is_full_health() {
        let p = HealthPenalties::default();
        let score = health_score(&[], AbnormalitySignals::default(), &p);
        assert_relative_eq!(score, 1.0);
        assert_eq!(HealthStatus::from_score(score, &p), HealthStatus::HealthyOrMinor);
    }

    #[test]
    fn test_penalties_add_up() {
        let p = HealthPenalties::default();
        let signals = AbnormalitySignals { unresolved_color: true, texture: true };
        let score = health_score(&[det(Severity::Moderate)], signals, &p);
        // 1 - 0.25 - 0.2 - 0.1
        assert_relative_eq!(score, 0.45, epsilon = 1e-9);
        assert_eq!(HealthStatus::from_score(score, &p), HealthStatus::MultipleIssues);
    }

    #[test]
    fn test_score_clamped_at_zero() {
        let p = HealthPenalties::default();
        let detections = vec![det(Severity::Severe), det(Severity::Severe), det(Severity::Severe)];
        let signals = AbnormalitySignals { unresolved_color: true, texture: true };
        let score = health_score(&detections, signals, &p);
        assert_relative_eq!(score, 0.0);
        assert_eq!(HealthStatus::from_score(score, &p), HealthStatus::Critical);
    }

    #[test]
    fn test_status_bands() {
        let p = HealthPenalties::default();
        assert_eq!(HealthStatus::from_score(0.7, &p), HealthStatus::HealthyOrMinor);
        assert_eq!(HealthStatus::from_score(0.69, &p), HealthStatus::Moderate);
        assert_eq!(HealthStatus::from_score(0.5, &p), HealthStatus::Moderate);
        assert_eq!(HealthStatus::from_score(0.3, &p), HealthStatus::MultipleIssues);
        assert_eq!(HealthStatus::from_score(0.29, &p), HealthStatus::Critical);
    }
}
