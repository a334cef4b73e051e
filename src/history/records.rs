//! Persisted history record types

use crate::disease::{DiseaseDetection, HealthStatus, ScanReport};
use crate::prediction::YieldPrediction;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub region: Option<String>,
    pub soil: String,
    pub crop: String,
    pub rainfall: f64,
    #[serde(default)]
    pub planting_date: Option<NaiveDate>,
    pub yield_estimate: f64,
    pub risk_level: f64,
}

impl PredictionRecord {
    pub fn from_prediction(prediction: &YieldPrediction, planting_date: Option<NaiveDate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            region: Some(prediction.region.clone()),
            soil: prediction.soil.clone(),
            crop: prediction.crop.clone(),
            rainfall: prediction.rainfall,
            planting_date,
            yield_estimate: prediction.yield_estimate,
            risk_level: prediction.risk_level,
        }
    }
}

/// Scan outcome without the image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub diseases: Vec<DiseaseDetection>,
    pub health_score: f64,
    pub status: HealthStatus,
    pub offline: bool,
}

impl ScanRecord {
    pub fn from_report(report: &ScanReport) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            diseases: report.diseases.clone(),
            health_score: report.health_score,
            status: report.status,
            offline: report.offline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Accurate,
    Partial,
    Inaccurate,
}

impl Rating {
    pub fn score(&self) -> f64 {
        match self {
            Rating::Accurate => 1.0,
            Rating::Partial => 0.5,
            Rating::Inaccurate => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub scan_id: Uuid,
    pub rating: Rating,
    pub timestamp: DateTime<Utc>,
}

/// Mean rating score; `None` without feedback
pub fn accuracy_rate<'a>(feedback: impl IntoIterator<Item = &'a FeedbackRecord>) -> Option<f64> {
    let (sum, n) = feedback
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), f| (sum + f.rating.score(), n + 1));
    (n > 0).then(|| sum / n as f64)
}
