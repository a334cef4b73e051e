//! Yield Predictor
//!
//! Rule lookup plus rain-window interpolation:
//!
//! | Rainfall vs window | Yield estimate             | Risk |
//! |--------------------|----------------------------|------|
//! | within (inclusive) | midpoint of yield range    | 0.2  |
//! | below              | low bound                  | 0.7  |
//! | above              | high bound − 0.3           | 0.5  |
//!
//! A missing (crop, soil) rule yields `None`, which callers report as
//! "no prediction available" rather than as a failure.

use super::range_fit::{compare_to_range, RangeFit};
use super::risk::{RiskBand, YieldConstants};
use crate::reference::ReferenceData;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct YieldPrediction {
    pub region: String,
    pub crop: String,
    pub soil: String,
    /// mm/week
    pub rainfall: f64,
    /// t/ha
    pub yield_estimate: f64,
    pub risk_level: f64,
    pub risk_band: RiskBand,
    pub rain_fit: RangeFit,
    pub tip: String,
    pub source: String,
}

/// One prediction request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldQuery {
    #[serde(default)]
    pub region: Option<String>,
    pub crop: String,
    pub soil: String,
    pub rainfall: f64,
}

pub struct YieldPredictor {
    reference: Arc<ReferenceData>,
    constants: YieldConstants,
}

impl YieldPredictor {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self::with_constants(reference, YieldConstants::default())
    }

    pub fn with_constants(reference: Arc<ReferenceData>, constants: YieldConstants) -> Self {
        Self { reference, constants }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Predict using the first region (by name) that has a rule for (crop, soil)
    pub fn predict(&self, soil: &str, crop: &str, rainfall: f64) -> Option<YieldPrediction> {
        self.predict_in(None, soil, crop, rainfall)
    }

    /// Non-finite rainfall is treated like a missing rule.
    pub fn predict_in(
        &self,
        region: Option<&str>,
        soil: &str,
        crop: &str,
        rainfall: f64,
    ) -> Option<YieldPrediction> {
        if !rainfall.is_finite() {
            tracing::debug!("Rejecting non-finite rainfall {}", rainfall);
            return None;
        }

        let Some(hit) = self.reference.rule(region, crop, soil) else {
            tracing::debug!("No rule for crop='{}' soil='{}' region={:?}", crop, soil, region);
            return None;
        };

        let rule = hit.rule;
        let c = &self.constants;
        let rain_fit = compare_to_range(rainfall, rule.rain_window).fit;

        let (yield_estimate, risk_level) = match rain_fit {
            RangeFit::Within => (rule.yield_range.midpoint(), c.risk_within),
            RangeFit::Below => (rule.yield_range.low, c.risk_below),
            RangeFit::Above => (rule.yield_range.high - c.over_water_offset, c.risk_above),
        };

        Some(YieldPrediction {
            region: hit.region.to_string(),
            crop: crop.trim().to_lowercase(),
            soil: soil.trim().to_lowercase(),
            rainfall,
            yield_estimate,
            risk_level,
            risk_band: RiskBand::from_level(risk_level, c),
            rain_fit,
            tip: rule.tip.clone(),
            source: rule.source.clone(),
        })
    }

    pub fn predict_query(&self, query: &YieldQuery) -> Option<YieldPrediction> {
        self.predict_in(query.region.as_deref(), &query.soil, &query.crop, query.rainfall)
    }

    /// Results are in query order
    pub fn predict_batch(&self, queries: &[YieldQuery]) -> Vec<Option<YieldPrediction>> {
        queries
            .par_iter()
            .map(|query| self.predict_query(query))
            .collect()
    }
}
