//! Comprehensive field report
//!
//! Combines degree days, a temperature-based ET estimate, the water balance, the
//! yield rule engine and the crop/region profiles into one response.

use super::basic_estimate::{basic_yield_estimate, BasicYieldEstimate};
use super::degree_days::{growing_degree_days, DEFAULT_BASE_TEMPERATURE};
use super::water::{estimate_et_from_temperature, water_balance, WaterBalance, DEFAULT_SOIL_CAPACITY_MM};
use crate::error::{AgronomistError, Result};
use crate::prediction::{compare_to_range, RangeComparison, YieldPrediction, YieldPredictor};
use crate::reference::{ClimateTier, Photosynthesis};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

fn default_soil_ph() -> f64 {
    7.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConditions {
    pub crop: String,
    pub region: String,
    pub soil_type: String,
    /// °C
    pub temperature_min: f64,
    /// °C
    pub temperature_max: f64,
    /// mm/week
    pub rainfall: f64,
    #[serde(default = "default_soil_ph")]
    pub soil_ph: f64,
    #[serde(default)]
    pub planting_date: Option<NaiveDate>,
}

impl FieldConditions {
    pub fn check(&self) -> Result<()> {
        let in_range = |v: f64, lo: f64, hi: f64| v.is_finite() && (lo..=hi).contains(&v);

        if !in_range(self.temperature_min, -50.0, 60.0) || !in_range(self.temperature_max, -50.0, 60.0) {
            return Err(AgronomistError::InvalidInput("temperatures must be within -50..60 °C".to_string()));
        }
        if self.temperature_min > self.temperature_max {
            return Err(AgronomistError::InvalidInput(
                "temperature_min must not exceed temperature_max".to_string(),
            ));
        }
        if !in_range(self.rainfall, 0.0, 5000.0) {
            return Err(AgronomistError::InvalidInput("rainfall must be within 0..5000 mm".to_string()));
        }
        if !in_range(self.soil_ph, 3.0, 11.0) {
            return Err(AgronomistError::InvalidInput("soil_ph must be within 3..11".to_string()));
        }
        Ok(())
    }

    pub fn average_temperature(&self) -> f64 {
        (self.temperature_min + self.temperature_max) / 2.0
    }

    /// Feature row for trained yield models:
    /// `[avg_temp, rainfall, soil_ph, gdd, soil_moisture]`
    pub fn model_features(&self, report: &FieldReport) -> [f64; 5] {
        [
            self.average_temperature(),
            self.rainfall,
            self.soil_ph,
            report.gdd,
            report.water_balance.soil_moisture,
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CropFit {
    pub scientific_name: String,
    pub photosynthesis: Photosynthesis,
    pub temperature: RangeComparison,
    pub soil_ph: RangeComparison,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionClimate {
    pub koppen: String,
    pub tier: ClimateTier,
    pub tier_name: &'static str,
    pub annual_rainfall: f64,
    /// Mean of the monthly air temperatures (°C)
    pub mean_temperature: f64,
    /// Typical mm/week in the planting month, when a date was given
    pub planting_month_rainfall: Option<f64>,
    pub planting_month_temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldReport {
    pub gdd: f64,
    pub base_temperature: f64,
    pub estimated_et: f64,
    pub water_balance: WaterBalance,
    pub prediction: Option<YieldPrediction>,
    pub basic_estimate: BasicYieldEstimate,
    pub crop_fit: Option<CropFit>,
    pub region_climate: Option<RegionClimate>,
}

pub fn field_report(predictor: &YieldPredictor, conditions: &FieldConditions) -> Result<FieldReport> {
    conditions.check()?;

    let reference = predictor.reference();
    let profile = reference.crop_profile(&conditions.crop);
    let base_temperature = profile
        .map(|p| p.base_temperature)
        .unwrap_or(DEFAULT_BASE_TEMPERATURE);

    let gdd = growing_degree_days(conditions.temperature_min, conditions.temperature_max, base_temperature);
    let estimated_et = estimate_et_from_temperature(conditions.average_temperature());
    let water_balance = water_balance(conditions.rainfall, estimated_et, DEFAULT_SOIL_CAPACITY_MM);

    let prediction = predictor.predict_in(
        Some(conditions.region.as_str()),
        &conditions.soil_type,
        &conditions.crop,
        conditions.rainfall,
    );

    let basic_estimate = basic_yield_estimate(conditions.average_temperature(), conditions.rainfall, conditions.soil_ph);

    let crop_fit = profile.map(|p| CropFit {
        scientific_name: p.scientific_name.clone(),
        photosynthesis: p.photosynthesis,
        temperature: compare_to_range(conditions.average_temperature(), p.temperature_range),
        soil_ph: compare_to_range(conditions.soil_ph, p.ph_range),
    });

    let region_climate = reference.region_profile(&conditions.region).map(|r| {
        let tier = r.climate_tier();
        RegionClimate {
            koppen: r.climate.clone(),
            tier,
            tier_name: tier.display_name(),
            annual_rainfall: r.annual_rainfall(),
            mean_temperature: r.mean_temperature(),
            planting_month_rainfall: conditions
                .planting_date
                .and_then(|d| r.weekly_rainfall(d.month())),
            planting_month_temperature: conditions
                .planting_date
                .and_then(|d| r.temperature_for_month(d.month())),
        }
    });

    if prediction.is_none() {
        tracing::info!(
            "No yield rule for {}/{}/{}; report carries agronomy only",
            conditions.region,
            conditions.crop,
            conditions.soil_type
        );
    }

    Ok(FieldReport {
        gdd,
        base_temperature,
        estimated_et,
        water_balance,
        prediction,
        basic_estimate,
        crop_fit,
        region_climate,
    })
}
