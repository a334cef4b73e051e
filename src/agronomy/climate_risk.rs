//! Climate risk projection
//!
//! Scales historical temperature and rainfall series by a climate-change factor
//! (temperature × factor, rainfall × (2 − factor)) and reports how heat and
//! drought exposure shift.
//!
//! The two series are summarised independently, so their lengths may differ
//! (daily temperatures against monthly rainfall totals, for instance).

use crate::error::{AgronomistError, Result};
use serde::Serialize;

pub const DEFAULT_CLIMATE_CHANGE_FACTOR: f64 = 1.02;
pub const EXTREME_HEAT_C: f64 = 35.0;
pub const DROUGHT_RAINFALL_MM: f64 = 50.0;

#[derive(Debug, Clone, Serialize)]
pub struct CurrentClimate {
    pub mean_temp: f64,
    pub temp_std: f64,
    pub mean_rainfall: f64,
    pub rainfall_std: f64,
    pub extreme_heat_days: usize,
    /// Share of rainfall observations below the drought threshold
    pub drought_risk: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectedClimate {
    pub projected_mean_temp: f64,
    pub projected_rainfall: f64,
    pub projected_extreme_heat: usize,
    pub projected_drought_risk: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskChanges {
    /// Relative change in extreme-heat days
    pub heat_stress_increase: f64,
    pub drought_risk_increase: f64,
    pub temperature_increase: f64,
    pub rainfall_change: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClimateRiskAssessment {
    pub current: CurrentClimate,
    pub projected: ProjectedClimate,
    pub risk_changes: RiskChanges,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

fn share_below(values: &[f64], threshold: f64) -> f64 {
    values.iter().filter(|v| **v < threshold).count() as f64 / values.len() as f64
}

fn count_above(values: &[f64], threshold: f64) -> usize {
    values.iter().filter(|v| **v > threshold).count()
}

pub fn assess_climate_risk(
    temperatures: &[f64],
    rainfall: &[f64],
    climate_change_factor: f64,
) -> Result<ClimateRiskAssessment> {
    if temperatures.is_empty() || rainfall.is_empty() {
        return Err(AgronomistError::InvalidInput(
            "climate risk needs at least one temperature and one rainfall observation".to_string(),
        ));
    }
    if !climate_change_factor.is_finite() || climate_change_factor <= 0.0 {
        return Err(AgronomistError::InvalidInput(format!(
            "climate change factor must be positive, got {}",
            climate_change_factor
        )));
    }

    let current = CurrentClimate {
        mean_temp: mean(temperatures),
        temp_std: std_dev(temperatures),
        mean_rainfall: mean(rainfall),
        rainfall_std: std_dev(rainfall),
        extreme_heat_days: count_above(temperatures, EXTREME_HEAT_C),
        drought_risk: share_below(rainfall, DROUGHT_RAINFALL_MM),
    };

    let future_temps: Vec<f64> = temperatures.iter().map(|t| t * climate_change_factor).collect();
    let future_rain: Vec<f64> = rainfall.iter().map(|r| r * (2.0 - climate_change_factor)).collect();

    let projected = ProjectedClimate {
        projected_mean_temp: mean(&future_temps),
        projected_rainfall: mean(&future_rain),
        projected_extreme_heat: count_above(&future_temps, EXTREME_HEAT_C),
        projected_drought_risk: share_below(&future_rain, DROUGHT_RAINFALL_MM),
    };

    let heat_days_now = current.extreme_heat_days as f64;
    let risk_changes = RiskChanges {
        heat_stress_increase: (projected.projected_extreme_heat as f64 - heat_days_now) / heat_days_now.max(1.0),
        drought_risk_increase: projected.projected_drought_risk - current.drought_risk,
        temperature_increase: projected.projected_mean_temp - current.mean_temp,
        rainfall_change: projected.projected_rainfall - current.mean_rainfall,
    };

    Ok(ClimateRiskAssessment {
        current,
        projected,
        risk_changes,
    })
}
