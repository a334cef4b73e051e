//! Soil water balance and reference evapotranspiration

use serde::Serialize;

pub const DEFAULT_SOIL_CAPACITY_MM: f64 = 100.0;

// Simplified Penman-Monteith constants
const PSYCHROMETRIC_CONSTANT: f64 = 0.665;
const RADIATION_FACTOR: f64 = 0.408;
const WIND_HEIGHT_LOG_ARG: f64 = 67.8 * 10.0 - 5.42;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaterBalance {
    /// mm held in the soil after the period, within [0, capacity]
    pub soil_moisture: f64,
    /// Share of crop demand not met by rain, in [0, 1]
    pub water_stress: f64,
    pub deficit: f64,
    /// Rain beyond demand and storage
    pub surplus: f64,
}

/// Single-period bucket model
pub fn water_balance(rainfall: f64, evapotranspiration: f64, soil_capacity: f64) -> WaterBalance {
    let available = rainfall - evapotranspiration;
    let soil_moisture = available.max(0.0).min(soil_capacity.max(0.0));

    let shortfall = (evapotranspiration - rainfall).max(0.0);
    let water_stress = if evapotranspiration > 0.0 {
        shortfall / evapotranspiration
    } else {
        0.0
    };

    WaterBalance {
        soil_moisture,
        water_stress,
        deficit: shortfall,
        surplus: (rainfall - evapotranspiration - soil_capacity).max(0.0),
    }
}

/// Simplified Penman-Monteith reference evapotranspiration (mm/day).
///
/// * `temperature` - mean air temperature (°C)
/// * `humidity` - relative humidity (%)
/// * `wind_speed` - wind at 10 m (m/s), reduced to 2 m internally
/// * `radiation` - net radiation (MJ/m²/day)
pub fn evapotranspiration_penman(temperature: f64, humidity: f64, wind_speed: f64, radiation: f64) -> f64 {
    let t = temperature;
    let delta = 4098.0 * (0.6108 * (17.27 * t / (t + 237.3)).exp()) / (t + 237.3).powi(2);
    let u2 = wind_speed * 4.87 / WIND_HEIGHT_LOG_ARG.ln();
    let gamma = PSYCHROMETRIC_CONSTANT;

    let et0 = (RADIATION_FACTOR * delta * radiation + gamma * 900.0 / (t + 273.0) * u2 * (0.01 * humidity))
        / (delta + gamma * (1.0 + 0.34 * u2));

    if et0.is_finite() { et0.max(0.0) } else { 0.0 }
}

/// Rough daily ET when only temperatures are known
pub fn estimate_et_from_temperature(avg_temperature: f64) -> f64 {
    (avg_temperature * 0.15).max(0.0)
}
