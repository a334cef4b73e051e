//! Yield risk constants and presentation bands

use serde::{Deserialize, Serialize};

/// Fixed outcomes of the rain-window interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YieldConstants {
    /// Risk when rainfall is inside the window
    pub risk_within: f64,
    /// Risk when under-watered
    pub risk_below: f64,
    /// Risk when over-watered
    pub risk_above: f64,
    /// Subtracted from the optimistic bound when over-watered (t/ha)
    pub over_water_offset: f64,
    /// Upper edge of the "good" band (inclusive)
    pub good_band_max: f64,
    /// Upper edge of the "moderate" band (inclusive)
    pub moderate_band_max: f64,
}

impl Default for YieldConstants {
    fn default() -> Self {
        Self {
            risk_within: 0.2,
            risk_below: 0.7,
            risk_above: 0.5,
            over_water_offset: 0.3,
            good_band_max: 0.3,
            moderate_band_max: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Good,
    Moderate,
    Poor,
}

impl RiskBand {
    pub fn from_level(level: f64, constants: &YieldConstants) -> Self {
        if level <= constants.good_band_max {
            RiskBand::Good
        } else if level <= constants.moderate_band_max {
            RiskBand::Moderate
        } else {
            RiskBand::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::Good => "Low risk",
            RiskBand::Moderate => "Moderate risk",
            RiskBand::Poor => "High risk",
        }
    }
}
