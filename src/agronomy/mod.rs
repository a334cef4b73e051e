//! Agronomic calculations
//!
//! - `basic_estimate`: rule-free yield score from temperature, rain and pH
//! - `degree_days`: growing degree days
//! - `water`: bucket water balance and Penman evapotranspiration
//! - `climate_risk`: heat/drought projection under a climate-change factor
//! - `comprehensive`: one report combining the above with yield prediction

pub mod basic_estimate;
pub mod climate_risk;
pub mod comprehensive;
pub mod degree_days;
pub mod water;

pub use basic_estimate::{basic_yield_estimate, BasicYieldEstimate};
pub use climate_risk::{assess_climate_risk, ClimateRiskAssessment, DEFAULT_CLIMATE_CHANGE_FACTOR};
pub use comprehensive::{field_report, FieldConditions, FieldReport};
pub use degree_days::{accumulated_gdd, growing_degree_days, DEFAULT_BASE_TEMPERATURE};
pub use water::{evapotranspiration_penman, water_balance, WaterBalance, DEFAULT_SOIL_CAPACITY_MM};
