//! Rule-free yield estimate
//!
//! Scores temperature, rainfall and soil pH against fixed optima and scales
//! the mean score to t/ha. Used when no crop rule or trained model applies.

use serde::Serialize;

pub const OPTIMAL_TEMPERATURE_C: f64 = 25.0;
pub const OPTIMAL_RAINFALL_MM: f64 = 500.0;
pub const OPTIMAL_SOIL_PH: f64 = 7.0;
/// Yield (t/ha) at a perfect score
pub const MAX_BASIC_YIELD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorScores {
    pub temperature: f64,
    pub rainfall: f64,
    pub soil_ph: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BasicYieldEstimate {
    /// t/ha, two decimals
    pub estimated_yield: f64,
    pub yield_score: f64,
    pub factor_scores: FactorScores,
    pub confidence: f64,
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

pub fn basic_yield_estimate(avg_temperature: f64, rainfall: f64, soil_ph: f64) -> BasicYieldEstimate {
    let temperature = 1.0 - ((avg_temperature - OPTIMAL_TEMPERATURE_C).abs() / 20.0).min(1.0);
    let rainfall = (rainfall / OPTIMAL_RAINFALL_MM).clamp(0.0, 1.0);
    let soil_ph = 1.0 - ((soil_ph - OPTIMAL_SOIL_PH).abs() / 3.0).min(1.0);

    let score = (temperature + rainfall + soil_ph) / 3.0;

    BasicYieldEstimate {
        estimated_yield: round_to(score * MAX_BASIC_YIELD, 2),
        yield_score: round_to(score, 3),
        factor_scores: FactorScores {
            temperature: round_to(temperature, 3),
            rainfall: round_to(rainfall, 3),
            soil_ph: round_to(soil_ph, 3),
        },
        confidence: round_to(0.6 + score * 0.3, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_optimal_conditions() {
        let e = basic_yield_estimate(25.0, 500.0, 7.0);
        assert_relative_eq!(e.estimated_yield, 5.0);
        assert_relative_eq!(e.yield_score, 1.0);
        assert_relative_eq!(e.confidence, 0.9);
    }

    #[test]
    fn test_half_scores() {
        let e = basic_yield_estimate(35.0, 250.0, 5.5);
        assert_relative_eq!(e.factor_scores.temperature, 0.5);
        assert_relative_eq!(e.factor_scores.rainfall, 0.5);
        assert_relative_eq!(e.factor_scores.soil_ph, 0.5);
        assert_relative_eq!(e.estimated_yield, 2.5);
        assert_relative_eq!(e.confidence, 0.75);
    }

    #[test]
    fn test_scores_floor_at_zero() {
        let e = basic_yield_estimate(60.0, 0.0, 11.0);
        assert_relative_eq!(e.estimated_yield, 0.0);
        assert_relative_eq!(e.confidence, 0.6);

        // Rain beyond the optimum is not rewarded further
        assert_relative_eq!(basic_yield_estimate(25.0, 2000.0, 7.0).factor_scores.rainfall, 1.0);
    }
}
