//! Yield prediction: form validation, rule lookup, rain-window interpolation

pub mod form;
pub mod predictor;
pub mod range_fit;
pub mod risk;

pub use form::{FormIssue, FormValidation, IssueSeverity, PredictionForm, ValidatedForm};
pub use predictor::{YieldPrediction, YieldPredictor, YieldQuery};
pub use range_fit::{compare_to_range, RangeComparison, RangeFit};
pub use risk::{RiskBand, YieldConstants};
