//! Mini Agronomist
//!
//! Crop yield estimates and plant-disease screening from static reference
//! tables and image heuristics.
//!
//! - `reference/`: JSON reference data (crop rules, crop and region profiles) and its validator
//! - `prediction/`: form validation and the rule-based yield predictor
//! - `agronomy/`: degree days, water balance, evapotranspiration, climate risk
//! - `disease/`: classifier seam plus keyword, color and texture heuristics
//! - `history/`: capped prediction/scan/feedback logs persisted as JSON
//! - `yield_model/`: random-forest yield models trained on user data
//! - `api_server`: Axum HTTP API (feature `api`)

pub mod agronomy;
pub mod config;
pub mod disease;
pub mod error;
pub mod history;
pub mod prediction;
pub mod reference;
pub mod yield_model;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use config::AppConfig;
pub use disease::{DiseaseDetector, ScanReport, ScoringTable};
pub use error::{AgronomistError, Result};
pub use history::HistoryStore;
pub use prediction::{PredictionForm, YieldPrediction, YieldPredictor};
pub use reference::ReferenceData;
pub use yield_model::ModelRegistry;

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
