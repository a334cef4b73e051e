//! Trained yield models
//!
//! Random-forest regressors fitted on user-supplied feature rows, kept by name
//! and persisted as JSON so they survive restarts.
//!
//! - `tree`: CART regression tree
//! - `forest`: bootstrap-aggregated forest, cross-validation, R²
//! - `registry`: named models on disk plus the untrained fallback

pub mod forest;
pub mod registry;
pub mod tree;

pub use forest::{cross_validate, r2_score, ForestParams, RandomForest, TrainingData};
pub use registry::{
    fallback_prediction, validate_model_name, ModelMetadata, ModelPrediction, ModelRegistry, PredictionSource,
    TrainedModel, TrainingSummary, DEFAULT_MODEL,
};
pub use tree::{RegressionTree, TreeParams};
