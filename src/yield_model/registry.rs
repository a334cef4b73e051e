//! Named yield models persisted as JSON
//!
//! Each model lives in `<dir>/<name>.json`. Models are loaded at startup and
//! looked up by name; `default` and `demo_model` fall back to a fixed linear
//! formula until one has been trained.

use super::forest::{cross_validate, mean, std_dev, ForestParams, RandomForest, TrainingData};
use crate::error::{AgronomistError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "default";
const FALLBACK_MODELS: [&str; 2] = [DEFAULT_MODEL, "demo_model"];
const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub trained_at: DateTime<Utc>,
    pub n_samples: usize,
    pub n_features: usize,
    /// Mean cross-validated R²
    pub cv_mean: f64,
    pub cv_std: f64,
    pub feature_importance: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub name: String,
    pub metadata: ModelMetadata,
    pub forest: RandomForest,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub model_name: String,
    /// Mean cross-validated R²
    pub model_accuracy: f64,
    pub cv_std: f64,
    pub feature_importance: Vec<f64>,
    pub training_samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Trained,
    /// Linear placeholder used before any training
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPrediction {
    pub model_name: String,
    pub predicted_yield: f64,
    /// `1 − std/prediction` over the trees, floored at 0
    pub confidence: f64,
    /// ±2 standard deviations of the per-tree predictions
    pub prediction_interval: Option<[f64; 2]>,
    pub prediction_std: Option<f64>,
    pub source: PredictionSource,
}

/// Names become file names, so only `[A-Za-z0-9_-]` is allowed.
pub fn validate_model_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(AgronomistError::InvalidInput(format!(
            "model name must be 1-{} characters of letters, digits, '_' or '-': {:?}",
            MAX_NAME_LEN, name
        )))
    }
}

impl TrainedModel {
    pub fn train(name: &str, data: &TrainingData, params: &ForestParams) -> Result<Self> {
        validate_model_name(name)?;
        params.check()?;
        let cv_scores = cross_validate(data, params)?;
        let (forest, feature_importance) = RandomForest::fit(data, params);

        tracing::info!(
            "Trained model '{}' on {} samples: cv R² {:.3} ± {:.3}",
            name,
            data.len(),
            mean(&cv_scores),
            std_dev(&cv_scores)
        );

        Ok(Self {
            name: name.to_string(),
            metadata: ModelMetadata {
                trained_at: Utc::now(),
                n_samples: data.len(),
                n_features: data.n_features(),
                cv_mean: mean(&cv_scores),
                cv_std: std_dev(&cv_scores),
                feature_importance,
            },
            forest,
        })
    }

    pub fn summary(&self) -> TrainingSummary {
        TrainingSummary {
            model_name: self.name.clone(),
            model_accuracy: self.metadata.cv_mean,
            cv_std: self.metadata.cv_std,
            feature_importance: self.metadata.feature_importance.clone(),
            training_samples: self.metadata.n_samples,
        }
    }

    pub fn predict(&self, features: &[f64]) -> Result<ModelPrediction> {
        if features.iter().any(|v| !v.is_finite()) {
            return Err(AgronomistError::InvalidInput("features must be finite numbers".to_string()));
        }
        let per_tree = self.forest.tree_predictions(features).ok_or_else(|| {
            AgronomistError::InvalidInput(format!(
                "model '{}' expects {} features, got {}",
                self.name,
                self.forest.n_features(),
                features.len()
            ))
        })?;

        let predicted = mean(&per_tree);
        let spread = std_dev(&per_tree);
        let confidence = if predicted > 0.0 {
            (1.0 - spread / predicted).max(0.0)
        } else {
            0.0
        };

        Ok(ModelPrediction {
            model_name: self.name.clone(),
            predicted_yield: predicted,
            confidence,
            prediction_interval: Some([predicted - 2.0 * spread, predicted + 2.0 * spread]),
            prediction_std: Some(spread),
            source: PredictionSource::Trained,
        })
    }
}

/// `3.0 + 0.05·avg_temp + 0.002·rainfall`; missing features count as 0.
pub fn fallback_prediction(name: &str, features: &[f64]) -> ModelPrediction {
    let feature = |i: usize| features.get(i).copied().filter(|v| v.is_finite()).unwrap_or(0.0);
    ModelPrediction {
        model_name: name.to_string(),
        predicted_yield: 3.0 + feature(0) * 0.05 + feature(1) * 0.002,
        confidence: 0.0,
        prediction_interval: None,
        prediction_std: None,
        source: PredictionSource::Fallback,
    }
}

pub struct ModelRegistry {
    dir: PathBuf,
    models: BTreeMap<String, Arc<TrainedModel>>,
}

impl ModelRegistry {
    /// Open (creating if needed) the model directory and load every `*.json` model.
    ///
    /// Unreadable, corrupt or malformed model files are logged and skipped.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| AgronomistError::Io {
            path: dir.clone(),
            source,
        })?;
        let entries = fs::read_dir(&dir).map_err(|source| AgronomistError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut models = BTreeMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match load_model(&path) {
                Ok(model) => {
                    models.insert(model.name.clone(), Arc::new(model));
                }
                Err(e) => tracing::warn!("Skipping model file {:?}: {}", path, e),
            }
        }

        tracing::info!("Model registry at {:?}: {} model(s)", dir, models.len());
        Ok(Self { dir, models })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self, name: &str) -> Option<Arc<TrainedModel>> {
        self.models.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(|k| k.as_str())
    }

    pub fn metadata(&self) -> BTreeMap<&str, &ModelMetadata> {
        self.models
            .iter()
            .map(|(name, model)| (name.as_str(), &model.metadata))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Write the model to disk, then make it available, replacing any model of
    /// the same name.
    pub fn insert(&mut self, model: TrainedModel) -> Result<Arc<TrainedModel>> {
        validate_model_name(&model.name)?;
        let path = self.dir.join(format!("{}.json", model.name));
        let bytes = serde_json::to_vec(&model).map_err(|source| AgronomistError::Parse {
            document: model.name.clone(),
            source,
        })?;
        fs::write(&path, bytes).map_err(|source| AgronomistError::Io { path, source })?;

        let model = Arc::new(model);
        self.models.insert(model.name.clone(), model.clone());
        Ok(model)
    }

    /// Predict with a trained model, or the fallback formula for the built-in names.
    pub fn predict(&self, name: &str, features: &[f64]) -> Result<ModelPrediction> {
        match self.models.get(name) {
            Some(model) => model.predict(features),
            None if FALLBACK_MODELS.contains(&name) => {
                tracing::debug!("Model '{}' not trained yet; using fallback formula", name);
                Ok(fallback_prediction(name, features))
            }
            None => Err(AgronomistError::ModelNotFound(name.to_string())),
        }
    }
}

fn load_model(path: &Path) -> Result<TrainedModel> {
    let contents = fs::read_to_string(path).map_err(|source| AgronomistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let model: TrainedModel = serde_json::from_str(&contents).map_err(|source| AgronomistError::Parse {
        document: path.display().to_string(),
        source,
    })?;

    validate_model_name(&model.name)?;
    if !model.forest.is_well_formed() {
        return Err(AgronomistError::InvalidInput(format!(
            "model '{}' has a malformed tree",
            model.name
        )));
    }
    Ok(model)
}
