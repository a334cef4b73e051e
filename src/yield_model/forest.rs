//! Bagged regression forest
//!
//! Each tree is fitted on a bootstrap resample drawn from its own seeded
//! `StdRng` (`seed + tree index`), so training is reproducible while trees are
//! built in parallel with rayon.

use super::tree::{RegressionTree, TreeParams};
use crate::error::{AgronomistError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
    /// Folds for the training-time accuracy estimate
    pub cv_folds: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 1,
            seed: 42,
            cv_folds: 5,
        }
    }
}

/// Bounds on caller-supplied parameters
const MAX_ESTIMATORS: usize = 500;
const MAX_DEPTH: usize = 32;
const MAX_FOLDS: usize = 20;

impl ForestParams {
    pub fn check(&self) -> Result<()> {
        if self.n_estimators == 0 || self.n_estimators > MAX_ESTIMATORS {
            return Err(AgronomistError::InvalidInput(format!(
                "n_estimators must be 1-{}, got {}",
                MAX_ESTIMATORS, self.n_estimators
            )));
        }
        if self.max_depth > MAX_DEPTH {
            return Err(AgronomistError::InvalidInput(format!(
                "max_depth must be at most {}, got {}",
                MAX_DEPTH, self.max_depth
            )));
        }
        if !(2..=MAX_FOLDS).contains(&self.cv_folds) {
            return Err(AgronomistError::InvalidInput(format!(
                "cv_folds must be 2-{}, got {}",
                MAX_FOLDS, self.cv_folds
            )));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

/// Feature rows with one target each; every row has the same width.
#[derive(Debug, Clone)]
pub struct TrainingData {
    features: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl TrainingData {
    pub fn new(features: Vec<Vec<f64>>, targets: Vec<f64>) -> Result<Self> {
        let invalid = |msg: String| Err(AgronomistError::InvalidInput(msg));

        let Some(width) = features.first().map(Vec::len) else {
            return invalid("training needs at least one feature row".to_string());
        };
        if width == 0 {
            return invalid("feature rows must not be empty".to_string());
        }
        if features.len() != targets.len() {
            return invalid(format!(
                "{} feature rows but {} target yields",
                features.len(),
                targets.len()
            ));
        }
        if let Some(row) = features.iter().position(|r| r.len() != width) {
            return invalid(format!("row {} has {} features, expected {}", row, features[row].len(), width));
        }
        if features.iter().flatten().chain(&targets).any(|v| !v.is_finite()) {
            return invalid("features and targets must be finite numbers".to_string());
        }

        Ok(Self { features, targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Fit on every row. Returns the forest and normalised feature importances.
    pub fn fit(data: &TrainingData, params: &ForestParams) -> (Self, Vec<f64>) {
        let rows: Vec<usize> = (0..data.len()).collect();
        Self::fit_rows(data, &rows, params)
    }

    fn fit_rows(data: &TrainingData, rows: &[usize], params: &ForestParams) -> (Self, Vec<f64>) {
        let tree_params = params.tree_params();
        let n_trees = params.n_estimators.max(1);

        let fitted: Vec<(RegressionTree, Vec<f64>)> = (0..n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let bootstrap: Vec<usize> = (0..rows.len()).map(|_| rows[rng.gen_range(0..rows.len())]).collect();
                RegressionTree::fit(&data.features, &data.targets, &bootstrap, &tree_params)
            })
            .collect();

        let n_features = data.n_features();
        let mut importances = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(fitted.len());
        for (tree, tree_importances) in fitted {
            let total: f64 = tree_importances.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&tree_importances) {
                    *acc += v / total;
                }
            }
            trees.push(tree);
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        (Self { n_features, trees }, importances)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// One prediction per tree; `None` when the row width is wrong.
    pub fn tree_predictions(&self, row: &[f64]) -> Option<Vec<f64>> {
        if row.len() != self.n_features {
            return None;
        }
        self.trees.iter().map(|tree| tree.predict(row)).collect()
    }

    pub fn predict(&self, row: &[f64]) -> Option<f64> {
        let predictions = self.tree_predictions(row)?;
        Some(mean(&predictions))
    }

    pub fn is_well_formed(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(|t| t.is_well_formed(self.n_features))
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Coefficient of determination. A constant `y_true` scores 1.0 when matched
/// exactly and 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let m = mean(y_true);
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - m).powi(2)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// R² per fold over contiguous, unshuffled folds. The first `n % k` folds hold
/// one extra row.
pub fn cross_validate(data: &TrainingData, params: &ForestParams) -> Result<Vec<f64>> {
    let n = data.len();
    let k = params.cv_folds.max(2);
    if n < k {
        return Err(AgronomistError::InvalidInput(format!(
            "need at least {} samples for {}-fold cross-validation, got {}",
            k, k, n
        )));
    }

    let mut scores = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = n / k + usize::from(fold < n % k);
        let test = start..start + size;
        start += size;

        let train_rows: Vec<usize> = (0..n).filter(|i| !test.contains(i)).collect();
        let (forest, _) = RandomForest::fit_rows(data, &train_rows, params);

        let mut truth = Vec::with_capacity(size);
        let mut predicted = Vec::with_capacity(size);
        for row in test {
            if let Some(p) = forest.predict(&data.features[row]) {
                truth.push(data.targets[row]);
                predicted.push(p);
            }
        }
        scores.push(r2_score(&truth, &predicted));
    }

    Ok(scores)
}
