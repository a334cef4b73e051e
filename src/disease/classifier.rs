//! Image classifier seam
//!
//! The scanner does not ship a model. Callers plug in anything that can turn an
//! image into ranked labels; the server defaults to [`OfflineClassifier`], which
//! always reports itself unavailable so scans run on color and texture alone.

use super::types::ClassLabel;
use crate::error::{AgronomistError, Result};
use image::RgbImage;

pub trait ImageClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Ranked labels, best first, at most `top_k`
    fn classify(&self, image: &RgbImage, top_k: usize) -> Result<Vec<ClassLabel>>;
}

/// No model loaded
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineClassifier;

impl ImageClassifier for OfflineClassifier {
    fn name(&self) -> &str {
        "offline"
    }

    fn classify(&self, _image: &RgbImage, _top_k: usize) -> Result<Vec<ClassLabel>> {
        Err(AgronomistError::ClassifierUnavailable("no image model is loaded".to_string()))
    }
}

/// Labels computed elsewhere (a client-side model, a previous run)
#[derive(Debug, Clone)]
pub struct PrecomputedLabels {
    labels: Vec<ClassLabel>,
}

impl PrecomputedLabels {
    pub fn new(mut labels: Vec<ClassLabel>) -> Self {
        labels.retain(|l| l.probability.is_finite());
        labels.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        Self { labels }
    }
}

impl ImageClassifier for PrecomputedLabels {
    fn name(&self) -> &str {
        "precomputed"
    }

    fn classify(&self, _image: &RgbImage, top_k: usize) -> Result<Vec<ClassLabel>> {
        Ok(self.labels.iter().take(top_k).cloned().collect())
    }
}
