//! Plant disease detection
//!
//! Heuristic pipeline layered on an optional image classifier:
//! - `classifier`: the `ImageClassifier` seam and built-in implementations
//! - `keyword`: disease keywords matched against classifier labels
//! - `color`: average-color profile and ordered color rules
//! - `texture`: seeded adjacent-pixel variance sampling
//! - `aggregate`: merge by disease name, top-N
//! - `health`: health score and status bands
//! - `pipeline`: `DiseaseDetector` tying the stages together
//!
//! All tunable constants are in `scoring_table::ScoringTable`.

pub mod aggregate;
pub mod classifier;
pub mod color;
pub mod health;
pub mod keyword;
pub mod pipeline;
pub mod scoring_table;
pub mod texture;
pub mod types;

pub use aggregate::merge_detections;
pub use classifier::{ImageClassifier, OfflineClassifier, PrecomputedLabels};
pub use health::HealthStatus;
pub use pipeline::{DiseaseDetector, ScanReport};
pub use scoring_table::ScoringTable;
pub use texture::{TexturePattern, TextureReading};
pub use types::{ClassLabel, ColorProfile, DetectionMethod, DiseaseDetection, MethodSet, Severity};
