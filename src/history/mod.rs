//! Prediction, scan and feedback history
//!
//! Append-only capped logs (FIFO eviction) persisted as JSON arrays, one file
//! per log, under a byte quota.

pub mod capped;
pub mod records;
pub mod store;

pub use capped::CappedLog;
pub use records::{accuracy_rate, FeedbackRecord, PredictionRecord, Rating, ScanRecord};
pub use store::{HistoryKey, HistoryStore, Recorded, SaveOutcome, FEEDBACK_CAPACITY, PREDICTION_CAPACITY, SCAN_CAPACITY};
