//! File-backed history store
//!
//! Each log is a JSON array in `<dir>/<key>.json`. Writes go through a byte
//! quota shared by all three files: a save that would exceed it trims the
//! oldest half of that log and retries once, and a second overflow drops the
//! save with a warning. Persistence problems never fail the caller's request:
//! a save that does not reach disk is rolled back in memory as well, so the
//! in-memory logs always match what a reopened store would load.

use super::capped::CappedLog;
use super::records::{accuracy_rate, FeedbackRecord, PredictionRecord, Rating, ScanRecord};
use crate::disease::ScanReport;
use crate::error::{AgronomistError, Result};
use crate::prediction::YieldPrediction;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const PREDICTION_CAPACITY: usize = 10;
pub const SCAN_CAPACITY: usize = 100;
pub const FEEDBACK_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKey {
    Predictions,
    Scans,
    Feedback,
}

impl HistoryKey {
    const ALL: [HistoryKey; 3] = [HistoryKey::Predictions, HistoryKey::Scans, HistoryKey::Feedback];

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryKey::Predictions => "predictions",
            HistoryKey::Scans => "scans",
            HistoryKey::Feedback => "feedback",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Result of a persist attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Saved after dropping this many oldest entries
    Trimmed(usize),
    /// Still over quota after trimming; file left unchanged
    Dropped,
    /// Write failed; file left unchanged
    Failed,
}

impl SaveOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, SaveOutcome::Saved | SaveOutcome::Trimmed(_))
    }
}

/// A record built by one of the `record_*` calls and how its save went.
///
/// When the save was dropped or failed the record is not in the log.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded<T> {
    pub record: T,
    pub outcome: SaveOutcome,
}

impl<T> Recorded<T> {
    pub fn is_saved(&self) -> bool {
        self.outcome.is_persisted()
    }
}

pub struct HistoryStore {
    dir: PathBuf,
    quota_bytes: usize,
    /// Bytes last written per key
    stored_sizes: [usize; 3],
    predictions: CappedLog<PredictionRecord>,
    scans: CappedLog<ScanRecord>,
    feedback: CappedLog<FeedbackRecord>,
}

impl HistoryStore {
    /// Open (creating if needed) the history directory and load existing logs.
    ///
    /// Unreadable or corrupt log files are logged and start empty.
    pub fn open(dir: impl Into<PathBuf>, quota_bytes: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| AgronomistError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut stored_sizes = [0usize; 3];
        for key in HistoryKey::ALL {
            stored_sizes[key.index()] = fs::metadata(file_path(&dir, key))
                .ok()
                .filter(|m| m.is_file())
                .map_or(0, |m| m.len() as usize);
        }

        let store = Self {
            predictions: CappedLog::from_entries(load_entries(&dir, HistoryKey::Predictions), PREDICTION_CAPACITY),
            scans: CappedLog::from_entries(load_entries(&dir, HistoryKey::Scans), SCAN_CAPACITY),
            feedback: CappedLog::from_entries(load_entries(&dir, HistoryKey::Feedback), FEEDBACK_CAPACITY),
            dir,
            quota_bytes,
            stored_sizes,
        };

        tracing::info!(
            "History store at {:?}: {} predictions, {} scans, {} feedback",
            store.dir,
            store.predictions.len(),
            store.scans.len(),
            store.feedback.len()
        );
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn predictions(&self) -> &CappedLog<PredictionRecord> {
        &self.predictions
    }

    pub fn scans(&self) -> &CappedLog<ScanRecord> {
        &self.scans
    }

    pub fn feedback(&self) -> &CappedLog<FeedbackRecord> {
        &self.feedback
    }

    pub fn record_prediction(
        &mut self,
        prediction: &YieldPrediction,
        planting_date: Option<NaiveDate>,
    ) -> Recorded<PredictionRecord> {
        let record = PredictionRecord::from_prediction(prediction, planting_date);
        let snapshot = self.predictions.clone();
        self.predictions.push(record.clone());

        let outcome = self.commit(HistoryKey::Predictions);
        if !outcome.is_persisted() {
            self.predictions = snapshot;
        }
        Recorded { record, outcome }
    }

    pub fn record_scan(&mut self, report: &ScanReport) -> Recorded<ScanRecord> {
        let record = ScanRecord::from_report(report);
        let snapshot = self.scans.clone();
        self.scans.push(record.clone());

        let outcome = self.commit(HistoryKey::Scans);
        if !outcome.is_persisted() {
            self.scans = snapshot;
        }
        Recorded { record, outcome }
    }

    pub fn record_feedback(&mut self, scan_id: Uuid, rating: Rating) -> Recorded<FeedbackRecord> {
        if !self.scans.iter().any(|s| s.id == scan_id) {
            tracing::debug!("Feedback for scan {} not in history", scan_id);
        }
        let record = FeedbackRecord {
            scan_id,
            rating,
            timestamp: Utc::now(),
        };
        let snapshot = self.feedback.clone();
        self.feedback.push(record.clone());

        let outcome = self.commit(HistoryKey::Feedback);
        if !outcome.is_persisted() {
            self.feedback = snapshot;
        }
        Recorded { record, outcome }
    }

    pub fn accuracy_rate(&self) -> Option<f64> {
        accuracy_rate(self.feedback.iter())
    }

    /// Remove every entry under `key`. Refuses unless `confirm` is set.
    pub fn clear(&mut self, key: HistoryKey, confirm: bool) -> Result<usize> {
        if !confirm {
            return Err(AgronomistError::InvalidInput(format!(
                "clearing {} requires confirmation",
                key.as_str()
            )));
        }
        let removed = self.len(key);

        // Clearing only shrinks usage, so it skips the quota check
        let path = file_path(&self.dir, key);
        fs::write(&path, b"[]").map_err(|source| AgronomistError::Io { path, source })?;
        self.stored_sizes[key.index()] = 2;
        match key {
            HistoryKey::Predictions => self.predictions.clear(),
            HistoryKey::Scans => self.scans.clear(),
            HistoryKey::Feedback => self.feedback.clear(),
        };

        tracing::info!("Cleared {} {} entries", removed, key.as_str());
        Ok(removed)
    }

    /// Persist `key`, turning write errors into `SaveOutcome::Failed`
    fn commit(&mut self, key: HistoryKey) -> SaveOutcome {
        match self.persist(key) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("History '{}' not saved: {}", key.as_str(), e);
                SaveOutcome::Failed
            }
        }
    }

    /// Write one log, applying the quota policy. Trims happen in memory;
    /// callers restore their snapshot when the outcome is not persisted.
    fn persist(&mut self, key: HistoryKey) -> Result<SaveOutcome> {
        let mut bytes = self.serialize(key)?;
        let mut trimmed = 0;

        if self.exceeds_quota(key, bytes.len()) {
            let half = self.len(key).div_ceil(2);
            trimmed = self.trim_oldest(key, half);
            tracing::warn!(
                "History '{}' over quota ({} bytes); trimmed {} oldest entries",
                key.as_str(),
                bytes.len(),
                trimmed
            );
            bytes = self.serialize(key)?;

            if self.exceeds_quota(key, bytes.len()) {
                let err = AgronomistError::QuotaExceeded {
                    key: key.as_str().to_string(),
                    size: bytes.len(),
                    quota: self.quota_bytes,
                };
                tracing::warn!("Dropping save: {}", err);
                return Ok(SaveOutcome::Dropped);
            }
        }

        let path = file_path(&self.dir, key);
        fs::write(&path, &bytes).map_err(|source| AgronomistError::Io { path, source })?;
        self.stored_sizes[key.index()] = bytes.len();

        Ok(if trimmed > 0 {
            SaveOutcome::Trimmed(trimmed)
        } else {
            SaveOutcome::Saved
        })
    }

    fn exceeds_quota(&self, key: HistoryKey, size: usize) -> bool {
        let others: usize = HistoryKey::ALL
            .iter()
            .filter(|k| **k != key)
            .map(|k| self.stored_sizes[k.index()])
            .sum();
        others + size > self.quota_bytes
    }

    fn serialize(&self, key: HistoryKey) -> Result<Vec<u8>> {
        let document = match key {
            HistoryKey::Predictions => serde_json::to_vec(&self.predictions),
            HistoryKey::Scans => serde_json::to_vec(&self.scans),
            HistoryKey::Feedback => serde_json::to_vec(&self.feedback),
        };
        document.map_err(|source| AgronomistError::Parse {
            document: key.as_str().to_string(),
            source,
        })
    }

    fn len(&self, key: HistoryKey) -> usize {
        match key {
            HistoryKey::Predictions => self.predictions.len(),
            HistoryKey::Scans => self.scans.len(),
            HistoryKey::Feedback => self.feedback.len(),
        }
    }

    fn trim_oldest(&mut self, key: HistoryKey, count: usize) -> usize {
        match key {
            HistoryKey::Predictions => self.predictions.trim_oldest(count),
            HistoryKey::Scans => self.scans.trim_oldest(count),
            HistoryKey::Feedback => self.feedback.trim_oldest(count),
        }
    }
}

fn file_path(dir: &Path, key: HistoryKey) -> PathBuf {
    dir.join(format!("{}.json", key.as_str()))
}

fn load_entries<T: DeserializeOwned>(dir: &Path, key: HistoryKey) -> Vec<T> {
    let path = file_path(dir, key);
    let contents = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!("Could not read {:?}: {}; starting empty", path, e);
            return Vec::new();
        }
    };

    serde_json::from_str(&contents).unwrap_or_else(|e| {
        tracing::warn!("Corrupt history file {:?}: {}; starting empty", path, e);
        Vec::new()
    })
}
