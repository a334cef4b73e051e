//! Runtime configuration
//!
//! Read from environment variables with local-development defaults:
//!
//! | Variable              | Default    |
//! |-----------------------|------------|
//! | `DATA_DIR`            | `data`     |
//! | `HISTORY_DIR`         | `history`  |
//! | `MODELS_DIR`          | `models`   |
//! | `PORT`                | `3000`     |
//! | `SCORING_TABLE`       | (built-in) |
//! | `STORAGE_QUOTA_BYTES` | 5 MiB      |

use std::path::PathBuf;

pub const DEFAULT_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding crop_rules.json, crop_profiles.json, region_profiles.json
    pub data_dir: PathBuf,
    /// Directory for persisted history logs
    pub history_dir: PathBuf,
    /// Directory for trained yield models
    pub models_dir: PathBuf,
    pub port: u16,
    /// Optional JSON override for the disease scoring table
    pub scoring_table: Option<PathBuf>,
    pub storage_quota_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            history_dir: PathBuf::from("history"),
            models_dir: PathBuf::from("models"),
            port: 3000,
            scoring_table: None,
            storage_quota_bytes: DEFAULT_STORAGE_QUOTA_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (lets tests avoid touching process env)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let history_dir = lookup("HISTORY_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.history_dir);

        let models_dir = lookup("MODELS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.models_dir);

        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let scoring_table = lookup("SCORING_TABLE")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let storage_quota_bytes = lookup("STORAGE_QUOTA_BYTES")
            .and_then(|q| q.parse().ok())
            .unwrap_or(defaults.storage_quota_bytes);

        Self {
            data_dir,
            history_dir,
            models_dir,
            port,
            scoring_table,
            storage_quota_bytes,
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  DATA_DIR: {}", self.data_dir.display());
        tracing::info!("  HISTORY_DIR: {}", self.history_dir.display());
        tracing::info!("  MODELS_DIR: {}", self.models_dir.display());
        tracing::info!("  PORT: {}", self.port);
        match &self.scoring_table {
            Some(path) => tracing::info!("  SCORING_TABLE: {}", path.display()),
            None => tracing::info!("  SCORING_TABLE: built-in defaults"),
        }
        tracing::info!("  STORAGE_QUOTA_BYTES: {}", self.storage_quota_bytes);
    }
}
