//! Library error type
//!
//! Loaders and binaries wrap these in `anyhow` with context; the HTTP layer maps
//! them onto status codes.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AgronomistError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {document}: {source}")]
    Parse {
        document: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Image could not be decoded: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Image is empty")]
    EmptyImage,

    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Storage quota exceeded for '{key}' ({size} > {quota} bytes)")]
    QuotaExceeded { key: String, size: usize, quota: usize },

    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, AgronomistError>;
