use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during ledger storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Ledger not found for run: {0}")]
    LedgerNotFound(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}
