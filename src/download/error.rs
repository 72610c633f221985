use std::path::PathBuf;

use thiserror::Error;

use crate::types::InvalidItemId;

/// Typed fetch errors enabling retry classification.
///
/// `is_retryable()` separates transient transport failures (connection
/// errors, non-2xx statuses, truncated bodies) from permanent ones (a
/// malformed identifier, cancellation) so the retry loop can stop early.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidItemId),

    #[error("HTTP error {status} fetching {id}")]
    HttpStatus { status: u16, id: String },

    #[error("HTTP error fetching {id}: {source}")]
    Http { id: String, source: reqwest::Error },

    #[error("Body of {id} ended early: read {received} of {expected} bytes")]
    Truncated {
        id: String,
        expected: u64,
        received: u64,
    },

    #[error("Fetch of {0} cancelled")]
    Cancelled(String),
}

impl DownloadError {
    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::HttpStatus { .. }
            | DownloadError::Http { .. }
            | DownloadError::Truncated { .. } => true,
            DownloadError::InvalidIdentifier(_) | DownloadError::Cancelled(_) => false,
        }
    }
}

/// Failures while publishing fetched bytes to disk.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot create file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}
