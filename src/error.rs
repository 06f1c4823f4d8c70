//! Error types for pipeline and query operations.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Source unavailable for browser '{browser}' ({}): {source}", .path.display())]
    SourceUnavailable {
        browser: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot create scratch directory {}: {source}", .path.display())]
    ScratchUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported browser '{name}' (kind: {kind})")]
    UnsupportedSource { name: String, kind: String },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Invalid search phrase: {0}")]
    Query(String),

    #[error("Sync cycle failed for: {}", .failed.join(", "))]
    CycleFailed { failed: Vec<String> },
}

impl HistoryError {
    pub(crate) fn unavailable(browser: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HistoryError::SourceUnavailable {
            browser: browser.to_string(),
            path: path.into(),
            source,
        }
    }

    /// Open failures on a snapshot are reported as the source being
    /// unavailable, not as a durable-store failure.
    pub(crate) fn from_snapshot_open(browser: &str, path: impl Into<PathBuf>, err: sqlx::Error) -> Self {
        let source = match err {
            sqlx::Error::Io(io) => io,
            other => std::io::Error::other(other.to_string()),
        };
        HistoryError::unavailable(browser, path, source)
    }
}

pub type HistoryResult<T> = std::result::Result<T, HistoryError>;
