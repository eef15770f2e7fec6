//! Error types for holding-area operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from the recycle bin store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No held entry matches the restore selector.
    #[error("'{selector}' not found in the recycle bin")]
    NotFound { selector: String },

    /// A bare-filename selector matched more than one held entry.
    #[error("'{selector}' matches {count} entries; use the full original path")]
    Ambiguous { selector: String, count: usize },

    /// A recorded original path failed the restore safety check.
    #[error("invalid restore path: {path}")]
    InvalidRestorePath { path: PathBuf },

    /// Write, rename or compression failure inside the store.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Entry metadata could not be encoded.
    #[error("metadata error for {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The fallback copy landed in the holding area but the original could
    /// not be removed. The copy is retained.
    #[error("copied '{path}' into the recycle bin but failed to remove the original: {source}")]
    SourceRemoval {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
