//! Error types for removal operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use softrm_store::StoreError;

/// Errors from the removal engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Target does not exist (suppressed entirely under force mode).
    #[error("cannot remove '{path}': No such file or directory")]
    NotFound { path: PathBuf },

    /// Directory target without recursive or dir mode.
    #[error("cannot remove '{path}': Is a directory")]
    IsADirectory { path: PathBuf },

    /// Dir-mode removal of a non-empty directory.
    #[error("cannot remove '{path}': Directory not empty")]
    DirectoryNotEmpty { path: PathBuf },

    /// Root protection tripped.
    #[error("it is dangerous to operate recursively on '/'")]
    RootProtected,

    /// Final path component is `.` or `..`.
    #[error("refusing to remove '.' or '..' directory: skipping '{path}'")]
    DotComponent { path: PathBuf },

    /// Target sits on a different device than its parent.
    #[error("skipping '{path}', since it's on a different device")]
    DeviceBoundary { path: PathBuf },

    /// Generic I/O failure at a path.
    #[error("cannot remove '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure inside the recycle bin store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Whether this is a batch-level protection violation.
    pub fn is_protection(&self) -> bool {
        matches!(
            self,
            Self::RootProtected | Self::DotComponent { .. } | Self::DeviceBoundary { .. }
        )
    }
}
