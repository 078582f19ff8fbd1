use std::path::{Path, PathBuf};

use verity_types::TypeError;

/// Errors from zone and status record operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A file expected at a pipeline step is missing.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A name or digest cannot be used as a path component.
    #[error("invalid path component: {0}")]
    Invalid(#[from] TypeError),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying filesystem.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An in-memory backend lock was poisoned by a panicking writer.
    #[error("status store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Adapter for `map_err` attaching the path an I/O call operated on.
    pub(crate) fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
