use std::path::PathBuf;

/// Errors produced by the event fabric.
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    /// I/O error while reading configuration or writing a signal marker.
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The event queue has no consumer left.
    #[error("event queue is shut down")]
    Shutdown,

    /// The bounded event queue is full.
    #[error("event queue is full")]
    QueueFull,
}

impl FabricError {
    pub(crate) fn io_at(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Convenience alias used throughout the fabric crate.
pub type Result<T> = std::result::Result<T, FabricError>;
