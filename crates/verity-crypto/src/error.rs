use std::path::PathBuf;

use verity_types::ContentDigest;

/// Errors from digest computation and verification.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The computed digest disagrees with the claimed one.
    #[error("got {computed} expected {expected}")]
    Mismatch {
        expected: String,
        computed: ContentDigest,
    },

    /// The content could not be read.
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CryptoError {
    /// Returns `true` if this is a digest mismatch rather than an I/O failure.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }
}

/// Result alias for digest operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
