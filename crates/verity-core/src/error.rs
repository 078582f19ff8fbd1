use verity_crypto::CryptoError;
use verity_fabric::FabricError;
use verity_store::StoreError;
use verity_types::TypeError;

/// Errors from handling a configuration event.
///
/// Per-object failures leave the process running; [`Self::is_fatal`]
/// marks the ones that violate a process-level invariant and must be
/// handed to the supervisor.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    /// The configuration record cannot be used for this object.
    #[error("invalid configuration for {name}: {source}")]
    InvalidConfig {
        name: String,
        #[source]
        source: TypeError,
    },

    /// A zone operation failed for one object.
    #[error("zone operation failed: {0}")]
    Layout(#[source] StoreError),

    /// Hashing the object failed with an I/O error.
    #[error("digest computation failed: {0}")]
    Digest(#[from] CryptoError),

    /// A status record could not be read, written or removed.
    #[error("status persistence failed: {0}")]
    Persist(#[source] StoreError),

    /// The recovery-complete announcement could not be made.
    #[error("recovery signal failed: {0}")]
    Signal(#[from] FabricError),
}

impl VerifierError {
    /// The expected input was not there yet; resubmitting may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Layout(e) if e.is_not_found())
    }

    /// The status records can no longer be trusted to describe the store.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Persist(_) | Self::Signal(_))
    }
}

/// Result alias for verifier operations.
pub type VerifierResult<T> = Result<T, VerifierError>;
