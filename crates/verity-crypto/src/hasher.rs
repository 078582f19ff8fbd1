use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;
use verity_types::ContentDigest;

use crate::error::{CryptoError, CryptoResult};

/// Streaming SHA-256 digester for object files.
///
/// Content is read in fixed-size chunks, so an object of any size is hashed
/// without being held in memory.
#[derive(Clone, Debug)]
pub struct DigestVerifier {
    buffer_size: usize,
}

impl DigestVerifier {
    /// Read buffer size used by [`Self::new`].
    pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

    pub fn new() -> Self {
        Self::with_buffer_size(Self::DEFAULT_BUFFER_SIZE)
    }

    /// Create a digester with a custom read buffer size (minimum one byte).
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    /// Hash everything `reader` yields.
    pub fn digest_reader<R: Read>(&self, mut reader: R) -> io::Result<ContentDigest> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => hasher.update(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(ContentDigest::from_hash(hasher.finalize().into()))
    }

    /// Hash an in-memory buffer.
    pub fn digest_bytes(data: &[u8]) -> ContentDigest {
        ContentDigest::from_hash(Sha256::digest(data).into())
    }

    /// Compute the digest of the file at `path`.
    pub fn compute(&self, path: &Path) -> CryptoResult<ContentDigest> {
        let io_err = |source| CryptoError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        let digest = self.digest_reader(file).map_err(io_err)?;
        debug!(path = %path.display(), digest = %digest, "computed digest");
        Ok(digest)
    }

    /// Compute the digest of `path` and require it to equal `claimed`.
    ///
    /// Returns the confirmed digest, or [`CryptoError::Mismatch`] carrying
    /// both values.
    pub fn verify(&self, path: &Path, claimed: &str) -> CryptoResult<ContentDigest> {
        let computed = self.compute(path)?;
        if computed.to_hex() != claimed {
            return Err(CryptoError::Mismatch {
                expected: claimed.to_string(),
                computed,
            });
        }
        Ok(computed)
    }
}

impl Default for DigestVerifier {
    fn default() -> Self {
        Self::new()
    }
}
