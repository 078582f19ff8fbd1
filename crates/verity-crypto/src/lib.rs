//! Digest verification for Verity.
//!
//! Streams object content through SHA-256 and reports the computed
//! [`ContentDigest`](verity_types::ContentDigest). Hash computation is kept
//! separate from the accept/reject policy: [`DigestVerifier::compute`] only
//! hashes, [`DigestVerifier::verify`] additionally compares against a claim.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod error;
pub mod hasher;

pub use error::{CryptoError, CryptoResult};
pub use hasher::DigestVerifier;
