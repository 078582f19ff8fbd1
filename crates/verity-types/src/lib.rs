//! Foundation types for Verity, the content verification and promotion service.
//!
//! This crate provides the records exchanged with the outside world and the
//! identifiers that key the content-addressed store. Every other Verity crate
//! depends on `verity-types`.
//!
//! # Key Types
//!
//! - [`ObjectConfig`] -- Externally supplied request to verify an object
//! - [`ObjectStatus`] -- Status record owned by the verifier, one per name
//! - [`ObjectState`] -- Pipeline outcome carried in the status record
//! - [`ContentDigest`] -- SHA-256 content identifier, hex-encoded on the wire

pub mod digest;
pub mod error;
pub mod object;
pub mod safename;

pub use digest::ContentDigest;
pub use error::TypeError;
pub use object::{ObjectConfig, ObjectState, ObjectStatus};
pub use safename::{final_filename, validate_name};
