//! Zoned, content-addressed object storage for Verity.
//!
//! Objects move through three mutually exclusive zones, each keyed first by
//! the claimed content digest:
//!
//! ```text
//! <root>/pending/<digest>/<safename>     written by the downloader
//! <root>/verifier/<digest>/<safename>    locked read-only while hashing
//! <root>/verified/<digest>/<basename>    final, read-only directory
//! ```
//!
//! [`StoreLayout`] performs every move between zones. It keeps no state of
//! its own: each call inspects the filesystem afresh. Status records, the
//! only externally observable state, are persisted through a
//! [`StatusStore`] backend:
//!
//! - [`DirStatusStore`] -- one JSON file per object, replaced atomically
//! - [`InMemoryStatusStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. The rename into the next zone is the atomic pivot of every move.
//!    Permission changes around it are idempotent and redone on restart.
//! 2. At most one verified file exists per digest directory.
//! 3. A verified directory is only removed on behalf of a delivered object.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod error;
pub mod layout;
pub mod memory;
pub mod status;
pub mod traits;

pub use config::{StoreConfig, Zone};
pub use error::{StoreError, StoreResult};
pub use layout::{Promotion, PurgeReport, StoreLayout, VerifiedEntry};
pub use memory::InMemoryStatusStore;
pub use status::DirStatusStore;
pub use traits::StatusStore;
