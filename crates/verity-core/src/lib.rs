//! Verification and promotion engine for Verity.
//!
//! An object enters the pending zone when its download completes. The
//! [`Verifier`] then moves it through verification into the verified zone,
//! recording every step in the object's status record:
//!
//! ```text
//!   create ──► DOWNLOADED (pendingAdd) ──► hash ok ──► DELIVERED
//!                                     └──► mismatch ──► INITIAL + lastError
//! ```
//!
//! - [`Verifier`] -- the promotion state machine (create/modify/delete)
//! - [`Lifecycle`] -- removal from the zones, aware of shared digests
//! - [`RecoveryScanner`] -- rebuilds records from the verified zone on startup
//! - [`Dispatcher`] -- feeds queued configuration events to the verifier
//!
//! Events are handled strictly one at a time. Nothing here locks; the
//! dispatcher is the only caller and never interleaves two events.

pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod machine;
pub mod recovery;

pub use dispatcher::{DispatchStats, Dispatcher, Outcome};
pub use error::{VerifierError, VerifierResult};
pub use lifecycle::Lifecycle;
pub use machine::Verifier;
pub use recovery::{RecoveryReport, RecoveryScanner};
