//! Event plumbing for Verity.
//!
//! Configuration records arrive as create/modify/delete changes. This crate
//! turns them into typed [`ConfigEvent`]s, carries them through a bounded
//! [`EventQueue`](queue::event_queue) to a single consumer, and provides the
//! [`RecoverySignal`] used to announce that startup recovery has finished.
//!
//! The real change transport is external; [`ConfigDirSource`] is a polling
//! stand-in that diffs a directory of `<name>.json` configuration files.

pub mod error;
pub mod event;
pub mod queue;
pub mod signal;
pub mod source;

pub use error::{FabricError, Result};
pub use event::{ConfigEvent, EventKind};
pub use queue::{event_queue, EventReceiver, EventSender};
pub use signal::{MarkerFileSignal, RecoverySignal, WatchSignal};
pub use source::ConfigDirSource;
