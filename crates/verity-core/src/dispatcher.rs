use tracing::{debug, error, info, warn};
use verity_fabric::{ConfigEvent, EventReceiver};
use verity_types::{validate_name, ObjectStatus};

use crate::error::{VerifierError, VerifierResult};
use crate::machine::Verifier;

/// What dispatching one event did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The record as left by a create or modify.
    Updated(ObjectStatus),
    /// The object and its record were deleted.
    Removed,
    /// A delete arrived for a name with no record.
    Ignored,
}

impl Outcome {
    pub fn status(&self) -> Option<&ObjectStatus> {
        match self {
            Self::Updated(status) => Some(status),
            Self::Removed | Self::Ignored => None,
        }
    }
}

/// Counters for a dispatch loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events applied to the store and its records.
    pub handled: u64,
    /// Events that returned a non-fatal error.
    pub failed: u64,
    /// Deletes for names with no record.
    pub ignored: u64,
}

/// Feeds configuration events to the [`Verifier`] one at a time.
///
/// Each event is resolved against the status store before it is handled:
/// a create for a name that already has a record is applied as a modify, a
/// modify with no record is applied as a create, and a delete with no record
/// is dropped.
#[derive(Debug)]
pub struct Dispatcher {
    verifier: Verifier,
}

impl Dispatcher {
    pub fn new(verifier: Verifier) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// Handle one event.
    pub fn dispatch(&self, event: ConfigEvent) -> VerifierResult<Outcome> {
        let name = event.name().to_string();
        validate_name(&name).map_err(|source| VerifierError::InvalidConfig {
            name: name.clone(),
            source,
        })?;
        let existing = self
            .verifier
            .statuses()
            .get(&name)
            .map_err(VerifierError::Persist)?;

        match (event, existing) {
            (ConfigEvent::Create(config) | ConfigEvent::Modify(config), Some(status)) => {
                self.verifier.handle_modify(&config, status).map(Outcome::Updated)
            }
            (ConfigEvent::Create(config) | ConfigEvent::Modify(config), None) => {
                self.verifier.handle_create(&config).map(Outcome::Updated)
            }
            (ConfigEvent::Delete { .. }, Some(status)) => {
                self.verifier.handle_delete(&status)?;
                Ok(Outcome::Removed)
            }
            (ConfigEvent::Delete { name }, None) => {
                debug!(%name, "delete for unknown object");
                Ok(Outcome::Ignored)
            }
        }
    }

    /// Drain `events` until every sender is gone.
    ///
    /// Per-object failures are logged and the loop moves on; a fatal error
    /// stops the loop and is returned for the supervisor.
    pub async fn run(&self, mut events: EventReceiver) -> VerifierResult<DispatchStats> {
        let mut stats = DispatchStats::default();
        while let Some(event) = events.recv().await {
            let name = event.name().to_string();
            let kind = event.kind();
            match self.dispatch(event) {
                Ok(Outcome::Updated(status)) => {
                    stats.handled += 1;
                    debug!(%name, %kind, state = %status.state, "event handled");
                }
                Ok(Outcome::Removed) => stats.handled += 1,
                Ok(Outcome::Ignored) => stats.ignored += 1,
                Err(e) if e.is_fatal() => {
                    error!(%name, %kind, error = %e, "fatal error; stopping dispatch");
                    events.close();
                    return Err(e);
                }
                Err(e) => {
                    stats.failed += 1;
                    if e.is_retryable() {
                        warn!(%name, %kind, error = %e, "event not yet actionable");
                    } else {
                        warn!(%name, %kind, error = %e, "event failed");
                    }
                }
            }
        }
        info!(?stats, "event queue closed");
        Ok(stats)
    }
}
