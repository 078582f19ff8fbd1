use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use verity_crypto::{CryptoError, DigestVerifier};
use verity_store::{StatusStore, StoreLayout};
use verity_types::{final_filename, validate_name, ObjectConfig, ObjectState, ObjectStatus};

use crate::error::{VerifierError, VerifierResult};
use crate::lifecycle::Lifecycle;
use crate::recovery::RecoveryScanner;

/// The promotion state machine.
///
/// Drives one object at a time from the pending zone through verification
/// into the verified zone, keeping its status record current at every step.
/// Handlers return `Ok` with the final record whenever the outcome, success
/// or failure, is recorded in that record. `Err` means the record could not
/// express the outcome: either the object is unresolved (retryable) or the
/// store needs intervention.
pub struct Verifier {
    layout: StoreLayout,
    digester: DigestVerifier,
    statuses: Arc<dyn StatusStore>,
    lifecycle: Lifecycle,
}

impl Verifier {
    pub fn new(layout: StoreLayout, statuses: Arc<dyn StatusStore>) -> Self {
        let lifecycle = Lifecycle::new(layout.clone(), statuses.clone());
        Self {
            layout,
            digester: DigestVerifier::new(),
            statuses,
            lifecycle,
        }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn statuses(&self) -> &Arc<dyn StatusStore> {
        &self.statuses
    }

    /// Scanner that rebuilds status records from the verified zone.
    pub fn recovery_scanner(&self) -> RecoveryScanner {
        RecoveryScanner::new(self.layout.clone(), self.statuses.clone())
    }

    // ---------------------------------------------------------------
    // Event handlers
    // ---------------------------------------------------------------

    /// Verify and promote a newly configured object.
    ///
    /// A missing pending file returns a retryable error and leaves the record
    /// unresolved (`DOWNLOADED`, `pending_add`). A digest mismatch is
    /// recorded and returns `Ok` with state `INITIAL`.
    pub fn handle_create(&self, config: &ObjectConfig) -> VerifierResult<ObjectStatus> {
        self.create(config, false)
    }

    /// Apply a new version of the configuration to an existing record.
    pub fn handle_modify(
        &self,
        config: &ObjectConfig,
        mut status: ObjectStatus,
    ) -> VerifierResult<ObjectStatus> {
        info!(name = %config.name, url = %config.download_url, "modify");
        status.ref_count = config.ref_count;

        if status.ref_count == 0 {
            status.pending_modify = true;
            self.persist(&status)?;
            self.lifecycle.delete_object(&status)?;
            status.pending_modify = false;
            status.pending_add = false;
            status.state = ObjectState::Initial;
            self.persist(&status)?;
            info!(name = %status.name, "released; refcount is zero");
            return Ok(status);
        }

        if status.same_identity(config) {
            if status.pending_add {
                info!(name = %config.name, "retrying unresolved create");
                return self.recreate(config, status.pending_modify);
            }
            debug!(name = %config.name, ref_count = status.ref_count, "no change");
            self.persist(&status)?;
            return Ok(status);
        }

        status.pending_modify = true;
        self.persist(&status)?;
        self.lifecycle.delete_object(&status)?;
        if status.name != config.name {
            self.statuses.remove(&status.name).map_err(VerifierError::Persist)?;
        }
        let created = self.recreate(config, true)?;
        info!(name = %created.name, state = %created.state, "modify done");
        Ok(created)
    }

    /// Remove an object and its status record.
    pub fn handle_delete(&self, status: &ObjectStatus) -> VerifierResult<()> {
        info!(name = %status.name, "delete");
        self.lifecycle.delete_object(status)?;
        self.statuses
            .remove(&status.name)
            .map_err(VerifierError::Persist)?;
        info!(name = %status.name, "delete done");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Create procedure
    // ---------------------------------------------------------------

    fn create(&self, config: &ObjectConfig, pending_modify: bool) -> VerifierResult<ObjectStatus> {
        info!(name = %config.name, url = %config.download_url, "create");
        validate_name(&config.name).map_err(|source| VerifierError::InvalidConfig {
            name: config.name.clone(),
            source,
        })?;

        let mut status = ObjectStatus::from_config(config);
        status.pending_modify = pending_modify;
        self.persist(&status)?;

        let prepared = config.validate().and_then(|_| final_filename(&config.name));
        let filename = match prepared {
            Ok(filename) => filename,
            Err(e) => {
                warn!(name = %config.name, error = %e, "rejecting configuration");
                return self.fail(status, e.to_string());
            }
        };
        let digest = config.claimed_digest.as_str();

        let verifying = match self.layout.lock_for_verification(digest, &config.name) {
            Ok(path) => path,
            Err(e) if e.is_not_found() => {
                warn!(name = %config.name, error = %e, "pending file not present; create unresolved");
                return Err(VerifierError::Layout(e));
            }
            Err(e) => return Err(self.surface(&mut status, VerifierError::Layout(e))),
        };
        info!(name = %config.name, path = %verifying.display(), "verifying");

        match self.digester.verify(&verifying, digest) {
            Ok(_) => {}
            Err(e @ CryptoError::Mismatch { .. }) => {
                warn!(name = %config.name, error = %e, "digest mismatch");
                self.layout
                    .discard_verifying(digest)
                    .map_err(|e| self.surface(&mut status, VerifierError::Layout(e)))?;
                return self.fail(status, e.to_string());
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(discard) = self.layout.discard_verifying(digest) {
                    warn!(name = %config.name, error = %discard, "could not discard unreadable object");
                }
                self.fail(status, message)?;
                return Err(VerifierError::Digest(e));
            }
        }

        let promotion = self
            .layout
            .promote(digest, &config.name, &filename)
            .map_err(|e| self.surface(&mut status, VerifierError::Layout(e)))?;

        status.state = ObjectState::Delivered;
        status.pending_add = false;
        self.persist(&status)?;
        info!(name = %config.name, path = %promotion.path.display(), "delivered");
        Ok(status)
    }

    /// Run the create procedure on behalf of a modify, clearing
    /// `pending_modify` once it has an outcome.
    fn recreate(&self, config: &ObjectConfig, modifying: bool) -> VerifierResult<ObjectStatus> {
        let mut created = self.create(config, modifying)?;
        if created.pending_modify {
            created.pending_modify = false;
            self.persist(&created)?;
        }
        Ok(created)
    }

    /// Record a per-object failure: state back to `INITIAL` with the error.
    fn fail(&self, mut status: ObjectStatus, message: String) -> VerifierResult<ObjectStatus> {
        status.record_error(message, Utc::now());
        status.state = ObjectState::Initial;
        status.pending_add = false;
        self.persist(&status)?;
        Ok(status)
    }

    /// Stamp an unexpected error onto the record, leaving its state as is so
    /// the stuck step stays visible, and hand the error back.
    fn surface(&self, status: &mut ObjectStatus, err: VerifierError) -> VerifierError {
        warn!(name = %status.name, error = %err, "object needs intervention");
        status.record_error(err.to_string(), Utc::now());
        match self.persist(status) {
            Ok(()) => err,
            Err(persist) => persist,
        }
    }

    fn persist(&self, status: &ObjectStatus) -> VerifierResult<()> {
        self.statuses.put(status).map_err(VerifierError::Persist)
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("layout", &self.layout)
            .field("digester", &self.digester)
            .finish_non_exhaustive()
    }
}
