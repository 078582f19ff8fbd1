use std::sync::Arc;

use tracing::{debug, info};
use verity_store::{PurgeReport, StatusStore, StoreLayout};
use verity_types::{validate_name, ObjectStatus};

use crate::error::{VerifierError, VerifierResult};

/// Removes an object from whichever zones currently hold it.
///
/// The verified copy is only removed on behalf of a record that reached
/// `DELIVERED`, and only while no other delivered record with outstanding
/// references claims the same digest. A record that never verified may
/// share its digest directory with an unrelated object still in use.
#[derive(Clone)]
pub struct Lifecycle {
    layout: StoreLayout,
    statuses: Arc<dyn StatusStore>,
}

impl Lifecycle {
    pub fn new(layout: StoreLayout, statuses: Arc<dyn StatusStore>) -> Self {
        Self { layout, statuses }
    }

    /// Names of other delivered records that still reference `status.digest`.
    pub fn other_claimants(&self, status: &ObjectStatus) -> VerifierResult<Vec<String>> {
        let shared = self
            .statuses
            .find_by_digest(&status.digest)
            .map_err(VerifierError::Persist)?;
        Ok(shared
            .into_iter()
            .filter(|other| other.name != status.name && other.is_delivered() && other.ref_count > 0)
            .map(|other| other.name)
            .collect())
    }

    /// Run the delete procedure for `status`. The record itself is left
    /// untouched.
    ///
    /// A record whose digest cannot name a zone directory never got past
    /// validation, so it owns nothing in any zone.
    pub fn delete_object(&self, status: &ObjectStatus) -> VerifierResult<PurgeReport> {
        debug!(name = %status.name, digest = %status.digest, state = %status.state, "deleting object");
        if let Err(e) = validate_name(&status.digest) {
            debug!(name = %status.name, error = %e, "digest names no zone directory; nothing to purge");
            return Ok(PurgeReport::default());
        }
        let mut remove_verified = status.is_delivered();
        if remove_verified {
            let claimants = self.other_claimants(status)?;
            if !claimants.is_empty() {
                info!(
                    name = %status.name,
                    digest = %status.digest,
                    claimants = ?claimants,
                    "verified copy still claimed; keeping it"
                );
                remove_verified = false;
            }
        }
        let report = self
            .layout
            .purge(&status.digest, remove_verified)
            .map_err(VerifierError::Layout)?;
        debug!(name = %status.name, ?report, "object deleted");
        Ok(report)
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}
