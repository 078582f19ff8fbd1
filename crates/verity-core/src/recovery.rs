use std::sync::Arc;

use tracing::{debug, info, warn};
use verity_fabric::RecoverySignal;
use verity_store::{StatusStore, StoreLayout};
use verity_types::{validate_name, ObjectStatus};

use crate::error::{VerifierError, VerifierResult};

/// What a recovery pass rebuilt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Names of the records written, in verified-zone order.
    pub recovered: Vec<String>,
    /// Paths skipped because they cannot name a record.
    pub skipped: Vec<String>,
}

/// Rebuilds status records for objects already resident in the verified
/// zone.
///
/// Content is not re-hashed: anything in the verified zone got there by
/// passing verification. Records carry no timestamps and no references, so
/// scanning an unchanged zone twice writes identical records.
pub struct RecoveryScanner {
    layout: StoreLayout,
    statuses: Arc<dyn StatusStore>,
}

impl RecoveryScanner {
    pub fn new(layout: StoreLayout, statuses: Arc<dyn StatusStore>) -> Self {
        Self { layout, statuses }
    }

    /// Relock the verified zone, then walk it and persist a `DELIVERED`
    /// record per file.
    pub fn scan(&self) -> VerifierResult<RecoveryReport> {
        self.layout.relock_verified().map_err(VerifierError::Layout)?;
        let entries = self.layout.scan_verified().map_err(VerifierError::Layout)?;
        let mut report = RecoveryReport::default();
        for entry in entries {
            if let Err(e) = validate_name(&entry.filename).and_then(|_| validate_name(&entry.digest)) {
                warn!(path = %entry.path.display(), error = %e, "cannot recover entry");
                report.skipped.push(entry.path.display().to_string());
                continue;
            }
            let status = ObjectStatus::delivered(&entry.filename, &entry.digest);
            self.statuses.put(&status).map_err(VerifierError::Persist)?;
            debug!(name = %status.name, digest = %status.digest, "recovered");
            report.recovered.push(status.name);
        }
        Ok(report)
    }

    /// Scan, then announce that recovery is complete.
    pub fn run(&self, signal: &dyn RecoverySignal) -> VerifierResult<RecoveryReport> {
        let report = self.scan()?;
        signal.recovery_complete()?;
        info!(
            recovered = report.recovered.len(),
            skipped = report.skipped.len(),
            "recovery finished"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for RecoveryScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryScanner")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}
