use verity_types::ObjectStatus;

use crate::error::StoreResult;

/// Persistence for status records, keyed by object name.
///
/// All implementations must satisfy these invariants:
/// - At most one record exists per name.
/// - `put` replaces the whole record; readers never observe a partial write.
/// - All I/O errors are propagated, never silently ignored.
pub trait StatusStore: Send + Sync {
    /// Read the record for `name`.
    ///
    /// Returns `Ok(None)` if no record exists.
    fn get(&self, name: &str) -> StoreResult<Option<ObjectStatus>>;

    /// Create or replace the record for `status.name`.
    fn put(&self, status: &ObjectStatus) -> StoreResult<()>;

    /// Delete the record for `name`. Returns `true` if it existed.
    fn remove(&self, name: &str) -> StoreResult<bool>;

    /// All records, ordered by name.
    fn list(&self) -> StoreResult<Vec<ObjectStatus>>;

    /// Delete every record, returning how many were removed.
    fn clear(&self) -> StoreResult<usize>;

    /// Records whose digest equals `digest`, ordered by name.
    ///
    /// Default implementation filters [`Self::list`].
    fn find_by_digest(&self, digest: &str) -> StoreResult<Vec<ObjectStatus>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|status| status.digest == digest)
            .collect())
    }
}
