use std::collections::BTreeMap;
use std::sync::RwLock;

use verity_types::ObjectStatus;

use crate::error::{StoreError, StoreResult};
use crate::traits::StatusStore;

/// In-memory status store.
///
/// Intended for tests and embedding. Besides the current records it keeps a
/// journal of every `put`, so tests can observe transient states such as
/// `pending_add` that are overwritten before an operation returns.
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    records: RwLock<BTreeMap<String, ObjectStatus>>,
    journal: RwLock<Vec<ObjectStatus>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.records.read().map_err(|_| StoreError::LockPoisoned)?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Every record written so far, oldest first.
    pub fn journal(&self) -> StoreResult<Vec<ObjectStatus>> {
        Ok(self
            .journal
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .clone())
    }
}

impl StatusStore for InMemoryStatusStore {
    fn get(&self, name: &str) -> StoreResult<Option<ObjectStatus>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.get(name).cloned())
    }

    fn put(&self, status: &ObjectStatus) -> StoreResult<()> {
        verity_types::validate_name(&status.name)?;
        self.records
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(status.name.clone(), status.clone());
        self.journal
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .push(status.clone());
        Ok(())
    }

    fn remove(&self, name: &str) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.remove(name).is_some())
    }

    fn list(&self) -> StoreResult<Vec<ObjectStatus>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.values().cloned().collect())
    }

    fn clear(&self) -> StoreResult<usize> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        let count = records.len();
        records.clear();
        Ok(count)
    }
}
