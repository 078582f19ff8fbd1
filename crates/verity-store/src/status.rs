use std::fs::{self, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;
use verity_types::{validate_name, ObjectStatus};

use crate::error::{StoreError, StoreResult};
use crate::traits::StatusStore;

const STATUS_EXTENSION: &str = "json";
const STATUS_MODE: u32 = 0o644;

/// Status store keeping one `<name>.json` file per object in a directory
/// watched by downstream consumers.
///
/// Each write goes to a temporary file in the same directory which is then
/// renamed over the record, so a reader sees either the old or the new
/// record and never a truncated one.
#[derive(Clone, Debug)]
pub struct DirStatusStore {
    dir: PathBuf,
}

impl DirStatusStore {
    /// Open a status directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(StoreError::io_at(&dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `name`.
    pub fn record_path(&self, name: &str) -> StoreResult<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{STATUS_EXTENSION}")))
    }

    fn read_record(path: &Path) -> StoreResult<ObjectStatus> {
        let bytes = fs::read(path).map_err(StoreError::io_at(path))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))
    }

    fn record_files(&self) -> StoreResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(StoreError::io_at(&self.dir))? {
            let path = entry.map_err(StoreError::io_at(&self.dir))?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == STATUS_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl StatusStore for DirStatusStore {
    fn get(&self, name: &str) -> StoreResult<Option<ObjectStatus>> {
        let path = self.record_path(name)?;
        match Self::read_record(&path) {
            Ok(status) => Ok(Some(status)),
            Err(StoreError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&self, status: &ObjectStatus) -> StoreResult<()> {
        let path = self.record_path(&status.name)?;
        let bytes = serde_json::to_vec(status).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(StoreError::io_at(&self.dir))?;
        tmp.write_all(&bytes).map_err(StoreError::io_at(tmp.path()))?;
        tmp.as_file()
            .set_permissions(Permissions::from_mode(STATUS_MODE))
            .map_err(StoreError::io_at(&path))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io_at(&path)(e.error))?;
        debug!(name = %status.name, state = %status.state, "status written");
        Ok(())
    }

    fn remove(&self, name: &str) -> StoreResult<bool> {
        let path = self.record_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io_at(&path)(e)),
        }
    }

    fn list(&self) -> StoreResult<Vec<ObjectStatus>> {
        let mut records = self
            .record_files()?
            .iter()
            .map(|path| Self::read_record(path))
            .collect::<StoreResult<Vec<_>>>()?;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    fn clear(&self) -> StoreResult<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir).map_err(StoreError::io_at(&self.dir))? {
            let path = entry.map_err(StoreError::io_at(&self.dir))?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path).map_err(StoreError::io_at(&path))?;
            } else {
                fs::remove_file(&path).map_err(StoreError::io_at(&path))?;
            }
            removed += 1;
        }
        Ok(removed)
    }
}
