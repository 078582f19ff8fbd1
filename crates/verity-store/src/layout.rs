use std::fs::{self, DirBuilder, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use verity_types::validate_name;
use walkdir::WalkDir;

use crate::config::{StoreConfig, Zone};
use crate::error::{StoreError, StoreResult};

/// Mode of every directory while the verifier is writing into it.
const DIR_WRITABLE: u32 = 0o700;
/// Mode of a populated verifying or verified digest directory.
const DIR_LOCKED: u32 = 0o500;
/// Mode of an object file once it leaves the pending zone.
const FILE_LOCKED: u32 = 0o400;

/// Result of a promotion into the verified zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Promotion {
    /// Final location of the verified file.
    pub path: PathBuf,
    /// Files that occupied the digest directory before and were replaced.
    pub superseded: Vec<String>,
}

/// Which zone directories a purge actually removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub pending: bool,
    pub verifying: bool,
    pub verified: bool,
}

/// A file found in the verified zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedEntry {
    /// Name of the digest directory holding the file.
    pub digest: String,
    pub filename: String,
    pub path: PathBuf,
}

/// Moves object files between the pending, verifying and verified zones.
///
/// Stateless: every operation works from what is on disk at the time of the
/// call. Callers must not run two operations for the same digest at once.
#[derive(Clone, Debug)]
pub struct StoreLayout {
    config: StoreConfig,
}

impl StoreLayout {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn zone_dir(&self, zone: Zone) -> PathBuf {
        self.config.zone_dir(zone)
    }

    /// `<zone>/<digest>`, after checking the digest is a single path component.
    pub fn digest_dir(&self, zone: Zone, digest: &str) -> StoreResult<PathBuf> {
        validate_name(digest)?;
        Ok(self.zone_dir(zone).join(digest))
    }

    /// `<zone>/<digest>/<name>`.
    pub fn object_path(&self, zone: Zone, digest: &str, name: &str) -> StoreResult<PathBuf> {
        validate_name(name)?;
        Ok(self.digest_dir(zone, digest)?.join(name))
    }

    /// Create any missing zone directories.
    pub fn ensure_zones(&self) -> StoreResult<()> {
        for zone in Zone::ALL {
            let dir = self.zone_dir(zone);
            DirBuilder::new()
                .recursive(true)
                .mode(DIR_WRITABLE)
                .create(&dir)
                .map_err(StoreError::io_at(&dir))?;
        }
        Ok(())
    }

    /// Remove everything left in the verifying zone by an interrupted run.
    ///
    /// Returns the number of digest directories removed.
    pub fn reset_verifying(&self) -> StoreResult<usize> {
        let zone = self.zone_dir(Zone::Verifying);
        let entries = match fs::read_dir(&zone) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::io_at(&zone)(e)),
        };
        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(StoreError::io_at(&zone))?.path();
            if remove_tree(&path)? {
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, zone = %zone.display(), "cleared interrupted verifications");
        }
        Ok(removed)
    }

    /// Move `pending/<digest>/<name>` into `verifying/<digest>/` and lock it.
    ///
    /// Any stale contents of the verifying digest directory are replaced.
    /// The rename is the pivot; permissions are applied after it, and the
    /// pending digest directory is removed once it is empty.
    pub fn lock_for_verification(&self, digest: &str, name: &str) -> StoreResult<PathBuf> {
        let pending = self.object_path(Zone::Pending, digest, name)?;
        let verifying_dir = self.digest_dir(Zone::Verifying, digest)?;
        let verifying = verifying_dir.join(name);

        require_file(&pending)?;
        if remove_tree(&verifying_dir)? {
            debug!(dir = %verifying_dir.display(), "replaced stale verifying directory");
        }
        DirBuilder::new()
            .recursive(true)
            .mode(DIR_WRITABLE)
            .create(&verifying_dir)
            .map_err(StoreError::io_at(&verifying_dir))?;

        debug!(from = %pending.display(), to = %verifying.display(), "moving into verifying zone");
        fs::rename(&pending, &verifying).map_err(StoreError::io_at(&pending))?;

        set_mode(&verifying_dir, DIR_LOCKED)?;
        set_mode(&verifying, FILE_LOCKED)?;
        if let Some(pending_dir) = pending.parent() {
            remove_dir_if_empty(pending_dir)?;
        }
        Ok(verifying)
    }

    /// Move `verifying/<digest>/<name>` to `verified/<digest>/<final_filename>`.
    ///
    /// An existing verified directory for the digest holds byte-identical
    /// content under another name; it is deleted and its files are reported
    /// in [`Promotion::superseded`].
    pub fn promote(&self, digest: &str, name: &str, final_filename: &str) -> StoreResult<Promotion> {
        let verifying = self.object_path(Zone::Verifying, digest, name)?;
        let verifying_dir = self.digest_dir(Zone::Verifying, digest)?;
        let final_path = self.object_path(Zone::Verified, digest, final_filename)?;
        let final_dir = self.digest_dir(Zone::Verified, digest)?;

        require_file(&verifying)?;

        let superseded = list_files(&final_dir)?;
        for old in &superseded {
            warn!(digest, old = %old, new = %name, "identical digest for two names; deleting old");
        }
        remove_tree(&final_dir)?;

        DirBuilder::new()
            .recursive(true)
            .mode(DIR_WRITABLE)
            .create(&final_dir)
            .map_err(StoreError::io_at(&final_dir))?;

        // The locked verifying directory must be writable to unlink from it.
        set_mode(&verifying_dir, DIR_WRITABLE)?;
        debug!(from = %verifying.display(), to = %final_path.display(), "promoting into verified zone");
        fs::rename(&verifying, &final_path).map_err(StoreError::io_at(&verifying))?;

        set_mode(&final_dir, DIR_LOCKED)?;
        remove_dir_if_empty(&verifying_dir)?;
        Ok(Promotion {
            path: final_path,
            superseded,
        })
    }

    /// Remove `verifying/<digest>` after a failed verification.
    pub fn discard_verifying(&self, digest: &str) -> StoreResult<bool> {
        remove_tree(&self.digest_dir(Zone::Verifying, digest)?)
    }

    /// Remove the digest directory from the pending and verifying zones, and
    /// from the verified zone only when `was_delivered` is set.
    pub fn purge(&self, digest: &str, was_delivered: bool) -> StoreResult<PurgeReport> {
        let mut report = PurgeReport {
            pending: remove_tree(&self.digest_dir(Zone::Pending, digest)?)?,
            verifying: remove_tree(&self.digest_dir(Zone::Verifying, digest)?)?,
            verified: false,
        };
        if was_delivered {
            report.verified = remove_tree(&self.digest_dir(Zone::Verified, digest)?)?;
        }
        debug!(digest, ?report, "purged");
        Ok(report)
    }

    /// Names of the files in `verified/<digest>`, sorted.
    pub fn verified_files(&self, digest: &str) -> StoreResult<Vec<String>> {
        list_files(&self.digest_dir(Zone::Verified, digest)?)
    }

    /// Reapply the read-only modes across the verified zone.
    ///
    /// A crash between a promotion's rename and its permission change leaves
    /// a writable digest directory behind; this redoes that step. Returns the
    /// number of digest directories locked.
    pub fn relock_verified(&self) -> StoreResult<usize> {
        let zone = self.zone_dir(Zone::Verified);
        if !zone.exists() {
            return Ok(0);
        }
        let mut locked = 0;
        for entry in WalkDir::new(&zone).min_depth(1).max_depth(2) {
            let entry = entry.map_err(|e| StoreError::io_at(&zone)(e.into()))?;
            let file_type = entry.file_type();
            match entry.depth() {
                1 if file_type.is_dir() => {
                    set_mode(entry.path(), DIR_LOCKED)?;
                    locked += 1;
                }
                2 if file_type.is_file() => set_mode(entry.path(), FILE_LOCKED)?,
                _ => {}
            }
        }
        debug!(locked, zone = %zone.display(), "verified zone relocked");
        Ok(locked)
    }

    /// Every file in the verified zone, ordered by path.
    ///
    /// Files sitting directly in the zone directory have no digest and are
    /// skipped.
    pub fn scan_verified(&self) -> StoreResult<Vec<VerifiedEntry>> {
        let zone = self.zone_dir(Zone::Verified);
        if !zone.exists() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(&zone).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| StoreError::io_at(&zone)(e.into()))?;
            if entry.file_type().is_dir() {
                continue;
            }
            if entry.depth() == 1 {
                warn!(path = %entry.path().display(), "file outside any digest directory");
                continue;
            }
            let digest = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .map(|d| d.to_string_lossy().into_owned())
                .unwrap_or_default();
            found.push(VerifiedEntry {
                digest,
                filename: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path().to_path_buf(),
            });
        }
        Ok(found)
    }
}

fn require_file(path: &Path) -> StoreResult<()> {
    match fs::metadata(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(path.to_path_buf())),
        Err(e) => Err(StoreError::io_at(path)(e)),
    }
}

fn set_mode(path: &Path, mode: u32) -> StoreResult<()> {
    fs::set_permissions(path, Permissions::from_mode(mode)).map_err(StoreError::io_at(path))
}

/// Sorted names of the regular files directly inside `dir`; empty if `dir`
/// does not exist.
fn list_files(dir: &Path) -> StoreResult<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io_at(dir)(e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(StoreError::io_at(dir))?;
        if entry.file_type().map_err(StoreError::io_at(dir))?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn remove_dir_if_empty(dir: &Path) -> StoreResult<()> {
    let mut entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StoreError::io_at(dir)(e)),
    };
    if entries.next().is_none() {
        fs::remove_dir(dir).map_err(StoreError::io_at(dir))?;
    }
    Ok(())
}

/// Remove `path` and everything below it, first restoring owner write
/// permission on locked directories. Returns `false` if nothing was there.
fn remove_tree(path: &Path) -> StoreResult<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(StoreError::io_at(path)(e)),
    };
    if !meta.is_dir() {
        fs::remove_file(path).map_err(StoreError::io_at(path))?;
        return Ok(true);
    }
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|e| StoreError::io_at(path)(e.into()))?;
        if entry.file_type().is_dir() {
            set_mode(entry.path(), DIR_WRITABLE)?;
        }
    }
    fs::remove_dir_all(path).map_err(StoreError::io_at(path))?;
    Ok(true)
}
