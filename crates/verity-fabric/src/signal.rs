use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tracing::info;

use crate::error::{FabricError, Result};

/// Announces to downstream consumers that startup recovery has finished and
/// the status records fully represent the store.
pub trait RecoverySignal: Send + Sync {
    /// Withdraw any announcement left by a previous run.
    fn cleanup(&self) -> Result<()>;

    /// Announce that recovery is complete.
    fn recovery_complete(&self) -> Result<()>;
}

/// Signal carried by a marker file, `<run_dir>/<agent>.restarted`.
#[derive(Clone, Debug)]
pub struct MarkerFileSignal {
    path: PathBuf,
}

impl MarkerFileSignal {
    pub fn new(run_dir: impl AsRef<Path>, agent: &str) -> Self {
        Self {
            path: run_dir.as_ref().join(format!("{agent}.restarted")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the marker is currently present.
    pub fn is_signaled(&self) -> bool {
        self.path.exists()
    }
}

impl RecoverySignal for MarkerFileSignal {
    fn cleanup(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FabricError::io_at(&self.path)(e)),
        }
    }

    fn recovery_complete(&self) -> Result<()> {
        fs::write(&self.path, b"").map_err(FabricError::io_at(&self.path))?;
        info!(marker = %self.path.display(), "recovery complete");
        Ok(())
    }
}

/// In-process signal backed by a `tokio::sync::watch` channel.
#[derive(Debug)]
pub struct WatchSignal {
    tx: watch::Sender<bool>,
}

impl WatchSignal {
    /// Create the signal and a receiver that observes it.
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl RecoverySignal for WatchSignal {
    fn cleanup(&self) -> Result<()> {
        self.tx.send_replace(false);
        Ok(())
    }

    fn recovery_complete(&self) -> Result<()> {
        self.tx.send_replace(true);
        Ok(())
    }
}
