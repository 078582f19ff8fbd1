use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};
use verity_types::ObjectConfig;

use crate::error::{FabricError, Result};
use crate::event::ConfigEvent;
use crate::queue::EventSender;

const CONFIG_EXTENSION: &str = "json";

/// Polls a directory of `<key>.json` configuration files and reports what
/// changed since the previous poll.
///
/// The first poll reports every existing file as a create. A file that
/// cannot be decoded is skipped with a warning and keeps whatever the
/// previous poll saw for it, so a half-written file never looks like a
/// delete.
#[derive(Debug)]
pub struct ConfigDirSource {
    dir: PathBuf,
    seen: BTreeMap<String, ObjectConfig>,
}

impl ConfigDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seen: BTreeMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of configurations known after the last poll.
    pub fn known(&self) -> usize {
        self.seen.len()
    }

    /// Scan the directory and return the changes since the last poll:
    /// creates and modifies ordered by key, then deletes.
    pub fn poll(&mut self) -> Result<Vec<ConfigEvent>> {
        let mut current = BTreeMap::new();
        for (key, path) in self.config_files()? {
            match read_config(&path) {
                Ok(config) => {
                    current.insert(key, config);
                }
                Err(reason) => {
                    warn!(path = %path.display(), %reason, "skipping unreadable config");
                    if let Some(previous) = self.seen.get(&key) {
                        current.insert(key, previous.clone());
                    }
                }
            }
        }

        let mut events = Vec::new();
        for (key, config) in &current {
            match self.seen.get(key) {
                None => events.push(ConfigEvent::Create(config.clone())),
                Some(previous) if previous != config => events.push(ConfigEvent::Modify(config.clone())),
                Some(_) => {}
            }
        }
        for (key, previous) in &self.seen {
            if !current.contains_key(key) {
                events.push(ConfigEvent::delete(previous.name.clone()));
            }
        }

        if !events.is_empty() {
            debug!(dir = %self.dir.display(), changes = events.len(), "config changes");
        }
        self.seen = current;
        Ok(events)
    }

    /// Poll every `interval` and forward changes to `sender` until the
    /// queue's consumer goes away.
    pub async fn run(mut self, sender: EventSender, interval: Duration) -> Result<()> {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if sender.is_closed() {
                return Ok(());
            }
            let events = match self.poll() {
                Ok(events) => events,
                Err(e) => {
                    warn!(error = %e, "config poll failed");
                    continue;
                }
            };
            for event in events {
                match sender.send(event).await {
                    Ok(()) => {}
                    Err(FabricError::Shutdown) => return Ok(()),
                    Err(e) => return Err(e),
                }
            }
        }
    }

    fn config_files(&self) -> Result<Vec<(String, PathBuf)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FabricError::io_at(&self.dir)(e)),
        };
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(FabricError::io_at(&self.dir))?.path();
            if !path.is_file() || path.extension().map_or(true, |e| e != CONFIG_EXTENSION) {
                continue;
            }
            if let Some(key) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((key.to_string(), path.clone()));
            }
        }
        files.sort();
        Ok(files)
    }
}

fn read_config(path: &Path) -> std::result::Result<ObjectConfig, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}
