use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use verity_store::StoreConfig;

/// Process configuration. Every field has a default, so an empty file (or no
/// file at all) yields a working setup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Name used for the restart marker.
    pub agent_name: String,
    /// Directory of `<name>.json` configuration records.
    pub config_dir: PathBuf,
    /// Directory the status records are published to.
    pub status_dir: PathBuf,
    /// Directory holding the restart marker.
    pub run_dir: PathBuf,
    pub store: StoreConfig,
    pub poll_interval_ms: u64,
    pub queue_capacity: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            agent_name: "verifier".into(),
            config_dir: PathBuf::from("/var/tmp/verifier/config"),
            status_dir: PathBuf::from("/var/run/verifier/status"),
            run_dir: PathBuf::from("/var/run/verifier"),
            store: StoreConfig::default(),
            poll_interval_ms: 1000,
            queue_capacity: 256,
        }
    }
}

impl DaemonConfig {
    /// Load from a TOML file, or use the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
