use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One of the three storage zones, in pipeline order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Populated by the downloader; not owned by the verifier.
    Pending,
    /// Owned by the verifier; files are read-only while being hashed.
    Verifying,
    /// Owned by the verifier; final and read-only.
    Verified,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::Pending, Zone::Verifying, Zone::Verified];
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Verifying => write!(f, "verifying"),
            Self::Verified => write!(f, "verified"),
        }
    }
}

/// Location of the store and the names of its zone directories.
///
/// Constructed once at startup and handed to [`crate::StoreLayout`]; nothing
/// in the store reads paths from anywhere else.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub pending: String,
    pub verifying: String,
    pub verified: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/var/tmp/zedmanager/downloads"),
            pending: "pending".into(),
            verifying: "verifier".into(),
            verified: "verified".into(),
        }
    }
}

impl StoreConfig {
    /// Default zone names under a different root.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Directory of the given zone.
    pub fn zone_dir(&self, zone: Zone) -> PathBuf {
        let name = match zone {
            Zone::Pending => &self.pending,
            Zone::Verifying => &self.verifying,
            Zone::Verified => &self.verified,
        };
        self.root.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.root, PathBuf::from("/var/tmp/zedmanager/downloads"));
        assert_eq!(
            c.zone_dir(Zone::Verifying),
            PathBuf::from("/var/tmp/zedmanager/downloads/verifier")
        );
    }

    #[test]
    fn with_root_keeps_zone_names() {
        let c = StoreConfig::with_root("/tmp/store");
        assert_eq!(c.zone_dir(Zone::Pending), PathBuf::from("/tmp/store/pending"));
        assert_eq!(c.zone_dir(Zone::Verified), PathBuf::from("/tmp/store/verified"));
    }

    #[test]
    fn zone_display() {
        let names: Vec<String> = Zone::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["pending", "verifying", "verified"]);
    }
}
