use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::error::TypeError;
use crate::safename::validate_name;

/// Request to verify one object, supplied by the orchestrator.
///
/// Immutable per version: a change arrives as a whole new record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectConfig {
    /// Locally unique safename.
    pub name: String,
    /// Hex-encoded SHA-256 the content is expected to hash to.
    pub claimed_digest: String,
    /// Where the content was downloaded from. Informational only.
    #[serde(default)]
    pub download_url: String,
    /// Number of outstanding claims on the object.
    #[serde(default)]
    pub ref_count: u32,
}

impl ObjectConfig {
    pub fn new(name: impl Into<String>, claimed_digest: impl Into<String>, ref_count: u32) -> Self {
        Self {
            name: name.into(),
            claimed_digest: claimed_digest.into(),
            download_url: String::new(),
            ref_count,
        }
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = url.into();
        self
    }

    /// Check that the name and claimed digest are safe to use as zone paths,
    /// returning the parsed digest.
    pub fn validate(&self) -> Result<ContentDigest, TypeError> {
        validate_name(&self.name)?;
        ContentDigest::from_hex(&self.claimed_digest)
    }
}

/// Outcome of the verification pipeline for one object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectState {
    /// Never started, or verification failed.
    #[default]
    Initial,
    /// The download finished and verification is in progress.
    Downloaded,
    /// A read-only verified copy exists in the verified zone.
    Delivered,
}

impl std::fmt::Display for ObjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initial => "INITIAL",
            Self::Downloaded => "DOWNLOADED",
            Self::Delivered => "DELIVERED",
        };
        write!(f, "{s}")
    }
}

/// Status record owned by the verifier. One exists per known name and it is
/// always persisted whole.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStatus {
    pub name: String,
    /// Claimed or confirmed digest; names the zone subdirectory.
    pub digest: String,
    pub state: ObjectState,
    pub pending_add: bool,
    pub pending_modify: bool,
    pub ref_count: u32,
    pub last_error: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
}

impl ObjectStatus {
    /// Initial record for a create: verification has been requested.
    pub fn from_config(config: &ObjectConfig) -> Self {
        Self {
            name: config.name.clone(),
            digest: config.claimed_digest.clone(),
            state: ObjectState::Downloaded,
            pending_add: true,
            ref_count: config.ref_count,
            ..Default::default()
        }
    }

    /// Record for an object found already resident in the verified zone.
    pub fn delivered(name: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            digest: digest.into(),
            state: ObjectState::Delivered,
            ..Default::default()
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.state == ObjectState::Delivered
    }

    /// Whether `config` names the same object identity as this record.
    pub fn same_identity(&self, config: &ObjectConfig) -> bool {
        self.name == config.name && self.digest == config.claimed_digest
    }

    /// Stamp a failure onto the record.
    pub fn record_error(&mut self, message: impl Into<String>, at: DateTime<Utc>) {
        self.last_error = Some(message.into());
        self.last_error_time = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn status_from_config_is_pending_add() {
        let config = ObjectConfig::new("a.img.x", DIGEST, 2);
        let status = ObjectStatus::from_config(&config);
        assert_eq!(status.state, ObjectState::Downloaded);
        assert!(status.pending_add);
        assert!(!status.pending_modify);
        assert_eq!(status.ref_count, 2);
        assert_eq!(status.digest, DIGEST);
        assert!(status.last_error.is_none());
    }

    #[test]
    fn same_identity_compares_name_and_digest() {
        let config = ObjectConfig::new("a", DIGEST, 1);
        let status = ObjectStatus::from_config(&config);
        assert!(status.same_identity(&ObjectConfig::new("a", DIGEST, 0)));
        assert!(!status.same_identity(&ObjectConfig::new("b", DIGEST, 1)));
        assert!(!status.same_identity(&ObjectConfig::new("a", "00", 1)));
    }

    #[test]
    fn validate_rejects_bad_digest_and_name() {
        assert!(ObjectConfig::new("a", DIGEST, 1).validate().is_ok());
        assert!(ObjectConfig::new("a", "zz", 1).validate().is_err());
        assert!(ObjectConfig::new("../a", DIGEST, 1).validate().is_err());
    }

    #[test]
    fn status_json_schema() {
        let mut status = ObjectStatus::delivered("v1.img", DIGEST);
        status.ref_count = 1;
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "DELIVERED");
        assert_eq!(json["pendingAdd"], false);
        assert_eq!(json["refCount"], 1);
        assert!(json["lastError"].is_null());
        assert!(json["lastErrorTime"].is_null());
    }

    #[test]
    fn record_error_sets_both_fields() {
        let mut status = ObjectStatus::default();
        let now = Utc::now();
        status.record_error("got a expected b", now);
        assert_eq!(status.last_error.as_deref(), Some("got a expected b"));
        assert_eq!(status.last_error_time, Some(now));
    }

    #[test]
    fn config_download_url_is_optional() {
        let json = format!(r#"{{"name":"a","claimedDigest":"{DIGEST}","refCount":3}}"#);
        let config: ObjectConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.ref_count, 3);
        assert!(config.download_url.is_empty());
    }
}
