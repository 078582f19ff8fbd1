//! End-to-end behavior of the verifier against a real zone tree and an
//! on-disk status directory.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use verity_core::{Dispatcher, Outcome, RecoveryScanner, Verifier};
use verity_crypto::DigestVerifier;
use verity_fabric::{event_queue, ConfigDirSource, ConfigEvent, MarkerFileSignal, RecoverySignal};
use verity_store::{DirStatusStore, StatusStore, StoreConfig, StoreLayout, Zone};
use verity_types::{ObjectConfig, ObjectState, ObjectStatus};

struct Harness {
    dir: tempfile::TempDir,
    layout: StoreLayout,
    statuses: Arc<DirStatusStore>,
    dispatcher: Dispatcher,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(StoreConfig::with_root(dir.path().join("downloads")));
        layout.ensure_zones().unwrap();
        let statuses = Arc::new(DirStatusStore::open(dir.path().join("status")).unwrap());
        let dispatcher = Dispatcher::new(Verifier::new(layout.clone(), statuses.clone()));
        Self {
            dir,
            layout,
            statuses,
            dispatcher,
        }
    }

    /// Simulate the downloader finishing `name` under `digest`.
    fn download(&self, digest: &str, name: &str, content: &[u8]) -> PathBuf {
        let path = self.layout.object_path(Zone::Pending, digest, name).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn apply(&self, event: ConfigEvent) -> Option<ObjectStatus> {
        match self.dispatcher.dispatch(event).unwrap() {
            Outcome::Updated(status) => Some(status),
            Outcome::Removed | Outcome::Ignored => None,
        }
    }

    fn record(&self, name: &str) -> Option<ObjectStatus> {
        self.statuses.get(name).unwrap()
    }

    fn zone_entries(&self, zone: Zone) -> usize {
        fs::read_dir(self.layout.zone_dir(zone)).unwrap().count()
    }
}

fn sha(content: &[u8]) -> String {
    DigestVerifier::digest_bytes(content).to_hex()
}

fn safename(file: &str, digest: &str) -> String {
    format!("host-foo.bar%2Fimages%2F{file}.{digest}")
}

#[test]
fn verified_object_is_delivered_under_its_basename() {
    let h = Harness::new();
    let content = b"bootable image";
    let digest = sha(content);
    let name = safename("v1.img", &digest);
    h.download(&digest, &name, content);

    let config = ObjectConfig::new(&name, &digest, 1).with_download_url("https://foo.bar/images/v1.img");
    let status = h.apply(ConfigEvent::Create(config)).unwrap();

    assert_eq!(status.state, ObjectState::Delivered);
    let verified = h.layout.zone_dir(Zone::Verified).join(&digest).join("v1.img");
    assert_eq!(fs::read(&verified).unwrap(), content);
    assert_eq!(h.zone_entries(Zone::Pending), 0);
    assert_eq!(h.zone_entries(Zone::Verifying), 0);

    let json: serde_json::Value =
        serde_json::from_slice(&fs::read(h.statuses.record_path(&name).unwrap()).unwrap()).unwrap();
    assert_eq!(json["state"], "DELIVERED");
    assert_eq!(json["pendingAdd"], false);
    assert_eq!(json["refCount"], 1);
}

#[test]
fn mismatch_leaves_nothing_behind() {
    let h = Harness::new();
    let claimed = sha(b"content A");
    let actual = sha(b"content B");
    let name = safename("v1.img", &claimed);
    h.download(&claimed, &name, b"content B");

    let status = h.apply(ConfigEvent::Create(ObjectConfig::new(&name, &claimed, 1))).unwrap();
    assert_eq!(status.state, ObjectState::Initial);
    assert!(!status.pending_add);
    assert_eq!(status.last_error.unwrap(), format!("got {actual} expected {claimed}"));
    assert!(status.last_error_time.is_some());
    assert_eq!(h.zone_entries(Zone::Verifying), 0);
    assert_eq!(h.zone_entries(Zone::Verified), 0);
}

#[test]
fn record_with_empty_digest_is_deleted_with_its_status_file() {
    let h = Harness::new();
    let config = ObjectConfig::new("v1.img.x", "", 1);
    let status = h.apply(ConfigEvent::Create(config)).unwrap();
    assert_eq!(status.state, ObjectState::Initial);
    assert!(status.last_error.is_some());

    assert!(h.apply(ConfigEvent::delete("v1.img.x")).is_none());
    assert!(h.record("v1.img.x").is_none());
    assert!(!h.statuses.record_path("v1.img.x").unwrap().exists());
}

#[test]
fn resubmitting_after_mismatch_delivers() {
    let h = Harness::new();
    let good = b"corrected content";
    let digest = sha(good);
    let name = safename("v1.img", &digest);
    h.download(&digest, &name, b"corrupt");
    let config = ObjectConfig::new(&name, &digest, 1);
    assert_eq!(h.apply(ConfigEvent::Create(config.clone())).unwrap().state, ObjectState::Initial);

    assert!(h.apply(ConfigEvent::delete(&name)).is_none());
    h.download(&digest, &name, good);
    let status = h.apply(ConfigEvent::Create(config)).unwrap();
    assert_eq!(status.state, ObjectState::Delivered);
}

#[test]
fn refcount_zero_releases_verified_copy_but_keeps_record() {
    let h = Harness::new();
    let content = b"short lived";
    let digest = sha(content);
    let name = safename("v1.img", &digest);
    h.download(&digest, &name, content);
    h.apply(ConfigEvent::Create(ObjectConfig::new(&name, &digest, 1)));

    let status = h.apply(ConfigEvent::Modify(ObjectConfig::new(&name, &digest, 0))).unwrap();
    assert_eq!(status.state, ObjectState::Initial);
    assert_eq!(status.ref_count, 0);
    assert_eq!(h.zone_entries(Zone::Verified), 0);
    assert_eq!(h.record(&name).unwrap().state, ObjectState::Initial);
}

#[test]
fn refcount_zero_on_undelivered_object_keeps_foreign_verified_copy() {
    let h = Harness::new();
    let content = b"shared bytes";
    let digest = sha(content);
    let owner = safename("owner.img", &digest);
    h.download(&digest, &owner, content);
    h.apply(ConfigEvent::Create(ObjectConfig::new(&owner, &digest, 1)));

    let late = safename("late.img", &digest);
    let err = h
        .dispatcher
        .dispatch(ConfigEvent::Create(ObjectConfig::new(&late, &digest, 1)))
        .unwrap_err();
    assert!(err.is_retryable(), "no download yet");
    h.apply(ConfigEvent::Modify(ObjectConfig::new(&late, &digest, 0)));

    assert_eq!(h.layout.verified_files(&digest).unwrap(), vec!["owner.img".to_string()]);
}

#[test]
fn identical_content_under_two_names_keeps_one_file() {
    let h = Harness::new();
    let content = b"same bytes";
    let digest = sha(content);
    let first = safename("first.img", &digest);
    let second = safename("second.img", &digest);

    h.download(&digest, &first, content);
    h.apply(ConfigEvent::Create(ObjectConfig::new(&first, &digest, 1)));
    h.download(&digest, &second, content);
    h.apply(ConfigEvent::Create(ObjectConfig::new(&second, &digest, 1)));

    assert_eq!(h.layout.verified_files(&digest).unwrap(), vec!["second.img".to_string()]);
    assert_eq!(h.record(&second).unwrap().state, ObjectState::Delivered);

    // The surviving file is still claimed by `second`.
    h.apply(ConfigEvent::delete(first));
    assert_eq!(h.layout.verified_files(&digest).unwrap(), vec!["second.img".to_string()]);
}

#[test]
fn deleting_failed_object_never_removes_other_names_copy() {
    let h = Harness::new();
    let content = b"victim bytes";
    let digest = sha(content);
    let victim = safename("victim.img", &digest);
    h.download(&digest, &victim, content);
    h.apply(ConfigEvent::Create(ObjectConfig::new(&victim, &digest, 1)));

    let impostor = safename("impostor.img", &digest);
    h.download(&digest, &impostor, b"different bytes");
    let failed = h.apply(ConfigEvent::Create(ObjectConfig::new(&impostor, &digest, 1))).unwrap();
    assert_eq!(failed.state, ObjectState::Initial);

    assert!(h.apply(ConfigEvent::delete(&impostor)).is_none());
    assert!(h.record(&impostor).is_none());
    assert_eq!(h.layout.verified_files(&digest).unwrap(), vec!["victim.img".to_string()]);
}

#[test]
fn changing_digest_moves_object_to_new_directory() {
    let h = Harness::new();
    let old_digest = sha(b"v1");
    let new_digest = sha(b"v2");
    let name = safename("app.img", &old_digest);
    h.download(&old_digest, &name, b"v1");
    h.apply(ConfigEvent::Create(ObjectConfig::new(&name, &old_digest, 1)));

    h.download(&new_digest, &name, b"v2");
    let status = h.apply(ConfigEvent::Modify(ObjectConfig::new(&name, &new_digest, 1))).unwrap();
    assert_eq!(status.state, ObjectState::Delivered);
    assert!(!status.pending_modify);
    assert!(h.layout.verified_files(&old_digest).unwrap().is_empty());
    assert_eq!(h.layout.verified_files(&new_digest).unwrap(), vec!["app.img".to_string()]);
}

#[test]
fn recovery_twice_yields_identical_records() {
    let h = Harness::new();
    for (file, content) in [("one.img", &b"one"[..]), ("two.img", &b"two"[..])] {
        let digest = sha(content);
        let name = safename(file, &digest);
        h.download(&digest, &name, content);
        h.apply(ConfigEvent::Create(ObjectConfig::new(&name, &digest, 1)));
    }

    let signal = MarkerFileSignal::new(h.dir.path(), "verifier");
    h.statuses.clear().unwrap();
    let scanner = RecoveryScanner::new(h.layout.clone(), h.statuses.clone());
    scanner.run(&signal).unwrap();
    let first = h.statuses.list().unwrap();
    assert_eq!(first.len(), 2);
    let names: Vec<&str> = first.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["one.img", "two.img"]);
    assert!(first.iter().all(|s| s.state == ObjectState::Delivered && s.ref_count == 0));

    scanner.run(&signal).unwrap();
    assert_eq!(h.statuses.list().unwrap(), first);
    assert!(signal.is_signaled());
    signal.cleanup().unwrap();
}

#[tokio::test]
async fn config_directory_drives_the_pipeline() {
    let h = Harness::new();
    let config_dir = h.dir.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let content = b"polled object";
    let digest = sha(content);
    let name = safename("polled.img", &digest);
    h.download(&digest, &name, content);
    let config = ObjectConfig::new(&name, &digest, 1);
    fs::write(
        config_dir.join(format!("{name}.json")),
        serde_json::to_vec(&config).unwrap(),
    )
    .unwrap();

    let mut source = ConfigDirSource::new(&config_dir);
    let (tx, rx) = event_queue(4);
    for event in source.poll().unwrap() {
        tx.send(event).await.unwrap();
    }
    drop(tx);

    let stats = h.dispatcher.run(rx).await.unwrap();
    assert_eq!(stats.handled, 1);
    assert_eq!(h.record(&name).unwrap().state, ObjectState::Delivered);

    // Polling an unchanged directory produces no events.
    assert!(source.poll().unwrap().is_empty());
}
