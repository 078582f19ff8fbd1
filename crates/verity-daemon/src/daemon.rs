use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use verity_core::{Dispatcher, Verifier};
use verity_fabric::{event_queue, ConfigDirSource, MarkerFileSignal, RecoverySignal};
use verity_store::{DirStatusStore, StatusStore, StoreLayout};

use crate::config::DaemonConfig;

const DIR_MODE: u32 = 0o700;

/// Bring the store to a known state and rebuild the status records.
///
/// Status records from a previous run are discarded and rebuilt from the
/// verified zone, and anything caught mid-verification is thrown away.
/// The restart marker is written last.
pub fn bootstrap(config: &DaemonConfig) -> anyhow::Result<Verifier> {
    for dir in [&config.config_dir, &config.status_dir, &config.run_dir] {
        create_dir(dir)?;
    }

    let signal = MarkerFileSignal::new(&config.run_dir, &config.agent_name);
    signal.cleanup().context("removing restart marker")?;

    let statuses = Arc::new(DirStatusStore::open(&config.status_dir).context("opening status directory")?);
    let stale = statuses.clear().context("clearing stale status records")?;
    if stale > 0 {
        info!(stale, dir = %config.status_dir.display(), "discarded status records from previous run");
    }

    let layout = StoreLayout::new(config.store.clone());
    layout.ensure_zones().context("creating zone directories")?;
    layout.reset_verifying().context("clearing verifying zone")?;

    let verifier = Verifier::new(layout, statuses);
    verifier
        .recovery_scanner()
        .run(&signal)
        .context("recovering verified objects")?;
    Ok(verifier)
}

/// Run the verifier until the event loop fails or the process is
/// interrupted.
pub async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    info!(
        agent = %config.agent_name,
        store = %config.store.root.display(),
        config_dir = %config.config_dir.display(),
        "starting"
    );
    let verifier = bootstrap(&config)?;

    let (tx, rx) = event_queue(config.queue_capacity);
    let source = ConfigDirSource::new(&config.config_dir);
    let poller = tokio::spawn(source.run(tx, config.poll_interval()));
    let dispatcher = Dispatcher::new(verifier);

    let outcome = tokio::select! {
        result = dispatcher.run(rx) => match result {
            Ok(stats) => {
                info!(?stats, "event loop finished");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("event loop failed")),
        },
        interrupted = tokio::signal::ctrl_c() => {
            info!("interrupted; shutting down");
            interrupted.context("waiting for interrupt")
        }
    };
    poller.abort();
    if let Err(e) = &outcome {
        warn!(error = %e, "verifier stopped");
    }
    outcome
}

fn create_dir(dir: &Path) -> anyhow::Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(dir)
        .with_context(|| format!("creating {}", dir.display()))
}
