//! Fetch command - Normalize the directory into the record store.

use anyhow::{Context, Result};
use tracing::{debug, info};

use idcgen_core::{CoreError, RecordKind, RecordStore, Settings};
use idcgen_fetch::{Normalizer, SnapshotSource};

use super::RUN_TARGET;

pub async fn execute(settings: &Settings) -> Result<()> {
    let Some(snapshot) = &settings.snapshot else {
        return Err(CoreError::MissingSetting {
            key: "snapshot".to_string(),
            reason: "fetch reads the directory from a snapshot file".to_string(),
        }
        .into());
    };

    info!(target: RUN_TARGET, "Fetching directory from {:?}", snapshot);

    let source = SnapshotSource::from_file(snapshot)
        .with_context(|| format!("Failed to open snapshot {:?}", snapshot))?;
    let store = RecordStore::new(settings.store_dir());
    let summary = Normalizer::new(&source, &store, settings)
        .run()
        .await
        .context("Fetch failed")?;

    for kind in RecordKind::all() {
        let count = summary.count(kind);
        if count > 0 {
            debug!("{:<28} {}", kind.as_str(), count);
        }
    }
    info!(
        target: RUN_TARGET,
        "Fetched {} records into {:?}",
        summary.total(),
        store.root()
    );

    Ok(())
}
