//! Generate command - Rebuild the Terraform tree from the record store.

use anyhow::{Context, Result};
use tracing::info;

use idcgen_core::{RecordStore, Settings};
use idcgen_iac::{resolve_versions, Generator, RegistryClient, VersionSource};

use super::RUN_TARGET;

pub async fn execute(settings: &Settings) -> Result<()> {
    let output = settings.terraform_dir();
    info!(target: RUN_TARGET, "Generating Terraform into {:?}", output);

    let registry = RegistryClient::new();
    let source: Option<&dyn VersionSource> = if settings.auto_update_providers {
        Some(&registry)
    } else {
        None
    };
    let versions = resolve_versions(source, settings.platform).await;

    let store = RecordStore::new(settings.store_dir());
    let summary = Generator::new(settings, &store)
        .with_versions(versions)
        .run()
        .context("Generation failed")?;

    if let Some(retained) = &summary.retained {
        info!(
            "Retained {} managed policies and {} policy documents",
            retained.policies.len(),
            retained.documents
        );
    }
    info!(
        target: RUN_TARGET,
        "Generated {} files into {:?}",
        summary.written.len(),
        output
    );

    Ok(())
}
