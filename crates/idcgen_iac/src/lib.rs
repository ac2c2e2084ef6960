//! # idcgen_iac
//!
//! Terraform generation for idcgen.
//!
//! Reads the normalized records written by a fetch run and rebuilds the
//! Terraform tree for the configured state layout, platform and TEAM flag.
//!
//! ## Features
//!
//! - Fixed task registry with pure record filters
//! - Full-rebuild generator driven by the mode matrix
//! - Single-state import address rewiring into child modules
//! - Managed-policy retention across rebuilds
//! - Provider versions from the Terraform registry with pinned fallbacks
//!
//! ## Example
//!
//! ```rust,no_run
//! use idcgen_core::{RecordStore, Settings};
//! use idcgen_iac::{resolve_versions, Generator, RegistryClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! let store = RecordStore::new(settings.store_dir());
//! let registry = RegistryClient::new();
//! let versions = resolve_versions(Some(&registry), settings.platform).await;
//!
//! let summary = Generator::new(&settings, &store).with_versions(versions).run()?;
//! println!("Wrote {} files", summary.written.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod postprocess;
pub mod provider;
pub mod retain;
pub mod tasks;

pub use error::{IacError, IacResult};
pub use generator::{GenerateSummary, Generator};
pub use postprocess::{finalize_content, postprocess, PostprocessReport, HEADER};
pub use provider::{
    latest_stable, resolve_versions, ProviderVersions, RegistryClient, TerraformProvider,
    VersionSource,
};
pub use retain::{retain_managed_policies, PolicyParser, Retained, RetainedForm};
pub use tasks::{FilterId, TaskInput, TaskRegistry, TaskSpec, JOIN_TASKS};
