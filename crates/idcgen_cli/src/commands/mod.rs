//! CLI command definitions.
//!
//! Global options mirror the settings keys and are layered over the
//! settings file. Without a subcommand, fetch and generate run in sequence.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use idcgen_core::{Settings, SettingsLayer, DEFAULT_SETTINGS_FILE};

pub mod fetch;
pub mod generate;

/// Log target of the start and stop lines, kept visible in quiet mode.
pub const RUN_TARGET: &str = "idcgen::run";

/// idcgen - IAM Identity Center to Terraform generator
#[derive(Parser)]
#[command(name = "idcgen")]
#[command(version, about = "idcgen - IAM Identity Center to Terraform generator")]
#[command(long_about = r#"
idcgen reads an IAM Identity Center directory, normalizes it into records and
generates Terraform configuration with import blocks for everything it found.

COMMANDS:
  fetch     → Normalize the directory into the record store
  generate  → Rebuild the Terraform tree from the record store
  (none)    → fetch, then generate

EXIT CODES:
  0 - Success
  1 - General error
  2 - Configuration error
  3 - Source unavailable
  4 - Template error
  5 - Generation error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file
    #[arg(short, long, global = true, env = "IDCGEN_CONFIG", default_value = DEFAULT_SETTINGS_FILE)]
    pub config: PathBuf,

    /// Output directory for records and Terraform
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Static template directory
    #[arg(long, global = true)]
    pub templates: Option<PathBuf>,

    /// Directory snapshot to fetch from (YAML or JSON)
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// State layout: single or multi
    #[arg(short, long, global = true)]
    pub state_mode: Option<String>,

    /// Platform: local or tfc
    #[arg(short, long, global = true)]
    pub platform: Option<String>,

    /// Terraform Cloud organization
    #[arg(short, long, global = true)]
    pub tfc_org: Option<String>,

    /// Workspace name prefix
    #[arg(short = 'x', long, global = true)]
    pub prefix: Option<String>,

    /// Workspace environment
    #[arg(short, long, global = true)]
    pub environment: Option<String>,

    /// Look up the latest provider versions
    #[arg(short, long, global = true, num_args = 0..=1, default_missing_value = "true")]
    pub auto_update_providers: Option<bool>,

    /// Include TEAM resources
    #[arg(short = 'm', long, global = true, num_args = 0..=1, default_missing_value = "true")]
    pub enable_team: Option<bool>,

    /// Keep the managed policies of the previous run
    #[arg(short, long, global = true, num_args = 0..=1, default_missing_value = "true")]
    pub retain_managed_policies: Option<bool>,

    /// Verbosity: quiet, normal or verbose
    #[arg(long, global = true)]
    pub verbosity: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Normalize the directory into the record store
    Fetch,

    /// Rebuild the Terraform tree from the record store
    Generate,
}

impl Cli {
    /// Override layer built from the command line.
    pub fn overrides(&self) -> SettingsLayer {
        let verbosity = if self.verbose {
            Some("verbose".to_string())
        } else if self.quiet {
            Some("quiet".to_string())
        } else {
            self.verbosity.clone()
        };

        SettingsLayer {
            verbosity,
            output: self.output.clone(),
            templates: self.templates.clone(),
            snapshot: self.snapshot.clone(),
            state_mode: self.state_mode.clone(),
            platform: self.platform.clone(),
            tfc_org: self.tfc_org.clone(),
            prefix: self.prefix.clone(),
            environment: self.environment.clone(),
            enable_team: self.enable_team,
            auto_update_providers: self.auto_update_providers,
            retain_managed_policies: self.retain_managed_policies,
            managed_policy_data_sources: None,
        }
    }

    /// Resolved settings for this run.
    pub fn settings(&self) -> Result<Settings> {
        Settings::load(&self.config, &self.overrides())
            .with_context(|| format!("Failed to load settings from {:?}", self.config))
    }
}

/// Run the selected command, or fetch then generate.
pub async fn execute(command: Option<Commands>, settings: &Settings) -> Result<()> {
    match command {
        Some(Commands::Fetch) => fetch::execute(settings).await,
        Some(Commands::Generate) => generate::execute(settings).await,
        None => {
            fetch::execute(settings).await?;
            generate::execute(settings).await
        }
    }
}
