//! idcgen CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Configuration error
//! - 3: Source unavailable
//! - 4: Template error
//! - 5: Generation error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use idcgen_core::{CoreError, Verbosity};
use idcgen_fetch::FetchError;
use idcgen_iac::IacError;
use idcgen_templates::TemplateError;

mod commands;

use commands::{Cli, RUN_TARGET};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const CONFIGURATION_ERROR: u8 = 2;
    pub const SOURCE_UNAVAILABLE: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
    pub const GENERATION_ERROR: u8 = 5;
}

/// Crates whose events follow the configured verbosity.
const LOG_TARGETS: [&str; 5] = [
    "idcgen",
    "idcgen_core",
    "idcgen_fetch",
    "idcgen_templates",
    "idcgen_iac",
];

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            init_logging(Verbosity::Normal);
            return report(&e);
        }
    };
    init_logging(settings.verbosity);

    match commands::execute(cli.command, &settings).await {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => report(&e),
    }
}

/// Filter directives for a verbosity level.
fn log_directives(verbosity: Verbosity) -> String {
    let level = match verbosity {
        Verbosity::Quiet => "warn",
        Verbosity::Normal => "info",
        Verbosity::Verbose => "debug",
    };

    let mut directives = vec!["warn".to_string()];
    directives.extend(LOG_TARGETS.iter().map(|t| format!("{}={}", t, level)));
    directives.push(format!("{}=info", RUN_TARGET));
    directives.join(",")
}

/// Install the subscriber. `RUN_TARGET` lines stay visible in quiet mode;
/// `RUST_LOG` overrides everything when set.
fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directives(verbosity)));

    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

fn report(e: &anyhow::Error) -> ExitCode {
    let exit_code = categorize_error(e);
    eprintln!("❌ Error: {:#}", e);
    ExitCode::from(exit_code)
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<IacError>() {
            return if err.is_configuration() {
                ExitCodes::CONFIGURATION_ERROR
            } else if err.is_source_unavailable() {
                ExitCodes::SOURCE_UNAVAILABLE
            } else if err.is_template() {
                ExitCodes::TEMPLATE_ERROR
            } else {
                ExitCodes::GENERATION_ERROR
            };
        }
        if let Some(err) = cause.downcast_ref::<FetchError>() {
            if let FetchError::Core(core) = err {
                if core.is_configuration() {
                    return ExitCodes::CONFIGURATION_ERROR;
                }
            }
            if err.is_source_unavailable() {
                return ExitCodes::SOURCE_UNAVAILABLE;
            }
            return ExitCodes::GENERAL_ERROR;
        }
        if cause.downcast_ref::<TemplateError>().is_some() {
            return ExitCodes::TEMPLATE_ERROR;
        }
        if let Some(err) = cause.downcast_ref::<CoreError>() {
            if err.is_configuration() {
                return ExitCodes::CONFIGURATION_ERROR;
            }
            if err.is_source_unavailable() {
                return ExitCodes::SOURCE_UNAVAILABLE;
            }
        }
    }
    ExitCodes::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_log_directives() {
        let quiet = log_directives(Verbosity::Quiet);
        assert!(quiet.starts_with("warn,"));
        assert!(quiet.contains("idcgen_iac=warn"));
        assert!(quiet.ends_with("idcgen::run=info"));
        assert!(log_directives(Verbosity::Verbose).contains("idcgen_fetch=debug"));
    }

    #[test]
    fn test_categorize_configuration() {
        let err: anyhow::Error = CoreError::MissingSetting {
            key: "tfc_org".to_string(),
            reason: "required".to_string(),
        }
        .into();
        assert_eq!(categorize_error(&err), ExitCodes::CONFIGURATION_ERROR);

        let wrapped = anyhow::Error::from(FetchError::Core(CoreError::InvalidSetting {
            key: "platform".to_string(),
            value: "aws".to_string(),
            expected: "local, tfc".to_string(),
        }))
        .context("Fetch failed");
        assert_eq!(categorize_error(&wrapped), ExitCodes::CONFIGURATION_ERROR);
    }

    #[test]
    fn test_categorize_pipeline_errors() {
        let missing = anyhow::Error::from(IacError::InstanceMissing(PathBuf::from("json")))
            .context("Generation failed");
        assert_eq!(categorize_error(&missing), ExitCodes::SOURCE_UNAVAILABLE);

        let no_instance: anyhow::Error = FetchError::NoInstance.into();
        assert_eq!(categorize_error(&no_instance), ExitCodes::SOURCE_UNAVAILABLE);

        let template: anyhow::Error = IacError::Template(TemplateError::NotFound(
            "providers.tf.tmpl".to_string(),
        ))
        .into();
        assert_eq!(categorize_error(&template), ExitCodes::TEMPLATE_ERROR);

        let failed: anyhow::Error = IacError::GenerationFailed("boom".to_string()).into();
        assert_eq!(categorize_error(&failed), ExitCodes::GENERATION_ERROR);

        assert_eq!(categorize_error(&anyhow::anyhow!("other")), ExitCodes::GENERAL_ERROR);
    }
}
