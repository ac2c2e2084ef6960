//! Run settings.
//!
//! Settings are resolved once per run from three layers, highest precedence
//! first: explicit overrides, the YAML settings file, built-in defaults.
//! The resolved value is passed by reference to every stage.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::matrix::Mode;

/// Default settings file name.
pub const DEFAULT_SETTINGS_FILE: &str = "config.yaml";

/// Default workspace prefix.
pub const DEFAULT_PREFIX: &str = "aws-identity-management";

/// Output verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" => Some(Verbosity::Quiet),
            "normal" => Some(Verbosity::Normal),
            "verbose" => Some(Verbosity::Verbose),
            _ => None,
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Verbosity::Quiet => 0,
            Verbosity::Normal => 1,
            Verbosity::Verbose => 2,
        }
    }
}

/// Terraform state layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMode {
    #[default]
    Single,
    Multi,
}

impl StateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateMode::Single => "single",
            StateMode::Multi => "multi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" => Some(StateMode::Single),
            "multi" => Some(StateMode::Multi),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![StateMode::Single, StateMode::Multi]
    }
}

impl std::fmt::Display for StateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where Terraform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Local,
    Tfc,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Local => "local",
            Platform::Tfc => "tfc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" => Some(Platform::Local),
            "tfc" => Some(Platform::Tfc),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Platform::Local, Platform::Tfc]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One partial layer of settings (the settings file or CLI overrides).
///
/// Enumerated values stay strings here so that an invalid value is reported
/// against its key during resolution.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SettingsLayer {
    pub verbosity: Option<String>,
    pub output: Option<PathBuf>,
    pub templates: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
    pub state_mode: Option<String>,
    pub platform: Option<String>,
    pub tfc_org: Option<String>,
    pub prefix: Option<String>,
    pub environment: Option<String>,
    pub enable_team: Option<bool>,
    pub auto_update_providers: Option<bool>,
    pub retain_managed_policies: Option<bool>,
    pub managed_policy_data_sources: Option<bool>,
}

impl SettingsLayer {
    /// Read a settings file. A missing or empty file is an empty layer.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            debug!("Settings file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| CoreError::SettingsFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub verbosity: Verbosity,
    pub output: PathBuf,
    pub templates: PathBuf,
    pub snapshot: Option<PathBuf>,
    pub state_mode: StateMode,
    pub platform: Platform,
    pub tfc_org: String,
    pub prefix: String,
    pub environment: String,
    pub enable_team: bool,
    pub auto_update_providers: bool,
    pub retain_managed_policies: bool,
    /// Look managed policies up through data sources instead of static ARNs.
    pub managed_policy_data_sources: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            output: PathBuf::from("./output"),
            templates: PathBuf::from("./templates"),
            snapshot: None,
            state_mode: StateMode::Single,
            platform: Platform::Local,
            tfc_org: String::new(),
            prefix: DEFAULT_PREFIX.to_string(),
            environment: String::new(),
            enable_team: false,
            auto_update_providers: true,
            retain_managed_policies: false,
            managed_policy_data_sources: false,
        }
    }
}

impl Settings {
    /// Resolve defaults, then the file layer, then the override layer.
    pub fn resolve(file: &SettingsLayer, overrides: &SettingsLayer) -> CoreResult<Self> {
        let mut settings = Self::default();
        settings.apply(file)?;
        settings.apply(overrides)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load the settings file at `path` and apply overrides on top.
    pub fn load(path: &Path, overrides: &SettingsLayer) -> CoreResult<Self> {
        let file = SettingsLayer::from_file(path)?;
        Self::resolve(&file, overrides)
    }

    fn apply(&mut self, layer: &SettingsLayer) -> CoreResult<()> {
        if let Some(value) = &layer.verbosity {
            self.verbosity = Verbosity::from_str(value)
                .ok_or_else(|| invalid("verbosity", value, "quiet, normal, verbose"))?;
        }
        if let Some(value) = &layer.state_mode {
            self.state_mode = StateMode::from_str(value)
                .ok_or_else(|| invalid("state_mode", value, "single, multi"))?;
        }
        if let Some(value) = &layer.platform {
            self.platform = Platform::from_str(value)
                .ok_or_else(|| invalid("platform", value, "local, tfc"))?;
        }
        if let Some(value) = &layer.output {
            self.output = value.clone();
        }
        if let Some(value) = &layer.templates {
            self.templates = value.clone();
        }
        if let Some(value) = &layer.snapshot {
            self.snapshot = Some(value.clone());
        }
        if let Some(value) = &layer.tfc_org {
            self.tfc_org = value.clone();
        }
        if let Some(value) = &layer.prefix {
            self.prefix = value.clone();
        }
        if let Some(value) = &layer.environment {
            self.environment = value.clone();
        }
        if let Some(value) = layer.enable_team {
            self.enable_team = value;
        }
        if let Some(value) = layer.auto_update_providers {
            self.auto_update_providers = value;
        }
        if let Some(value) = layer.retain_managed_policies {
            self.retain_managed_policies = value;
        }
        if let Some(value) = layer.managed_policy_data_sources {
            self.managed_policy_data_sources = value;
        }
        Ok(())
    }

    /// Check companion settings.
    pub fn validate(&self) -> CoreResult<()> {
        if self.platform == Platform::Tfc && self.tfc_org.trim().is_empty() {
            return Err(CoreError::MissingSetting {
                key: "tfc_org".to_string(),
                reason: "required when platform is tfc".to_string(),
            });
        }
        if self.prefix.trim().is_empty() {
            return Err(CoreError::MissingSetting {
                key: "prefix".to_string(),
                reason: "workspace prefix must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Workspace name for the whole configuration (single-state) or for one
    /// component (multi-state).
    pub fn workspace_name(&self, component: Option<&str>) -> CoreResult<String> {
        let base = if self.environment.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}-{}", self.prefix, self.environment)
        };

        match self.state_mode {
            StateMode::Single => Ok(base),
            StateMode::Multi => match component {
                Some(component) if !component.is_empty() => Ok(format!("{}-{}", base, component)),
                _ => Err(CoreError::MissingSetting {
                    key: "component".to_string(),
                    reason: "multi-state workspace names need a component".to_string(),
                }),
            },
        }
    }

    /// Mode matrix inputs derived from these settings.
    pub fn mode(&self) -> Mode {
        Mode {
            state_mode: self.state_mode,
            platform: self.platform,
            team_enabled: self.enable_team,
            managed_policy_data_sources: self.managed_policy_data_sources,
        }
    }

    /// Directory holding the record store.
    pub fn store_dir(&self) -> PathBuf {
        self.output.join("json")
    }

    /// Directory holding the generated Terraform tree.
    pub fn terraform_dir(&self) -> PathBuf {
        self.output.join("terraform")
    }
}

fn invalid(key: &str, value: &str, expected: &str) -> CoreError {
    CoreError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&SettingsLayer::default(), &SettingsLayer::default()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.state_mode, StateMode::Single);
        assert_eq!(settings.platform, Platform::Local);
        assert!(settings.auto_update_providers);
        assert!(!settings.enable_team);
    }

    #[test]
    fn test_override_beats_file_beats_default() {
        let file = SettingsLayer {
            state_mode: Some("multi".to_string()),
            prefix: Some("from-file".to_string()),
            environment: Some("prod".to_string()),
            ..Default::default()
        };
        let overrides = SettingsLayer {
            prefix: Some("from-cli".to_string()),
            ..Default::default()
        };

        let settings = Settings::resolve(&file, &overrides).unwrap();
        assert_eq!(settings.state_mode, StateMode::Multi);
        assert_eq!(settings.prefix, "from-cli");
        assert_eq!(settings.environment, "prod");
        assert_eq!(settings.platform, Platform::Local);
    }

    #[test]
    fn test_invalid_enum_value_names_key() {
        let layer = SettingsLayer {
            platform: Some("azure".to_string()),
            ..Default::default()
        };
        let err = Settings::resolve(&layer, &SettingsLayer::default()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("platform"));
        assert!(err.to_string().contains("azure"));
    }

    #[test]
    fn test_tfc_requires_org() {
        let layer = SettingsLayer {
            platform: Some("tfc".to_string()),
            ..Default::default()
        };
        let err = Settings::resolve(&layer, &SettingsLayer::default()).unwrap_err();
        assert!(err.to_string().contains("tfc_org"));

        let with_org = SettingsLayer {
            tfc_org: Some("acme".to_string()),
            ..Default::default()
        };
        assert!(Settings::resolve(&layer, &with_org).is_ok());
    }

    #[test]
    fn test_workspace_names() {
        let mut settings = Settings::default();
        assert_eq!(settings.workspace_name(None).unwrap(), "aws-identity-management");

        settings.environment = "prod".to_string();
        assert_eq!(
            settings.workspace_name(None).unwrap(),
            "aws-identity-management-prod"
        );

        settings.state_mode = StateMode::Multi;
        assert_eq!(
            settings.workspace_name(Some("permission-sets")).unwrap(),
            "aws-identity-management-prod-permission-sets"
        );
        assert!(settings.workspace_name(None).is_err());

        settings.environment.clear();
        assert_eq!(
            settings.workspace_name(Some("identity-store")).unwrap(),
            "aws-identity-management-identity-store"
        );
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(DEFAULT_SETTINGS_FILE);
        fs::write(
            &path,
            "state_mode: multi\nplatform: tfc\ntfc_org: acme\nenable_team: true\nunknown_key: ignored\n",
        )
        .unwrap();

        let settings = Settings::load(&path, &SettingsLayer::default()).unwrap();
        assert_eq!(settings.state_mode, StateMode::Multi);
        assert_eq!(settings.platform, Platform::Tfc);
        assert_eq!(settings.tfc_org, "acme");
        assert!(settings.enable_team);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let settings =
            Settings::load(&temp.path().join("absent.yaml"), &SettingsLayer::default()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_unparseable_file_is_configuration_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(DEFAULT_SETTINGS_FILE);
        fs::write(&path, "state_mode: [unclosed\n").unwrap();

        let err = Settings::load(&path, &SettingsLayer::default()).unwrap_err();
        assert!(err.is_configuration());
    }
}
