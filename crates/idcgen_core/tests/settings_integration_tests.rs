//! Integration tests for settings resolution against the shipped demo files.

use std::path::{Path, PathBuf};

use idcgen_core::{decide, Artifact, Platform, Settings, SettingsLayer, StateMode, TaskId};

fn get_demos_path() -> PathBuf {
    let candidates = ["demos", "../demos", "../../demos", "../../../demos"];

    for candidate in candidates {
        if Path::new(candidate).join("config.yaml").exists() {
            return PathBuf::from(candidate);
        }
    }

    PathBuf::from("demos")
}

#[test]
fn test_demo_config_resolves() {
    let path = get_demos_path().join("config.yaml");
    let settings = Settings::load(&path, &SettingsLayer::default()).unwrap();

    assert_eq!(settings.state_mode, StateMode::Single);
    assert_eq!(settings.platform, Platform::Local);
    assert_eq!(settings.environment, "prod");
    assert!(settings.snapshot.is_some());
    assert_eq!(settings.workspace_name(None).unwrap(), "aws-identity-management-prod");
}

#[test]
fn test_overrides_take_precedence() {
    let path = get_demos_path().join("config.yaml");
    let overrides = SettingsLayer {
        state_mode: Some("multi".to_string()),
        platform: Some("tfc".to_string()),
        tfc_org: Some("acme".to_string()),
        enable_team: Some(true),
        ..Default::default()
    };
    let settings = Settings::load(&path, &overrides).unwrap();

    assert_eq!(settings.state_mode, StateMode::Multi);
    assert!(settings.enable_team);
    assert_eq!(
        settings.workspace_name(Some("permission-sets")).unwrap(),
        "aws-identity-management-prod-permission-sets"
    );

    let decision = decide(&settings.mode(), &Artifact::Task(TaskId::TeamData));
    assert!(!decision.is_skip());
}

#[test]
fn test_tfc_without_organization_is_rejected() {
    let path = get_demos_path().join("config.yaml");
    let overrides = SettingsLayer {
        platform: Some("tfc".to_string()),
        ..Default::default()
    };

    let err = Settings::load(&path, &overrides).unwrap_err();
    assert!(err.is_configuration());
}
