//! Integration tests against the shipped templates directory.

use std::collections::HashMap;
use std::path::Path;

use idcgen_core::{Artifact, Component, Variant};
use idcgen_templates::{copy_tree, TemplateCatalog, TemplateError, TemplateRenderer};
use tempfile::tempdir;

fn get_templates_path() -> String {
    let candidates = [
        "templates",
        "../templates",
        "../../templates",
        "../../../templates",
    ];

    for candidate in candidates {
        if Path::new(candidate).join("shared").exists() {
            return candidate.to_string();
        }
    }

    "templates".to_string()
}

fn provider_variables() -> HashMap<String, String> {
    [
        ("region", "eu-west-1"),
        ("aws_version", "5.85.0"),
        ("tfe_version", "0.63.0"),
        ("tfe_organization", "acme"),
        ("workspace_name", "aws-identity-management-prod"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[test]
fn test_every_component_template_parses_stem() {
    let catalog = TemplateCatalog::new(get_templates_path());
    for component in Component::all() {
        for entry in catalog.component_templates(component).unwrap() {
            assert!(entry.path.exists());
            assert!(!entry.template.base.is_empty());
            assert!(entry.template.output_name().ends_with(".tf"));
        }
    }
}

#[test]
fn test_external_lookup_variants() {
    let catalog = TemplateCatalog::new(get_templates_path());
    let entries = catalog
        .component_templates(Component::AccountAssignments)
        .unwrap();

    let external: Vec<_> = entries
        .iter()
        .filter(|e| e.template.base == "external")
        .collect();
    assert_eq!(external.len(), 2);
    assert!(external.iter().all(|e| e.template.available.remote_state));
    assert!(external.iter().any(|e| e.template.variant == Variant::RemoteState));
}

#[test]
fn test_render_tfc_providers() {
    let catalog = TemplateCatalog::new(get_templates_path());
    let renderer = TemplateRenderer::new();
    let path = catalog
        .fixed_template(&Artifact::Providers(Component::IdentityStore), Variant::Tfc)
        .unwrap();

    let content = renderer.render_file(&path, &provider_variables()).unwrap();
    assert!(content.contains("organization = \"acme\""));
    assert!(content.contains("version = \"0.63.0\""));
    assert!(content.contains("region = \"eu-west-1\""));
    assert!(!content.contains("{{"));
}

#[test]
fn test_render_requires_every_variable() {
    let catalog = TemplateCatalog::new(get_templates_path());
    let renderer = TemplateRenderer::new();
    let path = catalog
        .fixed_template(&Artifact::RootProviders, Variant::Default)
        .unwrap();

    let mut variables = provider_variables();
    variables.remove("region");
    match renderer.render_file(&path, &variables) {
        Err(TemplateError::MissingVariable { variable, .. }) => assert_eq!(variable, "region"),
        other => panic!("expected a missing variable, got {:?}", other.map(|s| s.len())),
    }
}

#[test]
fn test_terraform_interpolations_survive_rendering() {
    let catalog = TemplateCatalog::new(get_templates_path());
    let renderer = TemplateRenderer::new();
    let entries = catalog
        .component_templates(Component::AccountAssignments)
        .unwrap();
    let assignments = entries
        .iter()
        .find(|e| e.template.base == "aws_ssoadmin_account_assignments")
        .unwrap();

    let content = renderer.render_file(&assignments.path, &HashMap::new()).unwrap();
    assert!(content.contains("\"${account}___${permission_set}___${principal_type}___${name}\""));
}

#[test]
fn test_copy_team_modules() {
    let catalog = TemplateCatalog::new(get_templates_path());
    let out = tempdir().unwrap();
    let target = out.path().join("team").join("modules");

    copy_tree(&catalog.team_modules_dir(), &target).unwrap();
    assert!(target.join("approver").join("main.tf").exists());
    assert!(target.join("eligibility").join("variables.tf").exists());
    assert!(target.join("team_app_assignment").join("main.tf").exists());
}
