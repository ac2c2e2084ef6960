//! Discovery of on-disk static templates.
//!
//! Layout under the templates root:
//!
//! - `<component>/<base>[_local|_remote_state].tf.tmpl`: whole-file templates
//!   of a component folder
//! - `shared/`: per-component instance lookup and provider blocks
//! - `root/`: single-state root provider blocks
//! - `team/modules/`: TEAM child modules copied verbatim

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use idcgen_core::{Artifact, Component, StaticTemplate, Variant, VariantSet};

use crate::error::{TemplateError, TemplateResult};

/// File suffix of static templates.
pub const TEMPLATE_SUFFIX: &str = ".tf.tmpl";

/// A static template found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub template: StaticTemplate,
    pub path: PathBuf,
}

/// Index over the templates directory.
pub struct TemplateCatalog {
    templates_path: PathBuf,
}

impl TemplateCatalog {
    pub fn new(templates_path: impl Into<PathBuf>) -> Self {
        Self {
            templates_path: templates_path.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.templates_path
    }

    /// Static templates of a component in file-name order, each knowing which
    /// variants of its base exist.
    pub fn component_templates(&self, component: Component) -> TemplateResult<Vec<CatalogEntry>> {
        let dir = self.templates_path.join(component.as_str());
        if !dir.is_dir() {
            warn!("No static templates for {} in {:?}", component, dir);
            return Ok(Vec::new());
        }

        let pattern = format!("{}/*{}", dir.display(), TEMPLATE_SUFFIX);
        let paths = glob::glob(&pattern).map_err(|e| TemplateError::InvalidTemplate {
            path: dir.clone(),
            message: e.to_string(),
        })?;

        let mut found: Vec<(String, Variant, PathBuf)> = Vec::new();
        for path in paths.filter_map(|p| p.ok()) {
            let Some(stem) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(TEMPLATE_SUFFIX))
            else {
                continue;
            };
            let (base, variant) = Variant::split_stem(stem);
            found.push((base.to_string(), variant, path.clone()));
        }
        found.sort_by(|a, b| a.2.cmp(&b.2));

        let mut available: HashMap<String, VariantSet> = HashMap::new();
        for (base, variant, _) in &found {
            available.entry(base.clone()).or_default().insert(*variant);
        }

        let entries = found
            .into_iter()
            .map(|(base, variant, path)| {
                let set = available.get(&base).copied().unwrap_or_default();
                debug!("Found template {:?} ({:?})", path, variant);
                CatalogEntry {
                    template: StaticTemplate::new(component, base, variant).with_available(set),
                    path,
                }
            })
            .collect();

        Ok(entries)
    }

    /// Template file behind a fixed artifact in the given variant, if the
    /// artifact is template-backed.
    pub fn fixed_template(&self, artifact: &Artifact, variant: Variant) -> Option<PathBuf> {
        let suffix = match variant {
            Variant::Tfc => "_tfc",
            _ => "",
        };
        let relative = match artifact {
            Artifact::Instances(_) => format!("shared/aws_ssoadmin_instances{}", TEMPLATE_SUFFIX),
            Artifact::Providers(_) => format!("shared/providers{}{}", suffix, TEMPLATE_SUFFIX),
            Artifact::RootProviders => format!("root/providers{}{}", suffix, TEMPLATE_SUFFIX),
            _ => return None,
        };
        Some(self.templates_path.join(relative))
    }

    /// Directory of the TEAM child modules.
    pub fn team_modules_dir(&self) -> PathBuf {
        self.templates_path.join("team").join("modules")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_missing_component_dir_is_empty() {
        let temp = tempdir().unwrap();
        let catalog = TemplateCatalog::new(temp.path());
        assert!(catalog.component_templates(Component::Team).unwrap().is_empty());
    }

    #[test]
    fn test_variants_are_grouped_by_base() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("account_assignments");
        fs::create_dir_all(&dir).unwrap();
        for name in [
            "external.tf.tmpl",
            "external_remote_state.tf.tmpl",
            "variables.tf.tmpl",
            "README.md",
        ] {
            fs::write(dir.join(name), "").unwrap();
        }

        let entries = TemplateCatalog::new(temp.path())
            .component_templates(Component::AccountAssignments)
            .unwrap();
        assert_eq!(entries.len(), 3);

        let external = &entries[0].template;
        assert_eq!(external.base, "external");
        assert_eq!(external.variant, Variant::Default);
        assert!(external.available.remote_state);
        assert!(!external.available.single_state);

        assert_eq!(entries[1].template.variant, Variant::RemoteState);
        assert_eq!(entries[2].template.output_name(), "variables.tf");
        assert!(!entries[2].template.available.remote_state);
    }

    #[test]
    fn test_fixed_template_paths() {
        let catalog = TemplateCatalog::new("templates");
        assert_eq!(
            catalog.fixed_template(&Artifact::RootProviders, Variant::Tfc),
            Some(PathBuf::from("templates/root/providers_tfc.tf.tmpl"))
        );
        assert_eq!(
            catalog.fixed_template(&Artifact::Providers(Component::Team), Variant::Default),
            Some(PathBuf::from("templates/shared/providers.tf.tmpl"))
        );
        assert!(catalog.fixed_template(&Artifact::RootMain, Variant::Default).is_none());
    }
}
