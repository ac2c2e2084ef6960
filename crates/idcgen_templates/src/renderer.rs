//! Static template rendering and verbatim copies.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use fs_extra::dir::CopyOptions;
use regex::Regex;
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};

/// Renderer for `{{variable}}` placeholders in static templates.
pub struct TemplateRenderer {
    variable_pattern: Regex,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Create a new template renderer.
    pub fn new() -> Self {
        Self {
            // Match {{variable_name}} pattern
            variable_pattern: Regex::new(r"\{\{([a-zA-Z_][a-zA-Z0-9_]*)\}\}")
                .expect("variable pattern is valid"),
        }
    }

    /// Render content by replacing variables; unknown variables are kept.
    pub fn render_content(&self, content: &str, variables: &HashMap<String, String>) -> String {
        self.variable_pattern
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                variables
                    .get(var_name)
                    .cloned()
                    .unwrap_or_else(|| format!("{{{{{}}}}}", var_name))
            })
            .to_string()
    }

    /// Render content, failing on the first variable that is not provided.
    pub fn render_strict(
        &self,
        template: &str,
        content: &str,
        variables: &HashMap<String, String>,
    ) -> TemplateResult<String> {
        if let Some(missing) = self
            .variables_in(content)
            .into_iter()
            .find(|name| !variables.contains_key(name))
        {
            return Err(TemplateError::MissingVariable {
                template: template.to_string(),
                variable: missing,
            });
        }

        Ok(self.render_content(content, variables))
    }

    /// Read and strictly render a template file.
    pub fn render_file(
        &self,
        path: &Path,
        variables: &HashMap<String, String>,
    ) -> TemplateResult<String> {
        if !path.is_file() {
            return Err(TemplateError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        debug!("Rendering template {:?}", path);
        self.render_strict(&path.display().to_string(), &content, variables)
    }

    /// Variable names referenced by a template, in order of appearance.
    pub fn variables_in(&self, content: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for caps in self.variable_pattern.captures_iter(content) {
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Copy a directory's contents into `target`, replacing what is there.
pub fn copy_tree(source: &Path, target: &Path) -> TemplateResult<u64> {
    if !source.is_dir() {
        return Err(TemplateError::NotFound(source.display().to_string()));
    }
    if target.exists() {
        fs::remove_dir_all(target)?;
    }
    fs::create_dir_all(target)?;

    let options = CopyOptions::new().content_only(true).overwrite(true);
    let copied = fs_extra::dir::copy(source, target, &options)?;
    debug!("Copied {:?} to {:?} ({} bytes)", source, target, copied);
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_content() {
        let renderer = TemplateRenderer::new();
        let rendered = renderer.render_content(
            "region = \"{{region}}\" # {{unknown}}",
            &vars(&[("region", "eu-west-1")]),
        );
        assert_eq!(rendered, "region = \"eu-west-1\" # {{unknown}}");
    }

    #[test]
    fn test_render_strict_names_missing_variable() {
        let renderer = TemplateRenderer::new();
        let err = renderer
            .render_strict("providers", "{{region}} {{aws_version}}", &vars(&[("region", "x")]))
            .unwrap_err();
        match err {
            TemplateError::MissingVariable { template, variable } => {
                assert_eq!(template, "providers");
                assert_eq!(variable, "aws_version");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_terraform_interpolation_is_untouched() {
        let renderer = TemplateRenderer::new();
        let content = "path = \"${path.module}/x\"\n";
        assert_eq!(renderer.render_strict("t", content, &HashMap::new()).unwrap(), content);
    }

    #[test]
    fn test_variables_in() {
        let renderer = TemplateRenderer::new();
        assert_eq!(
            renderer.variables_in("{{a}} {{b}} {{a}}"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_copy_tree_replaces_target() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("main.tf"), "a").unwrap();
        fs::write(source.join("nested/vars.tf"), "b").unwrap();

        let target = dir.path().join("dst");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.tf"), "old").unwrap();

        copy_tree(&source, &target).unwrap();
        assert!(target.join("main.tf").exists());
        assert!(target.join("nested/vars.tf").exists());
        assert!(!target.join("stale.tf").exists());
    }
}
