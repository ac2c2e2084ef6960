//! Terraform generation pipeline.
//!
//! One run is a destructive full rebuild of the output tree:
//!
//! 1. optionally recover managed policies from the previous output
//! 2. wipe every component folder and root-level Terraform file
//! 3. per-component instance lookups and provider blocks
//! 4. static templates from the catalog
//! 5. data-driven tasks from the registry, then the TEAM joins
//! 6. verbatim copies of policy documents and TEAM modules
//! 7. root wiring for single-state layouts
//! 8. post-processing of every written file
//!
//! Every artifact goes through [`decide`] before anything is rendered.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use idcgen_core::{
    decide, Absence, AccountRecord, Artifact, Component, CopyArtifact, Decision, DocumentKind,
    InstanceRecord, Mode, OrganizationalUnitRecord, Placement, RecordStore, Settings, StateMode,
    TaskId, TeamApplicationAssignmentsRecord, TeamApplicationRecord, TeamTableRecord,
};
use idcgen_templates::{copy_tree, hcl, TemplateCatalog, TemplateRenderer};

use crate::error::{IacError, IacResult};
use crate::postprocess::{postprocess, PostprocessReport};
use crate::provider::ProviderVersions;
use crate::retain::{retain_managed_policies, Retained};
use crate::tasks::{self, TaskRegistry};

/// Outcome of one generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerateSummary {
    pub written: Vec<PathBuf>,
    pub skipped: usize,
    pub retained: Option<Retained>,
    pub postprocess: PostprocessReport,
}

/// Generates the Terraform tree from the record store.
pub struct Generator<'a> {
    settings: &'a Settings,
    store: &'a RecordStore,
    catalog: TemplateCatalog,
    renderer: TemplateRenderer,
    registry: TaskRegistry,
    versions: ProviderVersions,
}

impl<'a> Generator<'a> {
    pub fn new(settings: &'a Settings, store: &'a RecordStore) -> Self {
        Self {
            settings,
            store,
            catalog: TemplateCatalog::new(&settings.templates),
            renderer: TemplateRenderer::new(),
            registry: TaskRegistry::standard(),
            versions: ProviderVersions::default(),
        }
    }

    pub fn with_versions(mut self, versions: ProviderVersions) -> Self {
        self.versions = versions;
        self
    }

    /// Run a full rebuild.
    pub fn run(&self) -> IacResult<GenerateSummary> {
        let mode = self.settings.mode();
        let output = self.settings.terraform_dir();
        let mut summary = GenerateSummary::default();

        info!(
            "Generating Terraform in {:?} ({} state, {} platform, TEAM {})",
            output,
            mode.state_mode.as_str(),
            mode.platform.as_str(),
            if mode.team_enabled { "on" } else { "off" }
        );

        if self.settings.retain_managed_policies {
            summary.retained = retain_managed_policies(&output, self.store)?;
        }

        let instance = self.instance()?;
        self.clean(&output, &mode)?;
        let variables = self.variables(&instance)?;

        for component in Component::active(mode.team_enabled) {
            self.emit_fixed(&mode, &Artifact::Instances(component), &output, &variables, &mut summary)?;
            self.emit_fixed(&mode, &Artifact::Providers(component), &output, &variables, &mut summary)?;
            self.emit_static_templates(&mode, component, &output, &variables, &mut summary)?;
        }

        self.emit_tasks(&mode, &output, &mut summary)?;
        self.emit_team_joins(&mode, &output, &mut summary)?;
        self.emit_copies(&mode, &output, &mut summary)?;

        if let Some(placement) = self.placement(&mode, &Artifact::RootMain, &mut summary) {
            let content = hcl::root::main_tf(mode.team_enabled);
            self.write(&placement.path(&output), &content, &mut summary)?;
        }
        self.emit_fixed(&mode, &Artifact::RootProviders, &output, &variables, &mut summary)?;

        summary.postprocess = postprocess(&output)?;
        info!(
            "Generated {} files ({} artifacts skipped)",
            summary.written.len(),
            summary.skipped
        );
        Ok(summary)
    }

    fn instance(&self) -> IacResult<InstanceRecord> {
        self.store
            .load_all::<InstanceRecord>(Absence::Empty)?
            .into_iter()
            .next()
            .ok_or_else(|| IacError::InstanceMissing(self.store.root().to_path_buf()))
    }

    /// Remove every component folder and root-level Terraform file, then
    /// recreate the folders of active components.
    fn clean(&self, output: &Path, mode: &Mode) -> IacResult<()> {
        if output.exists() {
            for entry in fs::read_dir(output)? {
                let path = entry?.path();
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                if path.is_dir() && Component::from_str(name).is_some() {
                    fs::remove_dir_all(&path)?;
                    debug!("Removed {:?}", path);
                } else if path.is_file() && name.ends_with(".tf") {
                    fs::remove_file(&path)?;
                    debug!("Removed {:?}", path);
                }
            }
        }

        for component in Component::active(mode.team_enabled) {
            fs::create_dir_all(output.join(component.as_str()))?;
        }
        Ok(())
    }

    fn variables(&self, instance: &InstanceRecord) -> IacResult<HashMap<String, String>> {
        let mut variables = HashMap::new();
        variables.insert("region".to_string(), instance.region.clone());
        variables.insert("aws_version".to_string(), self.versions.aws.clone());
        variables.insert("tfe_version".to_string(), self.versions.tfe.clone());
        variables.insert("tfe_organization".to_string(), self.settings.tfc_org.clone());
        variables.insert(
            "state_mode".to_string(),
            self.settings.state_mode.as_str().to_string(),
        );
        variables.insert(
            "platform".to_string(),
            self.settings.platform.as_str().to_string(),
        );
        if self.settings.state_mode == StateMode::Single {
            variables.insert("workspace_name".to_string(), self.settings.workspace_name(None)?);
        }
        for component in Component::all() {
            variables.insert(
                format!("workspace_{}", component.as_str()),
                self.settings
                    .workspace_name(Some(&component.workspace_component()))?,
            );
        }
        Ok(variables)
    }

    fn placement(
        &self,
        mode: &Mode,
        artifact: &Artifact,
        summary: &mut GenerateSummary,
    ) -> Option<Placement> {
        match decide(mode, artifact) {
            Decision::Emit(placement) => Some(placement),
            Decision::Skip(reason) => {
                debug!("Skipping {}: {}", artifact, reason);
                summary.skipped += 1;
                None
            }
        }
    }

    fn write(&self, path: &Path, content: &str, summary: &mut GenerateSummary) -> IacResult<()> {
        if content.trim().is_empty() {
            debug!("Nothing to write for {:?}", path);
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        debug!("Wrote {:?}", path);
        summary.written.push(path.to_path_buf());
        Ok(())
    }

    /// Instance lookups and provider blocks, rendered from shared templates.
    fn emit_fixed(
        &self,
        mode: &Mode,
        artifact: &Artifact,
        output: &Path,
        variables: &HashMap<String, String>,
        summary: &mut GenerateSummary,
    ) -> IacResult<()> {
        let Some(placement) = self.placement(mode, artifact, summary) else {
            return Ok(());
        };
        let Some(template) = self.catalog.fixed_template(artifact, placement.variant) else {
            return Err(IacError::GenerationFailed(format!(
                "{} has no template",
                artifact
            )));
        };

        let mut variables = variables.clone();
        if let Artifact::Providers(component) = artifact {
            variables.insert(
                "workspace_name".to_string(),
                self.settings
                    .workspace_name(Some(&component.workspace_component()))?,
            );
        }

        let content = self.renderer.render_file(&template, &variables)?;
        self.write(&placement.path(output), &content, summary)
    }

    fn emit_static_templates(
        &self,
        mode: &Mode,
        component: Component,
        output: &Path,
        variables: &HashMap<String, String>,
        summary: &mut GenerateSummary,
    ) -> IacResult<()> {
        for entry in self.catalog.component_templates(component)? {
            let artifact = Artifact::Template(entry.template.clone());
            let Some(placement) = self.placement(mode, &artifact, summary) else {
                continue;
            };
            let content = self.renderer.render_file(&entry.path, variables)?;
            self.write(&placement.path(output), &content, summary)?;
        }
        Ok(())
    }

    fn emit_tasks(&self, mode: &Mode, output: &Path, summary: &mut GenerateSummary) -> IacResult<()> {
        for spec in self.registry.iter() {
            let artifact = Artifact::Task(spec.id);
            let Some(placement) = self.placement(mode, &artifact, summary) else {
                continue;
            };
            let input = spec.input(self.store, &placement)?;
            let content = tasks::render(spec.id, &input, &placement)?;
            self.write(&placement.path(output), &content, summary)?;
        }
        Ok(())
    }

    /// TEAM artifacts joining several record kinds.
    fn emit_team_joins(&self, mode: &Mode, output: &Path, summary: &mut GenerateSummary) -> IacResult<()> {
        if !mode.team_enabled {
            debug!("TEAM disabled, skipping TEAM joins");
            summary.skipped += tasks::JOIN_TASKS.len();
            return Ok(());
        }

        let application = self
            .store
            .load_all::<TeamApplicationRecord>(Absence::Empty)?
            .into_iter()
            .next();
        let assignments = self
            .store
            .load_all::<TeamApplicationAssignmentsRecord>(Absence::Empty)?
            .into_iter()
            .next();

        for task in tasks::JOIN_TASKS {
            let Some(placement) = self.placement(mode, &Artifact::Task(task), summary) else {
                continue;
            };

            let content = match task {
                TaskId::TeamData => {
                    let Some(app) = &application else {
                        warn!("TEAM application not found, skipping {}", task.file_name());
                        continue;
                    };
                    let tables = self.store.load_all::<TeamTableRecord>(Absence::Empty)?;
                    hcl::team::data(&tables, &app.application_arn)
                }
                TaskId::TeamLocals => {
                    let accounts = self.store.load_all::<AccountRecord>(Absence::Fatal)?;
                    let units = self
                        .store
                        .load_all::<OrganizationalUnitRecord>(Absence::Empty)?;
                    hcl::team::locals(&accounts, &units)
                }
                TaskId::TeamApplicationAssignments | TaskId::TeamApplicationAssignmentsImport => {
                    let (Some(_), Some(record)) = (&application, &assignments) else {
                        warn!(
                            "TEAM application assignments not found, skipping {}",
                            task.file_name()
                        );
                        continue;
                    };
                    if task == TaskId::TeamApplicationAssignments {
                        hcl::team::application_assignments(record)
                    } else {
                        hcl::team::application_assignments_import(record, placement.prefix())
                    }
                }
                other => {
                    return Err(IacError::GenerationFailed(format!(
                        "{} is not a TEAM join",
                        other.name()
                    )))
                }
            };
            self.write(&placement.path(output), &content, summary)?;
        }
        Ok(())
    }

    fn emit_copies(&self, mode: &Mode, output: &Path, summary: &mut GenerateSummary) -> IacResult<()> {
        let copies = [
            (
                CopyArtifact::InlinePolicies,
                self.store.document_dir(DocumentKind::InlinePolicy),
            ),
            (
                CopyArtifact::ManagedPolicyDocuments,
                self.store.document_dir(DocumentKind::ManagedPolicyDocument),
            ),
            (CopyArtifact::TeamModules, self.catalog.team_modules_dir()),
        ];

        for (copy, source) in copies {
            let artifact = Artifact::Copy(copy);
            let Some(placement) = self.placement(mode, &artifact, summary) else {
                continue;
            };
            if !source.is_dir() {
                debug!("Nothing to copy for {}: {:?} does not exist", artifact, source);
                continue;
            }
            let target = placement.path(output);
            copy_tree(&source, &target)?;
            info!("Copied {:?} to {:?}", source, target);
            summary.written.push(target);
        }
        Ok(())
    }
}
