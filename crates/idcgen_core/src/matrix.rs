//! Mode matrix.
//!
//! [`decide`] is a pure function of the run mode and an artifact. It answers
//! whether the artifact is produced and, if so, in which variant, where and
//! under which file name. Rules are checked in order and the first match
//! wins:
//!
//! 1. TEAM-only artifacts are skipped when TEAM is disabled.
//! 2. Artifacts needing managed-policy data sources are skipped when static
//!    ARNs are preferred.
//! 3. Artifacts restricted to one state layout are skipped in the other.
//! 4. Artifacts restricted to one platform within a state layout are skipped
//!    on the other platform.
//! 5. Default template variants are skipped when a mode-specific variant
//!    exists, as are static templates a data-driven task already produces.
//! 6. Everything else is emitted at its default destination.

use std::path::{Path, PathBuf};

use crate::settings::{Platform, StateMode};

/// Static templates that only apply to the single-state layout, where child
/// modules receive inputs through variables.
const SINGLE_STATE_ONLY_TEMPLATES: &[&str] = &["variables"];

/// Static templates performing cross-state lookups through TFC outputs.
const CROSS_STATE_LOOKUP_TEMPLATES: &[&str] = &["external"];

/// Static templates declaring managed-policy data sources.
const DATA_SOURCE_TEMPLATES: &[&str] = &["aws_iam_managed_policies"];

/// File name of the per-component instance lookup.
pub const INSTANCES_FILE: &str = "aws_ssoadmin_instances.tf";

/// Logical output component. Each component is one folder of the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    IdentityStore,
    PermissionSets,
    AccountAssignments,
    ManagedPolicies,
    Team,
}

impl Component {
    /// Folder name of the component.
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::IdentityStore => "identity_store",
            Component::PermissionSets => "permission_sets",
            Component::AccountAssignments => "account_assignments",
            Component::ManagedPolicies => "managed_policies",
            Component::Team => "team",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "identity_store" => Some(Component::IdentityStore),
            "permission_sets" => Some(Component::PermissionSets),
            "account_assignments" => Some(Component::AccountAssignments),
            "managed_policies" => Some(Component::ManagedPolicies),
            "team" => Some(Component::Team),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            Component::IdentityStore,
            Component::PermissionSets,
            Component::AccountAssignments,
            Component::ManagedPolicies,
            Component::Team,
        ]
    }

    /// Components that have an output folder in the given mode.
    pub fn active(team_enabled: bool) -> Vec<Self> {
        Self::all()
            .into_iter()
            .filter(|c| team_enabled || !c.is_team_only())
            .collect()
    }

    pub fn is_team_only(&self) -> bool {
        matches!(self, Component::Team)
    }

    /// Component part of a multi-state workspace name.
    pub fn workspace_component(&self) -> String {
        self.as_str().replace('_', "-")
    }

    /// Address prefix of resources living in this component's child module.
    pub fn module_prefix(&self) -> String {
        format!("module.{}.", self.as_str().replace('-', "_"))
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The inputs of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode {
    pub state_mode: StateMode,
    pub platform: Platform,
    pub team_enabled: bool,
    pub managed_policy_data_sources: bool,
}

impl Mode {
    pub fn new(state_mode: StateMode, platform: Platform, team_enabled: bool) -> Self {
        Self {
            state_mode,
            platform,
            team_enabled,
            managed_policy_data_sources: false,
        }
    }

    pub fn with_data_sources(mut self, enabled: bool) -> Self {
        self.managed_policy_data_sources = enabled;
        self
    }

    /// Every combination of the three axes with static ARNs.
    pub fn axes() -> Vec<Self> {
        let mut modes = Vec::new();
        for state_mode in StateMode::all() {
            for platform in Platform::all() {
                for team_enabled in [false, true] {
                    modes.push(Mode::new(state_mode, platform, team_enabled));
                }
            }
        }
        modes
    }

    /// Every combination of the three axes and the data-source gate.
    pub fn all() -> Vec<Self> {
        Self::axes()
            .into_iter()
            .flat_map(|m| [m, m.with_data_sources(true)])
            .collect()
    }
}

/// Rendering variant of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variant {
    Default,
    /// `_local`: single-state module reading inputs from variables.
    SingleState,
    /// `_remote_state`: multi-state module reading other states locally.
    RemoteState,
    /// Managed policies referenced by static ARNs.
    StaticArns,
    /// Terraform Cloud flavour.
    Tfc,
}

impl Variant {
    /// File-stem suffix carried by the on-disk template variant.
    pub fn suffix(&self) -> &'static str {
        match self {
            Variant::Default => "",
            Variant::SingleState => "_local",
            Variant::RemoteState => "_remote_state",
            Variant::StaticArns => "_static",
            Variant::Tfc => "_tfc",
        }
    }

    /// Split a static template file stem into base name and variant.
    pub fn split_stem(stem: &str) -> (&str, Variant) {
        for variant in [Variant::RemoteState, Variant::SingleState] {
            if let Some(base) = stem.strip_suffix(variant.suffix()) {
                if !base.is_empty() {
                    return (base, variant);
                }
            }
        }
        (stem, Variant::Default)
    }
}

/// Which variants of one static template base exist on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VariantSet {
    pub default: bool,
    pub single_state: bool,
    pub remote_state: bool,
}

impl VariantSet {
    pub fn insert(&mut self, variant: Variant) {
        match variant {
            Variant::Default => self.default = true,
            Variant::SingleState => self.single_state = true,
            Variant::RemoteState => self.remote_state = true,
            Variant::StaticArns | Variant::Tfc => {}
        }
    }

    pub fn contains(&self, variant: Variant) -> bool {
        match variant {
            Variant::Default => self.default,
            Variant::SingleState => self.single_state,
            Variant::RemoteState => self.remote_state,
            Variant::StaticArns | Variant::Tfc => false,
        }
    }
}

/// A whole-file static template of a component folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StaticTemplate {
    pub component: Component,
    pub base: String,
    pub variant: Variant,
    pub available: VariantSet,
}

impl StaticTemplate {
    pub fn new(component: Component, base: impl Into<String>, variant: Variant) -> Self {
        let mut available = VariantSet::default();
        available.insert(variant);
        Self {
            component,
            base: base.into(),
            variant,
            available,
        }
    }

    pub fn with_available(mut self, available: VariantSet) -> Self {
        self.available = available;
        self
    }

    /// Output file name; mode suffixes are dropped.
    pub fn output_name(&self) -> String {
        format!("{}.tf", self.base)
    }

    /// Whether a data-driven task already produces this file.
    pub fn superseded_by_task(&self) -> bool {
        let name = self.output_name();
        TaskId::all()
            .into_iter()
            .any(|task| task.component() == self.component && task.file_name() == name)
    }
}

/// Data-driven generation tasks, one per generated Terraform object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskId {
    Users,
    UsersScim,
    UsersMap,
    UsersImport,
    Groups,
    GroupsScim,
    GroupsMap,
    GroupsImport,
    GroupMembershipsMap,
    GroupMembershipsMapScim,
    GroupMembershipsImport,
    ManagedPoliciesList,
    ManagedPoliciesMap,
    PermissionSets,
    PermissionSetsMap,
    PermissionSetsImport,
    InlinePoliciesImport,
    ManagedPolicyAttachmentsMap,
    ManagedPolicyAttachmentsImport,
    AccountAssignmentsImport,
    AccountAssignmentsMap,
    AccountLocals,
    TeamApproverPolicies,
    TeamEligibilityPolicies,
    TeamData,
    TeamLocals,
    TeamApplicationAssignments,
    TeamApplicationAssignmentsImport,
}

impl TaskId {
    pub fn all() -> Vec<Self> {
        vec![
            TaskId::Users,
            TaskId::UsersScim,
            TaskId::UsersMap,
            TaskId::UsersImport,
            TaskId::Groups,
            TaskId::GroupsScim,
            TaskId::GroupsMap,
            TaskId::GroupsImport,
            TaskId::GroupMembershipsMap,
            TaskId::GroupMembershipsMapScim,
            TaskId::GroupMembershipsImport,
            TaskId::ManagedPoliciesList,
            TaskId::ManagedPoliciesMap,
            TaskId::PermissionSets,
            TaskId::PermissionSetsMap,
            TaskId::PermissionSetsImport,
            TaskId::InlinePoliciesImport,
            TaskId::ManagedPolicyAttachmentsMap,
            TaskId::ManagedPolicyAttachmentsImport,
            TaskId::AccountAssignmentsImport,
            TaskId::AccountAssignmentsMap,
            TaskId::AccountLocals,
            TaskId::TeamApproverPolicies,
            TaskId::TeamEligibilityPolicies,
            TaskId::TeamData,
            TaskId::TeamLocals,
            TaskId::TeamApplicationAssignments,
            TaskId::TeamApplicationAssignmentsImport,
        ]
    }

    pub fn component(&self) -> Component {
        match self {
            TaskId::Users
            | TaskId::UsersScim
            | TaskId::UsersMap
            | TaskId::UsersImport
            | TaskId::Groups
            | TaskId::GroupsScim
            | TaskId::GroupsMap
            | TaskId::GroupsImport
            | TaskId::GroupMembershipsMap
            | TaskId::GroupMembershipsMapScim
            | TaskId::GroupMembershipsImport => Component::IdentityStore,
            TaskId::ManagedPoliciesList | TaskId::ManagedPoliciesMap => Component::ManagedPolicies,
            TaskId::PermissionSets
            | TaskId::PermissionSetsMap
            | TaskId::PermissionSetsImport
            | TaskId::InlinePoliciesImport
            | TaskId::ManagedPolicyAttachmentsMap
            | TaskId::ManagedPolicyAttachmentsImport => Component::PermissionSets,
            TaskId::AccountAssignmentsImport
            | TaskId::AccountAssignmentsMap
            | TaskId::AccountLocals => Component::AccountAssignments,
            TaskId::TeamApproverPolicies
            | TaskId::TeamEligibilityPolicies
            | TaskId::TeamData
            | TaskId::TeamLocals
            | TaskId::TeamApplicationAssignments
            | TaskId::TeamApplicationAssignmentsImport => Component::Team,
        }
    }

    /// Default output file name.
    pub fn file_name(&self) -> &'static str {
        match self {
            TaskId::Users => "aws_identitystore_users.tf",
            TaskId::UsersScim => "aws_identitystore_users_scim.tf",
            TaskId::UsersMap => "aws_identitystore_users_map.tf",
            TaskId::UsersImport => "aws_identitystore_users_import.tf",
            TaskId::Groups => "aws_identitystore_groups.tf",
            TaskId::GroupsScim => "aws_identitystore_groups_scim.tf",
            TaskId::GroupsMap => "aws_identitystore_groups_map.tf",
            TaskId::GroupsImport => "aws_identitystore_groups_import.tf",
            TaskId::GroupMembershipsMap => "aws_identitystore_group_memberships_map.tf",
            TaskId::GroupMembershipsMapScim => "aws_identitystore_group_memberships_map_scim.tf",
            TaskId::GroupMembershipsImport => "aws_identitystore_group_memberships_import.tf",
            TaskId::ManagedPoliciesList => "aws_iam_managed_policies_list.tf",
            TaskId::ManagedPoliciesMap => "aws_iam_managed_policies_map.tf",
            TaskId::PermissionSets => "aws_ssoadmin_permission_sets.tf",
            TaskId::PermissionSetsMap => "aws_ssoadmin_permission_sets_map.tf",
            TaskId::PermissionSetsImport => "aws_ssoadmin_permission_sets_import.tf",
            TaskId::InlinePoliciesImport => "aws_ssoadmin_permission_set_inline_policies_import.tf",
            TaskId::ManagedPolicyAttachmentsMap => "aws_ssoadmin_managed_policy_attachments_map.tf",
            TaskId::ManagedPolicyAttachmentsImport => {
                "aws_ssoadmin_managed_policy_attachments_import.tf"
            }
            TaskId::AccountAssignmentsImport => "aws_ssoadmin_account_assignments_import.tf",
            TaskId::AccountAssignmentsMap => "aws_ssoadmin_account_assignments_map.tf",
            TaskId::AccountLocals => "locals.tf",
            TaskId::TeamApproverPolicies => "aws_team_approver_policies.tf",
            TaskId::TeamEligibilityPolicies => "aws_team_eligibility_policies.tf",
            TaskId::TeamData => "data.tf",
            TaskId::TeamLocals => "locals.tf",
            TaskId::TeamApplicationAssignments => "aws_team_application_assignments.tf",
            TaskId::TeamApplicationAssignmentsImport => "aws_team_application_assignments_import.tf",
        }
    }

    /// Import tasks move to the root module in single-state layouts.
    pub fn is_import(&self) -> bool {
        matches!(
            self,
            TaskId::UsersImport
                | TaskId::GroupsImport
                | TaskId::GroupMembershipsImport
                | TaskId::PermissionSetsImport
                | TaskId::InlinePoliciesImport
                | TaskId::ManagedPolicyAttachmentsImport
                | TaskId::AccountAssignmentsImport
                | TaskId::TeamApplicationAssignmentsImport
        )
    }

    pub fn name(&self) -> &'static str {
        self.file_name().trim_end_matches(".tf")
    }
}

/// Verbatim copies into the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyArtifact {
    InlinePolicies,
    ManagedPolicyDocuments,
    TeamModules,
}

/// Anything the generator can produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Artifact {
    Task(TaskId),
    Template(StaticTemplate),
    Instances(Component),
    Providers(Component),
    RootMain,
    RootProviders,
    Copy(CopyArtifact),
}

impl Artifact {
    /// Every artifact that does not come from a static template directory.
    pub fn fixed() -> Vec<Self> {
        let mut artifacts: Vec<Artifact> = TaskId::all().into_iter().map(Artifact::Task).collect();
        for component in Component::all() {
            artifacts.push(Artifact::Instances(component));
            artifacts.push(Artifact::Providers(component));
        }
        artifacts.push(Artifact::RootMain);
        artifacts.push(Artifact::RootProviders);
        artifacts.push(Artifact::Copy(CopyArtifact::InlinePolicies));
        artifacts.push(Artifact::Copy(CopyArtifact::ManagedPolicyDocuments));
        artifacts.push(Artifact::Copy(CopyArtifact::TeamModules));
        artifacts
    }

    pub fn component(&self) -> Option<Component> {
        match self {
            Artifact::Task(task) => Some(task.component()),
            Artifact::Template(template) => Some(template.component),
            Artifact::Instances(component) | Artifact::Providers(component) => Some(*component),
            Artifact::RootMain | Artifact::RootProviders => None,
            Artifact::Copy(CopyArtifact::InlinePolicies) => Some(Component::PermissionSets),
            Artifact::Copy(CopyArtifact::ManagedPolicyDocuments) => Some(Component::ManagedPolicies),
            Artifact::Copy(CopyArtifact::TeamModules) => Some(Component::Team),
        }
    }

    fn is_team_only(&self) -> bool {
        self.component().is_some_and(|c| c.is_team_only())
    }

    fn requires_data_sources(&self) -> bool {
        match self {
            Artifact::Task(task) => *task == TaskId::ManagedPoliciesList,
            Artifact::Template(template) => DATA_SOURCE_TEMPLATES.contains(&template.base.as_str()),
            _ => false,
        }
    }

    fn state_mode_restriction(&self) -> Option<StateMode> {
        match self {
            Artifact::Template(template) => {
                let base = template.base.as_str();
                match template.variant {
                    Variant::SingleState => Some(StateMode::Single),
                    Variant::RemoteState => Some(StateMode::Multi),
                    _ if SINGLE_STATE_ONLY_TEMPLATES.contains(&base) => Some(StateMode::Single),
                    _ if CROSS_STATE_LOOKUP_TEMPLATES.contains(&base) => Some(StateMode::Multi),
                    _ => None,
                }
            }
            Artifact::Providers(_) => Some(StateMode::Multi),
            Artifact::RootMain | Artifact::RootProviders => Some(StateMode::Single),
            _ => None,
        }
    }

    fn platform_restriction(&self) -> Option<(StateMode, Platform)> {
        match self {
            Artifact::Template(template) => match template.variant {
                Variant::RemoteState => Some((StateMode::Multi, Platform::Local)),
                Variant::Default
                    if CROSS_STATE_LOOKUP_TEMPLATES.contains(&template.base.as_str()) =>
                {
                    Some((StateMode::Multi, Platform::Tfc))
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn superseded(&self, mode: &Mode) -> bool {
        let Artifact::Template(template) = self else {
            return false;
        };
        if template.superseded_by_task() {
            return true;
        }
        if template.variant != Variant::Default {
            return false;
        }
        match (mode.state_mode, mode.platform) {
            (StateMode::Single, _) => template.available.single_state,
            (StateMode::Multi, Platform::Local) => template.available.remote_state,
            (StateMode::Multi, Platform::Tfc) => false,
        }
    }

    fn placement(&self, mode: &Mode) -> Placement {
        let platform_variant = match mode.platform {
            Platform::Local => Variant::Default,
            Platform::Tfc => Variant::Tfc,
        };

        match self {
            Artifact::Task(task) => {
                let single = mode.state_mode == StateMode::Single;
                let variant = match task {
                    TaskId::ManagedPoliciesMap if !mode.managed_policy_data_sources => {
                        Variant::StaticArns
                    }
                    TaskId::TeamApplicationAssignmentsImport if single => Variant::SingleState,
                    _ => Variant::Default,
                };
                if single && task.is_import() {
                    Placement {
                        variant,
                        location: Location::Root,
                        file_name: task.file_name().to_string(),
                        module_prefix: Some(task.component().module_prefix()),
                    }
                } else {
                    Placement::in_component(task.component(), task.file_name(), variant)
                }
            }
            Artifact::Template(template) => {
                Placement::in_component(template.component, &template.output_name(), template.variant)
            }
            Artifact::Instances(component) => {
                Placement::in_component(*component, INSTANCES_FILE, Variant::Default)
            }
            Artifact::Providers(component) => {
                Placement::in_component(*component, "providers.tf", platform_variant)
            }
            Artifact::RootMain => Placement::at_root("main.tf", Variant::Default),
            Artifact::RootProviders => Placement::at_root("providers.tf", platform_variant),
            Artifact::Copy(CopyArtifact::InlinePolicies) => {
                Placement::in_component(Component::PermissionSets, "inline_policies", Variant::Default)
            }
            Artifact::Copy(CopyArtifact::ManagedPolicyDocuments) => {
                Placement::in_component(Component::ManagedPolicies, "policies", Variant::Default)
            }
            Artifact::Copy(CopyArtifact::TeamModules) => {
                Placement::in_component(Component::Team, "modules", Variant::Default)
            }
        }
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Artifact::Task(task) => write!(f, "task {}", task.name()),
            Artifact::Template(t) => {
                write!(f, "template {}/{}{}", t.component, t.base, t.variant.suffix())
            }
            Artifact::Instances(c) => write!(f, "{}/{}", c, INSTANCES_FILE),
            Artifact::Providers(c) => write!(f, "{}/providers.tf", c),
            Artifact::RootMain => write!(f, "main.tf"),
            Artifact::RootProviders => write!(f, "providers.tf"),
            Artifact::Copy(copy) => write!(f, "copy {:?}", copy),
        }
    }
}

/// Directory an artifact is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Root,
    Component(Component),
}

impl Location {
    pub fn dir(&self, output: &Path) -> PathBuf {
        match self {
            Location::Root => output.to_path_buf(),
            Location::Component(component) => output.join(component.as_str()),
        }
    }
}

/// Where and how an emitted artifact is written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placement {
    pub variant: Variant,
    pub location: Location,
    pub file_name: String,
    /// Prefix applied to import addresses when the resources live in a
    /// child module.
    pub module_prefix: Option<String>,
}

impl Placement {
    fn in_component(component: Component, file_name: &str, variant: Variant) -> Self {
        Self {
            variant,
            location: Location::Component(component),
            file_name: file_name.to_string(),
            module_prefix: None,
        }
    }

    fn at_root(file_name: &str, variant: Variant) -> Self {
        Self {
            variant,
            location: Location::Root,
            file_name: file_name.to_string(),
            module_prefix: None,
        }
    }

    pub fn path(&self, output: &Path) -> PathBuf {
        self.location.dir(output).join(&self.file_name)
    }

    /// Import address prefix, empty when resources live at the root.
    pub fn prefix(&self) -> &str {
        self.module_prefix.as_deref().unwrap_or("")
    }
}

/// Why an artifact is not produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    TeamDisabled,
    StaticArnsPreferred,
    StateModeExcluded,
    PlatformExcluded,
    Superseded,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::TeamDisabled => "team disabled",
            SkipReason::StaticArnsPreferred => "static managed policy ARNs preferred",
            SkipReason::StateModeExcluded => "not used in this state mode",
            SkipReason::PlatformExcluded => "not used on this platform",
            SkipReason::Superseded => "superseded by a more specific artifact",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the matrix for one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Decision {
    Skip(SkipReason),
    Emit(Placement),
}

impl Decision {
    pub fn is_skip(&self) -> bool {
        matches!(self, Decision::Skip(_))
    }

    pub fn placement(&self) -> Option<&Placement> {
        match self {
            Decision::Emit(placement) => Some(placement),
            Decision::Skip(_) => None,
        }
    }
}

/// Decide whether and how an artifact is produced in a mode.
pub fn decide(mode: &Mode, artifact: &Artifact) -> Decision {
    if artifact.is_team_only() && !mode.team_enabled {
        return Decision::Skip(SkipReason::TeamDisabled);
    }

    if artifact.requires_data_sources() && !mode.managed_policy_data_sources {
        return Decision::Skip(SkipReason::StaticArnsPreferred);
    }

    if let Some(only) = artifact.state_mode_restriction() {
        if only != mode.state_mode {
            return Decision::Skip(SkipReason::StateModeExcluded);
        }
    }

    if let Some((state_mode, platform)) = artifact.platform_restriction() {
        if state_mode == mode.state_mode && platform != mode.platform {
            return Decision::Skip(SkipReason::PlatformExcluded);
        }
    }

    if artifact.superseded(mode) {
        return Decision::Skip(SkipReason::Superseded);
    }

    Decision::Emit(artifact.placement(mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIRS: [(StateMode, Platform); 4] = [
        (StateMode::Single, Platform::Local),
        (StateMode::Single, Platform::Tfc),
        (StateMode::Multi, Platform::Local),
        (StateMode::Multi, Platform::Tfc),
    ];

    fn all_variants() -> VariantSet {
        VariantSet {
            default: true,
            single_state: true,
            remote_state: true,
        }
    }

    fn template(component: Component, stem: &str, available: VariantSet) -> Artifact {
        let (base, variant) = Variant::split_stem(stem);
        Artifact::Template(StaticTemplate::new(component, base, variant).with_available(available))
    }

    /// (state, platform) pairs in which the artifact is emitted with TEAM on.
    fn emitted_in(artifact: &Artifact) -> Vec<(StateMode, Platform)> {
        PAIRS
            .iter()
            .copied()
            .filter(|(s, p)| !decide(&Mode::new(*s, *p, true), artifact).is_skip())
            .collect()
    }

    fn sample_templates() -> Vec<Artifact> {
        let external = VariantSet {
            default: true,
            single_state: false,
            remote_state: true,
        };
        let single = VariantSet {
            default: true,
            ..Default::default()
        };
        vec![
            template(Component::AccountAssignments, "aws_ssoadmin_account_assignments", all_variants()),
            template(Component::AccountAssignments, "aws_ssoadmin_account_assignments_local", all_variants()),
            template(
                Component::AccountAssignments,
                "aws_ssoadmin_account_assignments_remote_state",
                all_variants(),
            ),
            template(Component::AccountAssignments, "external", external),
            template(Component::AccountAssignments, "external_remote_state", external),
            template(Component::AccountAssignments, "variables", single),
            template(Component::AccountAssignments, "locals", single),
            template(Component::IdentityStore, "outputs", single),
            template(Component::ManagedPolicies, "aws_iam_managed_policies", single),
            template(Component::Team, "outputs", single),
        ]
    }

    #[test]
    fn test_split_stem() {
        assert_eq!(Variant::split_stem("external_remote_state"), ("external", Variant::RemoteState));
        assert_eq!(Variant::split_stem("variables_local"), ("variables", Variant::SingleState));
        assert_eq!(Variant::split_stem("outputs"), ("outputs", Variant::Default));
        assert_eq!(Variant::split_stem("_local"), ("_local", Variant::Default));
    }

    #[test]
    fn test_decide_is_pure() {
        let mut artifacts = Artifact::fixed();
        artifacts.extend(sample_templates());
        for mode in Mode::all() {
            for artifact in &artifacts {
                assert_eq!(decide(&mode, artifact), decide(&mode, artifact));
            }
        }
    }

    #[test]
    fn test_team_artifacts_never_emitted_when_disabled() {
        let mut artifacts = Artifact::fixed();
        artifacts.extend(sample_templates());
        for mode in Mode::all().into_iter().filter(|m| !m.team_enabled) {
            for artifact in &artifacts {
                let decision = decide(&mode, artifact);
                if artifact.component() == Some(Component::Team) {
                    assert_eq!(decision, Decision::Skip(SkipReason::TeamDisabled), "{}", artifact);
                }
                if let Some(placement) = decision.placement() {
                    assert_ne!(placement.location, Location::Component(Component::Team));
                    assert!(!placement.file_name.contains("team"), "{}", artifact);
                }
            }
        }
    }

    #[test]
    fn test_documented_skip_sets() {
        let single = vec![PAIRS[0], PAIRS[1]];
        let multi = vec![PAIRS[2], PAIRS[3]];
        let everywhere = PAIRS.to_vec();
        let documented = [single.clone(), multi.clone(), everywhere.clone(), vec![PAIRS[2]], vec![PAIRS[3]]];

        let mut artifacts = Artifact::fixed();
        artifacts.extend(sample_templates());
        for artifact in &artifacts {
            let emitted = emitted_in(artifact);
            let never = emitted.is_empty();
            assert!(
                never || documented.contains(&emitted),
                "{} emitted in undocumented set {:?}",
                artifact,
                emitted
            );
        }

        assert_eq!(emitted_in(&Artifact::RootMain), single);
        assert_eq!(emitted_in(&Artifact::RootProviders), single);
        assert_eq!(emitted_in(&Artifact::Providers(Component::IdentityStore)), multi);
        assert_eq!(emitted_in(&Artifact::Instances(Component::PermissionSets)), everywhere);
        for task in TaskId::all() {
            if task != TaskId::ManagedPoliciesList {
                assert_eq!(emitted_in(&Artifact::Task(task)), everywhere, "{:?}", task);
            }
        }

        let templates = sample_templates();
        assert_eq!(emitted_in(&templates[0]), vec![PAIRS[3]]);
        assert_eq!(emitted_in(&templates[1]), single);
        assert_eq!(emitted_in(&templates[2]), vec![PAIRS[2]]);
        assert_eq!(emitted_in(&templates[3]), vec![PAIRS[3]]);
        assert_eq!(emitted_in(&templates[4]), vec![PAIRS[2]]);
        assert_eq!(emitted_in(&templates[5]), single);
        assert!(emitted_in(&templates[6]).is_empty());
        assert_eq!(emitted_in(&templates[7]), everywhere);
        assert!(emitted_in(&templates[8]).is_empty());
    }

    #[test]
    fn test_exactly_one_assignment_variant_per_mode() {
        let templates = sample_templates();
        for mode in Mode::axes() {
            let emitted: Vec<Placement> = templates[..3]
                .iter()
                .filter_map(|t| decide(&mode, t).placement().cloned())
                .collect();
            assert_eq!(emitted.len(), 1, "{:?}", mode);
            assert_eq!(emitted[0].file_name, "aws_ssoadmin_account_assignments.tf");
        }
    }

    #[test]
    fn test_data_source_gate() {
        let list = Artifact::Task(TaskId::ManagedPoliciesList);
        let map = Artifact::Task(TaskId::ManagedPoliciesMap);
        for mode in Mode::all() {
            let list_decision = decide(&mode, &list);
            let map_variant = decide(&mode, &map).placement().map(|p| p.variant);
            if mode.managed_policy_data_sources {
                assert!(!list_decision.is_skip());
                assert_eq!(map_variant, Some(Variant::Default));
            } else {
                assert_eq!(list_decision, Decision::Skip(SkipReason::StaticArnsPreferred));
                assert_eq!(map_variant, Some(Variant::StaticArns));
            }
        }
    }

    #[test]
    fn test_import_tasks_route_to_root_in_single_state() {
        for mode in Mode::axes().into_iter().filter(|m| m.team_enabled) {
            for task in TaskId::all().into_iter().filter(|t| t.is_import()) {
                let placement = decide(&mode, &Artifact::Task(task)).placement().cloned().unwrap();
                match mode.state_mode {
                    StateMode::Single => {
                        assert_eq!(placement.location, Location::Root);
                        assert_eq!(placement.prefix(), task.component().module_prefix());
                    }
                    StateMode::Multi => {
                        assert_eq!(placement.location, Location::Component(task.component()));
                        assert_eq!(placement.prefix(), "");
                    }
                }
            }
        }

        let placement = decide(
            &Mode::new(StateMode::Single, Platform::Local, false),
            &Artifact::Task(TaskId::PermissionSetsImport),
        );
        assert_eq!(
            placement.placement().unwrap().prefix(),
            "module.permission_sets."
        );
    }

    #[test]
    fn test_provider_variants_follow_platform() {
        let multi_tfc = Mode::new(StateMode::Multi, Platform::Tfc, false);
        let single_local = Mode::new(StateMode::Single, Platform::Local, false);
        assert_eq!(
            decide(&multi_tfc, &Artifact::Providers(Component::IdentityStore))
                .placement()
                .map(|p| p.variant),
            Some(Variant::Tfc)
        );
        assert_eq!(
            decide(&single_local, &Artifact::RootProviders).placement().map(|p| p.variant),
            Some(Variant::Default)
        );
    }

    #[test]
    fn test_component_naming() {
        assert_eq!(Component::PermissionSets.module_prefix(), "module.permission_sets.");
        assert_eq!(Component::IdentityStore.workspace_component(), "identity-store");
        assert_eq!(Component::active(false).len(), 4);
        assert_eq!(Component::active(true).len(), 5);
        for component in Component::all() {
            assert_eq!(Component::from_str(component.as_str()), Some(component));
        }
    }

    #[test]
    fn test_task_file_names() {
        assert_eq!(TaskId::TeamApproverPolicies.file_name(), "aws_team_approver_policies.tf");
        assert_eq!(
            TaskId::TeamEligibilityPolicies.file_name(),
            "aws_team_eligibility_policies.tf"
        );
        assert_eq!(
            TaskId::TeamApplicationAssignments.file_name(),
            "aws_team_application_assignments.tf"
        );
        assert_eq!(TaskId::TeamData.file_name(), "data.tf");
        assert_eq!(TaskId::AccountLocals.file_name(), "locals.tf");

        for task in TaskId::all() {
            let name = task.file_name();
            assert!(name.ends_with(".tf"));
            assert!(
                name.starts_with("aws_") || matches!(name, "locals.tf" | "data.tf"),
                "unexpected file name {name}"
            );
        }
    }
}
