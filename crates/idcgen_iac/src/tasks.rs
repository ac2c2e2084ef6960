//! Data-driven generation tasks.
//!
//! A task reads one record kind, narrows it with a filter from the fixed
//! filter registry and renders one Terraform file. Tasks joining several
//! record kinds (TEAM data, locals and application assignments) are handled
//! by the generator directly and listed in [`JOIN_TASKS`].

use std::collections::BTreeSet;

use tracing::debug;

use idcgen_core::{
    AccountAssignmentRecord, AccountRecord, Absence, AssignmentTree, AttachmentMap,
    GroupMembershipRecord, GroupRecord, Importable, ManagedAttachment, ManagedPolicyRecord,
    MembershipMap, PermissionSetRecord, Placement, RecordKind, RecordStore, TaskId,
    TeamApproverRecord, TeamEligibilityRecord, UserRecord, Variant,
};
use idcgen_templates::hcl;

use crate::error::{IacError, IacResult};

/// Permission sets created by TEAM itself carry this name prefix.
pub const TEAM_PERMISSION_SET_PREFIX: &str = "TEAM-";

/// Account names given to accounts that could not be resolved.
pub const UNKNOWN_ACCOUNT_PREFIX: &str = "UnknownAccount";

/// Tasks that join several record kinds.
pub const JOIN_TASKS: [TaskId; 4] = [
    TaskId::TeamData,
    TaskId::TeamLocals,
    TaskId::TeamApplicationAssignments,
    TaskId::TeamApplicationAssignmentsImport,
];

/// Records loaded for one task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskInput {
    Users(Vec<UserRecord>),
    Groups(Vec<GroupRecord>),
    Memberships(Vec<GroupMembershipRecord>),
    PermissionSets(Vec<PermissionSetRecord>),
    Assignments(Vec<AccountAssignmentRecord>),
    Accounts(Vec<AccountRecord>),
    ManagedPolicies(Vec<ManagedPolicyRecord>),
    TeamApprovers(Vec<TeamApproverRecord>),
    TeamEligibility(Vec<TeamEligibilityRecord>),
}

impl TaskInput {
    /// Load every record of a kind from the store.
    pub fn load(store: &RecordStore, kind: RecordKind, absence: Absence) -> IacResult<Self> {
        let input = match kind {
            RecordKind::User => TaskInput::Users(store.load_all(absence)?),
            RecordKind::Group => TaskInput::Groups(store.load_all(absence)?),
            RecordKind::GroupMembership => TaskInput::Memberships(store.load_all(absence)?),
            RecordKind::PermissionSet => TaskInput::PermissionSets(store.load_all(absence)?),
            RecordKind::AccountAssignment => TaskInput::Assignments(store.load_all(absence)?),
            RecordKind::Account => TaskInput::Accounts(store.load_all(absence)?),
            RecordKind::ManagedPolicy => TaskInput::ManagedPolicies(store.load_all(absence)?),
            RecordKind::TeamApprover => TaskInput::TeamApprovers(store.load_all(absence)?),
            RecordKind::TeamEligibility => TaskInput::TeamEligibility(store.load_all(absence)?),
            other => {
                return Err(IacError::GenerationFailed(format!(
                    "no task reads {} records on their own",
                    other
                )))
            }
        };
        Ok(input)
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            TaskInput::Users(_) => RecordKind::User,
            TaskInput::Groups(_) => RecordKind::Group,
            TaskInput::Memberships(_) => RecordKind::GroupMembership,
            TaskInput::PermissionSets(_) => RecordKind::PermissionSet,
            TaskInput::Assignments(_) => RecordKind::AccountAssignment,
            TaskInput::Accounts(_) => RecordKind::Account,
            TaskInput::ManagedPolicies(_) => RecordKind::ManagedPolicy,
            TaskInput::TeamApprovers(_) => RecordKind::TeamApprover,
            TaskInput::TeamEligibility(_) => RecordKind::TeamEligibility,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TaskInput::Users(v) => v.len(),
            TaskInput::Groups(v) => v.len(),
            TaskInput::Memberships(v) => v.len(),
            TaskInput::PermissionSets(v) => v.len(),
            TaskInput::Assignments(v) => v.len(),
            TaskInput::Accounts(v) => v.len(),
            TaskInput::ManagedPolicies(v) => v.len(),
            TaskInput::TeamApprovers(v) => v.len(),
            TaskInput::TeamEligibility(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move every import address under a child module.
    pub fn prefix_imports(&mut self, module_prefix: &str) {
        fn prefix_all<R: Importable>(records: &mut [R], module_prefix: &str) {
            for record in records {
                record.prefix_import_to(module_prefix);
            }
        }

        match self {
            TaskInput::Users(v) => prefix_all(v, module_prefix),
            TaskInput::Groups(v) => prefix_all(v, module_prefix),
            TaskInput::Memberships(v) => prefix_all(v, module_prefix),
            TaskInput::PermissionSets(v) => prefix_all(v, module_prefix),
            TaskInput::Assignments(v) => prefix_all(v, module_prefix),
            TaskInput::Accounts(_)
            | TaskInput::ManagedPolicies(_)
            | TaskInput::TeamApprovers(_)
            | TaskInput::TeamEligibility(_) => {}
        }
    }
}

/// Pure record filter.
pub type FilterFn = fn(TaskInput) -> TaskInput;

/// Filters a task can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterId {
    All,
    /// Records provisioned by an external identity provider.
    ScimManaged,
    /// Records owned by the identity store itself.
    DirectoryManaged,
    /// Assignments that are neither TEAM grants nor on unresolved accounts.
    ManagedAssignments,
}

impl FilterId {
    pub fn function(&self) -> FilterFn {
        match self {
            FilterId::All => keep_all,
            FilterId::ScimManaged => scim_managed,
            FilterId::DirectoryManaged => directory_managed,
            FilterId::ManagedAssignments => managed_assignments,
        }
    }

    pub fn apply(&self, input: TaskInput) -> TaskInput {
        (self.function())(input)
    }
}

fn keep_all(input: TaskInput) -> TaskInput {
    input
}

fn by_scim(input: TaskInput, scim: bool) -> TaskInput {
    match input {
        TaskInput::Users(v) => TaskInput::Users(v.into_iter().filter(|r| r.scim == scim).collect()),
        TaskInput::Groups(v) => {
            TaskInput::Groups(v.into_iter().filter(|r| r.scim == scim).collect())
        }
        // A membership follows its group's flag.
        TaskInput::Memberships(v) => {
            TaskInput::Memberships(v.into_iter().filter(|r| r.scim == scim).collect())
        }
        other => other,
    }
}

fn scim_managed(input: TaskInput) -> TaskInput {
    by_scim(input, true)
}

fn directory_managed(input: TaskInput) -> TaskInput {
    by_scim(input, false)
}

fn managed_assignments(input: TaskInput) -> TaskInput {
    match input {
        TaskInput::Assignments(v) => TaskInput::Assignments(
            v.into_iter()
                .filter(|a| {
                    !a.permission_set_name.starts_with(TEAM_PERMISSION_SET_PREFIX)
                        && !a.account_name.starts_with(UNKNOWN_ACCOUNT_PREFIX)
                })
                .collect(),
        ),
        other => other,
    }
}

/// One single-source task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub id: TaskId,
    pub source: RecordKind,
    pub filter: FilterId,
    pub absence: Absence,
}

impl TaskSpec {
    const fn new(id: TaskId, source: RecordKind, filter: FilterId, absence: Absence) -> Self {
        Self {
            id,
            source,
            filter,
            absence,
        }
    }

    /// Load, filter and prefix the task's records.
    pub fn input(&self, store: &RecordStore, placement: &Placement) -> IacResult<TaskInput> {
        let loaded = TaskInput::load(store, self.source, self.absence)?;
        let total = loaded.len();
        let mut input = self.filter.apply(loaded);
        debug!(
            "Task {}: {} of {} {} records after {:?}",
            self.id.name(),
            input.len(),
            total,
            self.source,
            self.filter
        );
        if let Some(prefix) = &placement.module_prefix {
            input.prefix_imports(prefix);
        }
        Ok(input)
    }
}

/// The fixed table of single-source tasks.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    specs: Vec<TaskSpec>,
}

impl TaskRegistry {
    pub fn standard() -> Self {
        use Absence::{Empty, Fatal};
        use FilterId::*;
        use RecordKind as K;

        let specs = vec![
            TaskSpec::new(TaskId::Users, K::User, DirectoryManaged, Fatal),
            TaskSpec::new(TaskId::UsersScim, K::User, ScimManaged, Fatal),
            TaskSpec::new(TaskId::UsersMap, K::User, All, Fatal),
            TaskSpec::new(TaskId::UsersImport, K::User, DirectoryManaged, Fatal),
            TaskSpec::new(TaskId::Groups, K::Group, DirectoryManaged, Fatal),
            TaskSpec::new(TaskId::GroupsScim, K::Group, ScimManaged, Fatal),
            TaskSpec::new(TaskId::GroupsMap, K::Group, All, Fatal),
            TaskSpec::new(TaskId::GroupsImport, K::Group, DirectoryManaged, Fatal),
            TaskSpec::new(TaskId::GroupMembershipsMap, K::GroupMembership, DirectoryManaged, Empty),
            TaskSpec::new(TaskId::GroupMembershipsMapScim, K::GroupMembership, ScimManaged, Empty),
            TaskSpec::new(TaskId::GroupMembershipsImport, K::GroupMembership, DirectoryManaged, Empty),
            TaskSpec::new(TaskId::ManagedPoliciesList, K::ManagedPolicy, All, Empty),
            TaskSpec::new(TaskId::ManagedPoliciesMap, K::ManagedPolicy, All, Empty),
            TaskSpec::new(TaskId::PermissionSets, K::PermissionSet, All, Fatal),
            TaskSpec::new(TaskId::PermissionSetsMap, K::PermissionSet, All, Fatal),
            TaskSpec::new(TaskId::PermissionSetsImport, K::PermissionSet, All, Fatal),
            TaskSpec::new(TaskId::InlinePoliciesImport, K::PermissionSet, All, Fatal),
            TaskSpec::new(TaskId::ManagedPolicyAttachmentsMap, K::PermissionSet, All, Fatal),
            TaskSpec::new(TaskId::ManagedPolicyAttachmentsImport, K::PermissionSet, All, Fatal),
            TaskSpec::new(TaskId::AccountAssignmentsImport, K::AccountAssignment, ManagedAssignments, Empty),
            TaskSpec::new(TaskId::AccountAssignmentsMap, K::AccountAssignment, ManagedAssignments, Empty),
            TaskSpec::new(TaskId::AccountLocals, K::Account, All, Fatal),
            TaskSpec::new(TaskId::TeamApproverPolicies, K::TeamApprover, All, Empty),
            TaskSpec::new(TaskId::TeamEligibilityPolicies, K::TeamEligibility, All, Empty),
        ];
        Self { specs }
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskSpec> {
        self.specs.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskSpec> {
        self.specs.iter()
    }
}

/// Group original name to its members' original names.
pub fn membership_map(memberships: &[GroupMembershipRecord]) -> MembershipMap {
    let mut sets: std::collections::BTreeMap<String, BTreeSet<String>> = Default::default();
    for m in memberships {
        sets.entry(m.group_original_name.clone())
            .or_default()
            .insert(m.user_original_name.clone());
    }
    sets.into_iter()
        .map(|(group, users)| (group, users.into_iter().collect()))
        .collect()
}

/// Assignments nested by account, permission set and principal type.
pub fn assignment_tree(assignments: &[AccountAssignmentRecord]) -> AssignmentTree {
    let mut tree = AssignmentTree::new();
    for a in assignments {
        let names = tree
            .entry(a.account_name.clone())
            .or_default()
            .entry(a.permission_set_name.clone())
            .or_default()
            .entry(a.principal_type)
            .or_default();
        if !names.contains(&a.principal_name) {
            names.push(a.principal_name.clone());
        }
    }
    for permission_sets in tree.values_mut() {
        for principals in permission_sets.values_mut() {
            for names in principals.values_mut() {
                names.sort();
            }
        }
    }
    tree
}

/// AWS managed policy attachments per permission set.
pub fn attachment_map(permission_sets: &[PermissionSetRecord]) -> IacResult<AttachmentMap> {
    let mut map = AttachmentMap::new();
    for ps in permission_sets {
        let policies = ps.require_managed_policies()?;
        if policies.is_empty() {
            continue;
        }
        let attachments = policies
            .iter()
            .map(|p| ManagedAttachment {
                permission_set_name: ps.resource_name.clone(),
                permission_set_arn: ps.permission_set_arn.clone(),
                instance_arn: ps.instance_arn.clone(),
                policy_name: p.name.clone(),
                policy_arn: p.arn.clone(),
            })
            .collect();
        map.insert(ps.resource_name.clone(), attachments);
    }
    Ok(map)
}

/// Render a single-source task's file content.
pub fn render(id: TaskId, input: &TaskInput, placement: &Placement) -> IacResult<String> {
    let prefix = placement.prefix();
    let content = match (id, input) {
        (TaskId::Users, TaskInput::Users(v)) => hcl::identity::users(v),
        (TaskId::UsersScim, TaskInput::Users(v)) => hcl::identity::users_scim(v),
        (TaskId::UsersMap, TaskInput::Users(v)) => hcl::identity::users_map(v),
        (TaskId::UsersImport, TaskInput::Users(v)) => hcl::identity::users_import(v),
        (TaskId::Groups, TaskInput::Groups(v)) => hcl::identity::groups(v),
        (TaskId::GroupsScim, TaskInput::Groups(v)) => hcl::identity::groups_scim(v),
        (TaskId::GroupsMap, TaskInput::Groups(v)) => hcl::identity::groups_map(v),
        (TaskId::GroupsImport, TaskInput::Groups(v)) => hcl::identity::groups_import(v),
        (TaskId::GroupMembershipsMap, TaskInput::Memberships(v)) => {
            hcl::identity::group_memberships_map(&membership_map(v))
        }
        (TaskId::GroupMembershipsMapScim, TaskInput::Memberships(v)) => {
            hcl::identity::group_memberships_map_scim(&membership_map(v))
        }
        (TaskId::GroupMembershipsImport, TaskInput::Memberships(v)) => {
            hcl::identity::group_memberships_import(v)
        }
        (TaskId::ManagedPoliciesList, TaskInput::ManagedPolicies(v)) => {
            hcl::permissions::managed_policies_list(v)
        }
        (TaskId::ManagedPoliciesMap, TaskInput::ManagedPolicies(v)) => {
            if placement.variant == Variant::StaticArns {
                hcl::permissions::managed_policies_map_static(v)
            } else {
                hcl::permissions::managed_policies_map_data()
            }
        }
        (TaskId::PermissionSets, TaskInput::PermissionSets(v)) => {
            hcl::permissions::permission_sets(v)?
        }
        (TaskId::PermissionSetsMap, TaskInput::PermissionSets(v)) => {
            hcl::permissions::permission_sets_map(v)
        }
        (TaskId::PermissionSetsImport, TaskInput::PermissionSets(v)) => {
            hcl::permissions::permission_sets_import(v)
        }
        (TaskId::InlinePoliciesImport, TaskInput::PermissionSets(v)) => {
            hcl::permissions::inline_policies_import(v, prefix)?
        }
        (TaskId::ManagedPolicyAttachmentsMap, TaskInput::PermissionSets(v)) => {
            hcl::permissions::managed_policy_attachments_map(&attachment_map(v)?)
        }
        (TaskId::ManagedPolicyAttachmentsImport, TaskInput::PermissionSets(v)) => {
            hcl::permissions::managed_policy_attachments_import(&attachment_map(v)?, prefix)
        }
        (TaskId::AccountAssignmentsImport, TaskInput::Assignments(v)) => {
            hcl::assignments::account_assignments_import(v)
        }
        (TaskId::AccountAssignmentsMap, TaskInput::Assignments(v)) => {
            hcl::assignments::account_assignments_map(&assignment_tree(v))
        }
        (TaskId::AccountLocals, TaskInput::Accounts(v)) => hcl::assignments::accounts_map(v),
        (TaskId::TeamApproverPolicies, TaskInput::TeamApprovers(v)) => {
            hcl::team::approver_policies(v.iter().map(|r| &r.0))
        }
        (TaskId::TeamEligibilityPolicies, TaskInput::TeamEligibility(v)) => {
            hcl::team::eligibility_policies(v.iter().map(|r| &r.0))
        }
        (id, input) => {
            return Err(IacError::GenerationFailed(format!(
                "task {} cannot render {} records",
                id.name(),
                input.kind()
            )))
        }
    };
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use idcgen_core::{Component, PrincipalType};

    fn assignment(account: &str, ps: &str, principal_type: PrincipalType, name: &str) -> AccountAssignmentRecord {
        AccountAssignmentRecord {
            account_id: "111111111111".to_string(),
            account_name: account.to_string(),
            account_resource_name: idcgen_core::sanitize_name(account),
            permission_set_arn: "arn:ps".to_string(),
            permission_set_name: ps.to_string(),
            principal_id: format!("id-{}", name),
            principal_type,
            principal_name: name.to_string(),
            principal_resource_name: idcgen_core::sanitize_name(name),
            resource_name: "rn".to_string(),
            original_name: "orig".to_string(),
            import_id: "id".to_string(),
            import_to: "aws_ssoadmin_account_assignment.controller[\"k\"]".to_string(),
        }
    }

    fn membership(group: &str, user: &str, scim: bool) -> GroupMembershipRecord {
        GroupMembershipRecord {
            membership_id: format!("m-{}-{}", group, user),
            group_id: format!("g-{}", group),
            user_id: None,
            group_resource_name: idcgen_core::sanitize_name(group),
            group_original_name: group.to_string(),
            user_resource_name: idcgen_core::sanitize_name(user),
            user_original_name: user.to_string(),
            scim,
            resource_name: idcgen_core::composite_name(&[group, user]),
            original_name: format!("{}___{}", group, user),
            import_id: "d-1/m".to_string(),
            import_to: format!(
                "aws_identitystore_group_membership.controller[\"{}___{}\"]",
                group, user
            ),
        }
    }

    #[test]
    fn test_registry_covers_every_task() {
        let registry = TaskRegistry::standard();
        for task in TaskId::all() {
            let registered = registry.get(task).is_some();
            let joined = JOIN_TASKS.contains(&task);
            assert!(registered != joined, "{} must be either registered or joined", task.name());
        }
    }

    #[test]
    fn test_registry_sources_match_components() {
        for spec in TaskRegistry::standard().iter() {
            match spec.id.component() {
                Component::Team => assert!(spec.source.is_team_scoped()),
                _ => assert!(!spec.source.is_team_scoped()),
            }
        }
    }

    #[test]
    fn test_membership_bucket_follows_group_flag() {
        let input = TaskInput::Memberships(vec![
            membership("Eng Team", "jane.doe", false),
            membership("Ops", "jane.doe", true),
        ]);
        match FilterId::DirectoryManaged.apply(input) {
            TaskInput::Memberships(v) => {
                assert_eq!(v.len(), 1);
                assert_eq!(v[0].group_original_name, "Eng Team");
            }
            other => panic!("unexpected input {:?}", other.kind()),
        }
    }

    #[test]
    fn test_managed_assignments_filter() {
        let input = TaskInput::Assignments(vec![
            assignment("Prod", "AdminAccess", PrincipalType::Group, "Eng Team"),
            assignment("Prod", "TEAM-Elevated", PrincipalType::User, "jane.doe"),
            assignment("UnknownAccount_222", "AdminAccess", PrincipalType::User, "jane.doe"),
        ]);
        assert_eq!(FilterId::ManagedAssignments.apply(input).len(), 1);
    }

    #[test]
    fn test_assignment_tree_sorts_and_dedupes() {
        let tree = assignment_tree(&[
            assignment("Prod", "AdminAccess", PrincipalType::User, "zoe"),
            assignment("Prod", "AdminAccess", PrincipalType::User, "adam"),
            assignment("Prod", "AdminAccess", PrincipalType::User, "adam"),
        ]);
        assert_eq!(
            tree["Prod"]["AdminAccess"][&PrincipalType::User],
            vec!["adam".to_string(), "zoe".to_string()]
        );
    }

    #[test]
    fn test_membership_map_groups_users() {
        let map = membership_map(&[
            membership("Eng Team", "john", false),
            membership("Eng Team", "jane.doe", false),
        ]);
        assert_eq!(map["Eng Team"], vec!["jane.doe".to_string(), "john".to_string()]);
    }

    #[test]
    fn test_prefix_imports() {
        let mut input = TaskInput::Memberships(vec![membership("Eng Team", "jane.doe", false)]);
        input.prefix_imports("module.identity_store.");
        let TaskInput::Memberships(v) = input else {
            panic!("kind changed");
        };
        assert!(v[0].import_to.starts_with("module.identity_store.aws_identitystore_group_membership"));
    }
}
