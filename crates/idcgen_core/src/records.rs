//! Normalized record types.
//!
//! One record type per entity kind. Required fields are plain fields, so a
//! persisted record that lacks one fails to deserialize with an error naming
//! the field. Enrichment fields a permission set only gains in later passes
//! are optional and checked by the `require_*` accessors.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Entity kinds held by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Instance,
    User,
    Group,
    GroupMembership,
    Account,
    OrganizationalUnit,
    PermissionSet,
    AccountAssignment,
    ManagedPolicy,
    TeamTable,
    TeamApprover,
    TeamEligibility,
    TeamApplication,
    TeamApplicationAssignments,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Instance => "instance",
            RecordKind::User => "user",
            RecordKind::Group => "group",
            RecordKind::GroupMembership => "group_membership",
            RecordKind::Account => "account",
            RecordKind::OrganizationalUnit => "organizational_unit",
            RecordKind::PermissionSet => "permission_set",
            RecordKind::AccountAssignment => "account_assignment",
            RecordKind::ManagedPolicy => "managed_policy",
            RecordKind::TeamTable => "team_table",
            RecordKind::TeamApprover => "team_approver",
            RecordKind::TeamEligibility => "team_eligibility",
            RecordKind::TeamApplication => "team_application",
            RecordKind::TeamApplicationAssignments => "team_application_assignments",
        }
    }

    /// Relative directory holding records of this kind.
    pub fn namespace(&self) -> &'static str {
        match self {
            RecordKind::Instance => "sso_admin",
            RecordKind::User => "users",
            RecordKind::Group => "groups",
            RecordKind::GroupMembership => "group_memberships",
            RecordKind::Account => "accounts",
            RecordKind::OrganizationalUnit => "organizational_units",
            RecordKind::PermissionSet => "permission_sets",
            RecordKind::AccountAssignment => "account_assignments",
            RecordKind::ManagedPolicy => "managed_policies",
            RecordKind::TeamTable => "team/dynamodb_tables",
            RecordKind::TeamApprover => "team/dynamodb_items/approvers",
            RecordKind::TeamEligibility => "team/dynamodb_items/eligibility",
            RecordKind::TeamApplication => "team/application",
            RecordKind::TeamApplicationAssignments => "team/application_assignments",
        }
    }

    /// Whether the kind only exists when the TEAM feature is enabled.
    pub fn is_team_scoped(&self) -> bool {
        matches!(
            self,
            RecordKind::TeamTable
                | RecordKind::TeamApprover
                | RecordKind::TeamEligibility
                | RecordKind::TeamApplication
                | RecordKind::TeamApplicationAssignments
        )
    }

    pub fn all() -> Vec<Self> {
        vec![
            RecordKind::Instance,
            RecordKind::User,
            RecordKind::Group,
            RecordKind::GroupMembership,
            RecordKind::Account,
            RecordKind::OrganizationalUnit,
            RecordKind::PermissionSet,
            RecordKind::AccountAssignment,
            RecordKind::ManagedPolicy,
            RecordKind::TeamTable,
            RecordKind::TeamApprover,
            RecordKind::TeamEligibility,
            RecordKind::TeamApplication,
            RecordKind::TeamApplicationAssignments,
        ]
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw documents stored next to records (policy bodies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    InlinePolicy,
    ManagedPolicyDocument,
}

impl DocumentKind {
    pub fn namespace(&self) -> &'static str {
        match self {
            DocumentKind::InlinePolicy => "permission_sets/inline_policies",
            DocumentKind::ManagedPolicyDocument => "managed_policies/policies",
        }
    }
}

/// A record persisted in its own slot of a kind-scoped namespace.
pub trait Record: Serialize + DeserializeOwned {
    const KIND: RecordKind;

    /// Slot (file stem) the record is stored under.
    fn slot(&self) -> &str;
}

/// Records that map onto a Terraform `import` block.
pub trait Importable {
    fn import_id(&self) -> &str;
    fn import_to(&self) -> &str;
    fn set_import_to(&mut self, address: String);

    /// Move the import address under a child module.
    fn prefix_import_to(&mut self, module_prefix: &str) {
        let address = format!("{}{}", module_prefix, self.import_to());
        self.set_import_to(address);
    }
}

macro_rules! importable {
    ($record:ty) => {
        impl Importable for $record {
            fn import_id(&self) -> &str {
                &self.import_id
            }

            fn import_to(&self) -> &str {
                &self.import_to
            }

            fn set_import_to(&mut self, address: String) {
                self.import_to = address;
            }
        }
    };
}

/// Principal types an account assignment can target.
///
/// Declaration order follows the type names, so GROUP sorts before USER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrincipalType {
    Group,
    User,
}

impl PrincipalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalType::User => "USER",
            PrincipalType::Group => "GROUP",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "USER" => Some(PrincipalType::User),
            "GROUP" => Some(PrincipalType::Group),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// AWS managed policy attached to a permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachedManagedPolicy {
    pub name: String,
    pub arn: String,
}

/// Customer-managed policy reference attached to a permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerManagedPolicyRef {
    pub name: String,
    #[serde(default = "default_policy_path")]
    pub path: String,
}

fn default_policy_path() -> String {
    "/".to_string()
}

/// The identity-center instance everything else hangs off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceRecord {
    pub instance_arn: String,
    pub identity_store_id: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub resource_name: String,
}

impl Record for InstanceRecord {
    const KIND: RecordKind = RecordKind::Instance;

    fn slot(&self) -> &str {
        &self.resource_name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserRecord {
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "SCIM")]
    pub scim: bool,
    pub resource_name: String,
    pub original_name: String,
    pub import_id: String,
    pub import_to: String,
}

impl Record for UserRecord {
    const KIND: RecordKind = RecordKind::User;

    fn slot(&self) -> &str {
        &self.resource_name
    }
}

importable!(UserRecord);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupRecord {
    pub group_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "SCIM")]
    pub scim: bool,
    pub resource_name: String,
    pub original_name: String,
    pub import_id: String,
    pub import_to: String,
}

impl Record for GroupRecord {
    const KIND: RecordKind = RecordKind::Group;

    fn slot(&self) -> &str {
        &self.resource_name
    }
}

importable!(GroupRecord);

/// Membership of one user in one group.
///
/// `OriginalName` is the `for_each` key: original group and user names
/// joined with `___`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupMembershipRecord {
    pub membership_id: String,
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub group_resource_name: String,
    pub group_original_name: String,
    pub user_resource_name: String,
    pub user_original_name: String,
    #[serde(rename = "SCIM")]
    pub scim: bool,
    pub resource_name: String,
    pub original_name: String,
    pub import_id: String,
    pub import_to: String,
}

impl Record for GroupMembershipRecord {
    const KIND: RecordKind = RecordKind::GroupMembership;

    fn slot(&self) -> &str {
        &self.resource_name
    }
}

importable!(GroupMembershipRecord);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub status: String,
    pub resource_name: String,
    pub original_name: String,
}

impl Record for AccountRecord {
    const KIND: RecordKind = RecordKind::Account;

    fn slot(&self) -> &str {
        &self.resource_name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrganizationalUnitRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    pub depth: u32,
    pub parent_path: String,
    pub full_path: String,
    pub resource_name: String,
    pub original_name: String,
}

impl Record for OrganizationalUnitRecord {
    const KIND: RecordKind = RecordKind::OrganizationalUnit;

    fn slot(&self) -> &str {
        &self.resource_name
    }
}

/// Permission set, enriched in four passes after the initial describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionSetRecord {
    pub permission_set_arn: String,
    pub instance_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub session_duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_state: Option<String>,
    pub resource_name: String,
    pub original_name: String,
    pub import_id: String,
    pub import_to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_inline_policy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_policies: Option<Vec<AttachedManagedPolicy>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_managed_policies: Option<Vec<CustomerManagedPolicyRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
}

impl PermissionSetRecord {
    fn missing(&self, field: &str) -> CoreError {
        CoreError::MissingField {
            record: format!("{}/{}", RecordKind::PermissionSet.namespace(), self.resource_name),
            field: field.to_string(),
        }
    }

    pub fn require_inline_flag(&self) -> CoreResult<bool> {
        self.has_inline_policy
            .ok_or_else(|| self.missing("HasInlinePolicy"))
    }

    pub fn require_managed_policies(&self) -> CoreResult<&[AttachedManagedPolicy]> {
        self.managed_policies
            .as_deref()
            .ok_or_else(|| self.missing("ManagedPolicies"))
    }

    pub fn require_customer_managed_policies(&self) -> CoreResult<&[CustomerManagedPolicyRef]> {
        self.customer_managed_policies
            .as_deref()
            .ok_or_else(|| self.missing("CustomerManagedPolicies"))
    }

    pub fn require_tags(&self) -> CoreResult<&[Tag]> {
        self.tags.as_deref().ok_or_else(|| self.missing("Tags"))
    }
}

impl Record for PermissionSetRecord {
    const KIND: RecordKind = RecordKind::PermissionSet;

    fn slot(&self) -> &str {
        &self.resource_name
    }
}

importable!(PermissionSetRecord);

/// Assignment of a permission set to a principal on one account.
///
/// `AccountName` and `PrincipalName` are original names; `PermissionSetName`
/// is the permission set's resource name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountAssignmentRecord {
    pub account_id: String,
    pub account_name: String,
    pub account_resource_name: String,
    pub permission_set_arn: String,
    pub permission_set_name: String,
    pub principal_id: String,
    pub principal_type: PrincipalType,
    pub principal_name: String,
    pub principal_resource_name: String,
    pub resource_name: String,
    pub original_name: String,
    pub import_id: String,
    pub import_to: String,
}

impl Record for AccountAssignmentRecord {
    const KIND: RecordKind = RecordKind::AccountAssignment;

    fn slot(&self) -> &str {
        &self.resource_name
    }
}

importable!(AccountAssignmentRecord);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedPolicyRecord {
    pub policy_name: String,
    pub arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub resource_name: String,
}

impl Record for ManagedPolicyRecord {
    const KIND: RecordKind = RecordKind::ManagedPolicy;

    fn slot(&self) -> &str {
        &self.resource_name
    }
}

/// Which TEAM lookup table a table or item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamTableKind {
    Approvers,
    Eligibility,
}

impl TeamTableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamTableKind::Approvers => "approvers",
            TeamTableKind::Eligibility => "eligibility",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TeamTableRecord {
    pub table_name: String,
    pub table_arn: String,
    pub table_kind: TeamTableKind,
    pub tags: Vec<Tag>,
    pub resource_name: String,
}

impl Record for TeamTableRecord {
    const KIND: RecordKind = RecordKind::TeamTable;

    fn slot(&self) -> &str {
        &self.resource_name
    }
}

/// One item scanned from a TEAM lookup table; the item's own attributes are
/// kept as-is next to the naming fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TeamItem {
    pub resource_name: String,
    pub sanitized_name: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl TeamItem {
    /// String attribute, if present.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamApproverRecord(pub TeamItem);

impl Record for TeamApproverRecord {
    const KIND: RecordKind = RecordKind::TeamApprover;

    fn slot(&self) -> &str {
        &self.0.resource_name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamEligibilityRecord(pub TeamItem);

impl Record for TeamEligibilityRecord {
    const KIND: RecordKind = RecordKind::TeamEligibility;

    fn slot(&self) -> &str {
        &self.0.resource_name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TeamApplicationRecord {
    pub application_arn: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub resource_name: String,
}

impl Record for TeamApplicationRecord {
    const KIND: RecordKind = RecordKind::TeamApplication;

    fn slot(&self) -> &str {
        &self.resource_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TeamAssignmentDetail {
    pub principal_type: PrincipalType,
    pub principal_name: String,
    pub principal_id: String,
}

/// Principals assigned to the TEAM application, resolved to names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TeamApplicationAssignmentsRecord {
    pub application_arn: String,
    pub users: Vec<String>,
    pub groups: Vec<String>,
    pub assignments: Vec<TeamAssignmentDetail>,
    pub resource_name: String,
}

impl Record for TeamApplicationAssignmentsRecord {
    const KIND: RecordKind = RecordKind::TeamApplicationAssignments;

    fn slot(&self) -> &str {
        &self.resource_name
    }
}
