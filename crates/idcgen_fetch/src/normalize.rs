//! Pure conversions from raw directory records to normalized records.

use std::collections::HashMap;

use tracing::warn;

use idcgen_core::{
    composite_name, sanitize_name, AccountAssignmentRecord, AccountRecord, GroupMembershipRecord,
    GroupRecord, InstanceRecord, ManagedPolicyRecord, OrganizationalUnitRecord,
    PermissionSetRecord, PrincipalType, RecordKind, TeamItem, UserRecord, COMPOSITE_SEPARATOR,
};

use crate::source::{
    RawAccount, RawExternalId, RawGroup, RawGroupMembership, RawInstance, RawItem,
    RawManagedPolicy, RawOrganizationalUnit, RawPermissionSet, RawUser,
};

/// Session duration AWS applies when a permission set does not carry one.
pub const DEFAULT_SESSION_DURATION: &str = "PT1H";

/// Resolved names of an already-normalized entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef {
    pub resource_name: String,
    pub original_name: String,
    pub scim: bool,
}

impl NameRef {
    pub fn new(original_name: &str) -> Self {
        Self {
            resource_name: sanitize_name(original_name),
            original_name: original_name.to_string(),
            scim: false,
        }
    }

    pub fn with_scim(mut self, scim: bool) -> Self {
        self.scim = scim;
        self
    }

    /// Stand-in for a reference that cannot be resolved, e.g.
    /// `UnknownUser_<id>`.
    pub fn placeholder(kind: &str, id: &str) -> Self {
        Self::new(&format!("Unknown{}_{}", kind, id))
    }

    /// Placeholder for a user or group that cannot be resolved.
    pub fn missing_principal(principal_type: PrincipalType, id: &str) -> Self {
        match principal_type {
            PrincipalType::User => Self::placeholder("User", id),
            PrincipalType::Group => Self::placeholder("Group", id),
        }
    }
}

/// Id to names of one entity kind.
pub type NameIndex = HashMap<String, NameRef>;

/// Tracks sanitized names per kind and warns when two different original
/// names collapse onto the same slot. The later record still replaces the
/// earlier one.
#[derive(Debug)]
pub struct CollisionCheck {
    kind: RecordKind,
    seen: HashMap<String, String>,
}

impl CollisionCheck {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            seen: HashMap::new(),
        }
    }

    /// Record a name; returns true when it collides with a different original.
    pub fn observe(&mut self, resource_name: &str, original_name: &str) -> bool {
        match self.seen.get(resource_name) {
            Some(previous) if previous != original_name => {
                warn!(
                    "{} names '{}' and '{}' both sanitize to '{}'; the later record replaces the earlier",
                    self.kind, previous, original_name, resource_name
                );
                self.seen
                    .insert(resource_name.to_string(), original_name.to_string());
                true
            }
            _ => {
                self.seen
                    .insert(resource_name.to_string(), original_name.to_string());
                false
            }
        }
    }
}

/// A principal counts as SCIM-provisioned when any external id carries an id.
pub fn scim_flag(external_ids: &[RawExternalId]) -> bool {
    external_ids.iter().any(|e| e.id.is_some())
}

pub fn normalize_instance(raw: &RawInstance) -> InstanceRecord {
    let resource_name = raw
        .instance_arn
        .rsplit('/')
        .next()
        .map(sanitize_name)
        .unwrap_or_else(|| sanitize_name(&raw.instance_arn));

    InstanceRecord {
        instance_arn: raw.instance_arn.clone(),
        identity_store_id: raw.identity_store_id.clone(),
        region: raw.region.clone(),
        name: raw.name.clone(),
        status: raw.status.clone(),
        resource_name,
    }
}

pub fn normalize_user(raw: &RawUser, identity_store_id: &str) -> UserRecord {
    let names = NameRef::new(&raw.user_name);
    let email = raw
        .emails
        .iter()
        .find(|e| e.primary)
        .or_else(|| raw.emails.first())
        .map(|e| e.value.clone());

    UserRecord {
        user_id: raw.user_id.clone(),
        user_name: raw.user_name.clone(),
        display_name: raw.display_name.clone(),
        given_name: raw.name.as_ref().and_then(|n| n.given_name.clone()),
        family_name: raw.name.as_ref().and_then(|n| n.family_name.clone()),
        email,
        scim: scim_flag(&raw.external_ids),
        import_id: format!("{}/{}", identity_store_id, raw.user_id),
        import_to: format!("aws_identitystore_user.{}", names.resource_name),
        resource_name: names.resource_name,
        original_name: names.original_name,
    }
}

pub fn normalize_group(raw: &RawGroup, identity_store_id: &str) -> GroupRecord {
    let display_name = raw.display_name.clone().unwrap_or_else(|| raw.group_id.clone());
    let names = NameRef::new(&display_name);

    GroupRecord {
        group_id: raw.group_id.clone(),
        display_name,
        description: raw.description.clone(),
        scim: scim_flag(&raw.external_ids),
        import_id: format!("{}/{}", identity_store_id, raw.group_id),
        import_to: format!("aws_identitystore_group.{}", names.resource_name),
        resource_name: names.resource_name,
        original_name: names.original_name,
    }
}

/// Membership of `user` in `group`. Bucket selection later follows the
/// group's SCIM flag, which the membership inherits.
pub fn normalize_membership(
    raw: &RawGroupMembership,
    group: &NameRef,
    user: &NameRef,
    identity_store_id: &str,
) -> GroupMembershipRecord {
    let original_name = format!(
        "{}{}{}",
        group.original_name, COMPOSITE_SEPARATOR, user.original_name
    );

    GroupMembershipRecord {
        membership_id: raw.membership_id.clone(),
        group_id: raw.group_id.clone(),
        user_id: raw.user_id.clone(),
        group_resource_name: group.resource_name.clone(),
        group_original_name: group.original_name.clone(),
        user_resource_name: user.resource_name.clone(),
        user_original_name: user.original_name.clone(),
        scim: group.scim,
        resource_name: composite_name(&[&group.resource_name, &user.resource_name]),
        import_id: format!("{}/{}", identity_store_id, raw.membership_id),
        import_to: format!(
            "aws_identitystore_group_membership.controller[\"{}\"]",
            original_name
        ),
        original_name,
    }
}

pub fn normalize_account(raw: &RawAccount) -> AccountRecord {
    let names = NameRef::new(raw.name.as_deref().unwrap_or("UnknownAccount"));
    AccountRecord {
        id: raw.id.clone(),
        email: raw.email.clone(),
        status: raw.status.clone(),
        resource_name: names.resource_name,
        original_name: names.original_name,
    }
}

/// Organization unit at `depth`; the root has depth 0 and an empty parent
/// path, and its full path is its own name.
pub fn normalize_unit(
    raw: &RawOrganizationalUnit,
    depth: u32,
    parent_path: &str,
) -> OrganizationalUnitRecord {
    let full_path = if parent_path.is_empty() {
        raw.name.clone()
    } else {
        format!("{}/{}", parent_path, raw.name)
    };

    OrganizationalUnitRecord {
        id: raw.id.clone(),
        arn: raw.arn.clone(),
        depth,
        parent_path: parent_path.to_string(),
        full_path,
        resource_name: sanitize_name(&raw.name),
        original_name: raw.name.clone(),
    }
}

/// Permission set before the enrichment passes.
pub fn normalize_permission_set(raw: &RawPermissionSet, instance_arn: &str) -> PermissionSetRecord {
    let names = NameRef::new(raw.name.as_deref().unwrap_or("UnnamedPermissionSet"));

    PermissionSetRecord {
        permission_set_arn: raw.permission_set_arn.clone(),
        instance_arn: instance_arn.to_string(),
        description: raw.description.clone(),
        session_duration: raw
            .session_duration
            .clone()
            .unwrap_or_else(|| DEFAULT_SESSION_DURATION.to_string()),
        relay_state: raw.relay_state.clone(),
        import_id: format!("{},{}", raw.permission_set_arn, instance_arn),
        import_to: format!("aws_ssoadmin_permission_set.{}", names.resource_name),
        resource_name: names.resource_name,
        original_name: names.original_name,
        has_inline_policy: None,
        managed_policies: None,
        customer_managed_policies: None,
        tags: None,
    }
}

/// Participants of one account assignment, already resolved to names.
#[derive(Debug, Clone)]
pub struct AssignmentParties<'a> {
    pub instance_arn: &'a str,
    pub account_id: &'a str,
    pub account: &'a NameRef,
    pub permission_set_arn: &'a str,
    pub permission_set: &'a NameRef,
    pub principal_id: &'a str,
    pub principal_type: PrincipalType,
    pub principal: &'a NameRef,
}

pub fn normalize_assignment(parties: &AssignmentParties<'_>) -> AccountAssignmentRecord {
    let principal_type = parties.principal_type.as_str();
    let ps_name = &parties.permission_set.resource_name;
    let original_name = [
        parties.account.original_name.as_str(),
        ps_name,
        principal_type,
        parties.principal.original_name.as_str(),
    ]
    .join(COMPOSITE_SEPARATOR);

    AccountAssignmentRecord {
        account_id: parties.account_id.to_string(),
        account_name: parties.account.original_name.clone(),
        account_resource_name: parties.account.resource_name.clone(),
        permission_set_arn: parties.permission_set_arn.to_string(),
        permission_set_name: ps_name.clone(),
        principal_id: parties.principal_id.to_string(),
        principal_type: parties.principal_type,
        principal_name: parties.principal.original_name.clone(),
        principal_resource_name: parties.principal.resource_name.clone(),
        resource_name: composite_name(&[
            &parties.account.resource_name,
            ps_name,
            principal_type,
            &parties.principal.resource_name,
        ]),
        import_id: format!(
            "{},{},{},AWS_ACCOUNT,{},{}",
            parties.principal_id,
            principal_type,
            parties.account_id,
            parties.permission_set_arn,
            parties.instance_arn
        ),
        import_to: format!(
            "aws_ssoadmin_account_assignment.controller[\"{}\"]",
            original_name
        ),
        original_name,
    }
}

pub fn normalize_managed_policy(raw: &RawManagedPolicy) -> ManagedPolicyRecord {
    ManagedPolicyRecord {
        policy_name: raw.policy_name.clone(),
        arn: raw.arn.clone(),
        policy_id: raw.policy_id.clone(),
        default_version_id: raw.default_version_id.clone(),
        path: raw.path.clone(),
        resource_name: sanitize_name(&raw.policy_name),
    }
}

/// TEAM table item keyed by its type and sanitized name.
pub fn normalize_team_item(raw: &RawItem) -> TeamItem {
    let text = |key: &str| raw.get(key).and_then(|v| v.as_str()).unwrap_or("unknown");
    let sanitized_name = sanitize_name(text("name"));

    TeamItem {
        resource_name: composite_name(&[text("type"), &sanitized_name]),
        sanitized_name,
        attributes: raw.clone().into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawUserName;

    fn external(id: Option<&str>) -> RawExternalId {
        RawExternalId {
            issuer: Some("okta".to_string()),
            id: id.map(str::to_string),
        }
    }

    #[test]
    fn test_user_names_and_import() {
        let raw = RawUser {
            user_id: "u-1".to_string(),
            user_name: "jane.doe".to_string(),
            display_name: Some("Jane Doe".to_string()),
            name: Some(RawUserName {
                given_name: Some("Jane".to_string()),
                family_name: Some("Doe".to_string()),
            }),
            emails: vec![],
            external_ids: vec![external(Some("00u1"))],
        };

        let user = normalize_user(&raw, "d-123");
        assert_eq!(user.resource_name, "jane_doe");
        assert_eq!(user.resource_name, sanitize_name(&user.original_name));
        assert_eq!(user.original_name, "jane.doe");
        assert!(user.scim);
        assert_eq!(user.import_id, "d-123/u-1");
        assert_eq!(user.import_to, "aws_identitystore_user.jane_doe");
    }

    #[test]
    fn test_scim_requires_external_id_value() {
        assert!(!scim_flag(&[]));
        assert!(!scim_flag(&[external(None)]));
        assert!(scim_flag(&[external(None), external(Some("x"))]));
    }

    #[test]
    fn test_membership_follows_group_scim_and_original_names() {
        let group = NameRef::new("Eng Team").with_scim(false);
        let user = NameRef::new("jane.doe").with_scim(true);
        let raw = RawGroupMembership {
            membership_id: "m-1".to_string(),
            group_id: "g-1".to_string(),
            user_id: Some("u-1".to_string()),
        };

        let membership = normalize_membership(&raw, &group, &user, "d-123");
        assert_eq!(membership.resource_name, "Eng_Team___jane_doe");
        assert!(!membership.scim);
        assert_eq!(
            membership.import_to,
            "aws_identitystore_group_membership.controller[\"Eng Team___jane.doe\"]"
        );
        assert_eq!(membership.import_id, "d-123/m-1");
    }

    #[test]
    fn test_unit_paths() {
        let root = RawOrganizationalUnit {
            id: "r-1".to_string(),
            name: "Root".to_string(),
            arn: None,
        };
        let root_record = normalize_unit(&root, 0, "");
        assert_eq!(root_record.full_path, "Root");
        assert_eq!(root_record.parent_path, "");

        let child = RawOrganizationalUnit {
            id: "ou-1".to_string(),
            name: "Work Loads".to_string(),
            arn: None,
        };
        let child_record = normalize_unit(&child, 1, "Root");
        assert_eq!(child_record.full_path, "Root/Work Loads");
        assert_eq!(child_record.resource_name, "Work_Loads");
    }

    #[test]
    fn test_assignment_identifiers() {
        let account = NameRef::new("Prod Account");
        let permission_set = NameRef::new("Admin Access");
        let principal = NameRef::new("Eng Team");
        let parties = AssignmentParties {
            instance_arn: "arn:ins",
            account_id: "111111111111",
            account: &account,
            permission_set_arn: "arn:ps",
            permission_set: &permission_set,
            principal_id: "g-1",
            principal_type: PrincipalType::Group,
            principal: &principal,
        };

        let record = normalize_assignment(&parties);
        assert_eq!(record.resource_name, "Prod_Account___Admin_Access___GROUP___Eng_Team");
        assert_eq!(record.import_id, "g-1,GROUP,111111111111,AWS_ACCOUNT,arn:ps,arn:ins");
        assert_eq!(
            record.import_to,
            "aws_ssoadmin_account_assignment.controller[\"Prod Account___Admin_Access___GROUP___Eng Team\"]"
        );
        assert_eq!(record.permission_set_name, "Admin_Access");
        assert_eq!(record.account_name, "Prod Account");
    }

    #[test]
    fn test_placeholder_names() {
        let placeholder = NameRef::placeholder("User", "u-404");
        assert_eq!(placeholder.original_name, "UnknownUser_u-404");
        assert_eq!(placeholder.resource_name, "UnknownUser_u-404");
    }

    #[test]
    fn test_permission_set_defaults() {
        let raw = RawPermissionSet {
            permission_set_arn: "arn:ps".to_string(),
            name: None,
            description: None,
            session_duration: None,
            relay_state: None,
        };
        let record = normalize_permission_set(&raw, "arn:ins");
        assert_eq!(record.resource_name, "UnnamedPermissionSet");
        assert_eq!(record.session_duration, DEFAULT_SESSION_DURATION);
        assert_eq!(record.import_id, "arn:ps,arn:ins");
        assert!(record.has_inline_policy.is_none());
    }

    #[test]
    fn test_team_item_names() {
        let raw: RawItem = serde_json::from_str(r#"{"id":"1","name":"Prod Approvers","type":"Account"}"#).unwrap();
        let item = normalize_team_item(&raw);
        assert_eq!(item.sanitized_name, "Prod_Approvers");
        assert_eq!(item.resource_name, "Account___Prod_Approvers");
        assert_eq!(item.text("id"), Some("1"));
    }

    #[test]
    fn test_collision_check() {
        let mut check = CollisionCheck::new(RecordKind::Group);
        assert!(!check.observe("a_b", "a b"));
        assert!(!check.observe("a_b", "a b"));
        assert!(check.observe("a_b", "a.b"));
    }
}
