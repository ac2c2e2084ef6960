//! Derived shapes built from records for generation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::records::PrincipalType;
use crate::sanitize::COMPOSITE_SEPARATOR;

/// Group original name to the original names of its members.
pub type MembershipMap = BTreeMap<String, Vec<String>>;

/// Account name, then permission set name, then principal type, to
/// principal names.
pub type AssignmentTree = BTreeMap<String, BTreeMap<String, BTreeMap<PrincipalType, Vec<String>>>>;

/// Permission set resource name to the managed policies attached to it.
pub type AttachmentMap = BTreeMap<String, Vec<ManagedAttachment>>;

/// One AWS managed policy attached to one permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedAttachment {
    pub permission_set_name: String,
    pub permission_set_arn: String,
    pub instance_arn: String,
    pub policy_name: String,
    pub policy_arn: String,
}

impl ManagedAttachment {
    /// Key of the attachment in the controller resource's `for_each`.
    pub fn key(&self) -> String {
        format!(
            "{}{}{}",
            self.permission_set_name, COMPOSITE_SEPARATOR, self.policy_name
        )
    }

    pub fn import_id(&self) -> String {
        format!(
            "{},{},{}",
            self.policy_arn, self.permission_set_arn, self.instance_arn
        )
    }

    pub fn import_to(&self, module_prefix: &str) -> String {
        format!(
            "{}aws_ssoadmin_managed_policy_attachment.controller[\"{}\"]",
            module_prefix,
            self.key()
        )
    }
}
