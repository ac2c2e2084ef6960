//! The directory source seam.
//!
//! [`DirectorySource`] is the read-only view of the identity directory,
//! organization and TEAM tables. List calls are paginated: callers pass the
//! previous page's token and stop when a page carries none.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use idcgen_core::{AttachedManagedPolicy, CustomerManagedPolicyRef, Tag};

use crate::error::FetchResult;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawInstance {
    pub instance_arn: String,
    pub identity_store_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawExternalId {
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawUserName {
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawEmail {
    pub value: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawUser {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<RawUserName>,
    #[serde(default)]
    pub emails: Vec<RawEmail>,
    #[serde(default)]
    pub external_ids: Vec<RawExternalId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawGroup {
    pub group_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_ids: Vec<RawExternalId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawGroupMembership {
    pub membership_id: String,
    pub group_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawAccount {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub status: String,
}

/// Organization root or organizational unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawOrganizationalUnit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPermissionSet {
    pub permission_set_arn: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub session_duration: Option<String>,
    #[serde(default)]
    pub relay_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawAccountAssignment {
    pub principal_id: String,
    pub principal_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawManagedPolicy {
    pub policy_name: String,
    pub arn: String,
    #[serde(default)]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub default_version_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawTable {
    pub table_name: String,
    pub table_arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawApplication {
    pub application_arn: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawApplicationAssignment {
    pub principal_id: String,
    pub principal_type: String,
}

/// Plain JSON attributes of one table item.
pub type RawItem = serde_json::Map<String, serde_json::Value>;

/// Read-only access to the identity directory and organization.
///
/// Calls may fail transiently; the normalizer decides which failures are
/// fatal.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Identity-center instances visible to the caller.
    async fn list_instances(&self) -> FetchResult<Vec<RawInstance>>;

    async fn list_users(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawUser>>;

    async fn describe_user(&self, identity_store_id: &str, user_id: &str) -> FetchResult<RawUser>;

    async fn list_groups(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawGroup>>;

    async fn describe_group(&self, identity_store_id: &str, group_id: &str)
        -> FetchResult<RawGroup>;

    async fn list_group_memberships(
        &self,
        identity_store_id: &str,
        group_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawGroupMembership>>;

    async fn list_accounts(&self, next_token: Option<String>) -> FetchResult<Page<RawAccount>>;

    async fn list_roots(&self) -> FetchResult<Vec<RawOrganizationalUnit>>;

    async fn list_organizational_units(
        &self,
        parent_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawOrganizationalUnit>>;

    /// ARNs of all permission sets of an instance.
    async fn list_permission_sets(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<String>>;

    async fn describe_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> FetchResult<RawPermissionSet>;

    /// Inline policy document as JSON text, `None` when there is none.
    async fn get_inline_policy(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> FetchResult<Option<String>>;

    async fn list_managed_policies_in_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<AttachedManagedPolicy>>;

    async fn list_customer_managed_policy_references(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<CustomerManagedPolicyRef>>;

    async fn list_tags_for_resource(
        &self,
        instance_arn: &str,
        resource_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<Tag>>;

    /// Account ids the permission set is provisioned on.
    async fn list_accounts_for_provisioned_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<String>>;

    async fn list_account_assignments(
        &self,
        instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawAccountAssignment>>;

    /// AWS managed policies (scope AWS).
    async fn list_aws_managed_policies(
        &self,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawManagedPolicy>>;

    /// Default version document of a managed policy.
    async fn get_policy_document(
        &self,
        policy_arn: &str,
        version_id: Option<&str>,
    ) -> FetchResult<serde_json::Value>;

    async fn list_tables(&self, next_token: Option<String>) -> FetchResult<Page<String>>;

    async fn describe_table(&self, table_name: &str) -> FetchResult<RawTable>;

    async fn list_table_tags(&self, table_arn: &str) -> FetchResult<Vec<Tag>>;

    async fn scan_table(
        &self,
        table_name: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawItem>>;

    async fn list_applications(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawApplication>>;

    async fn list_application_assignments(
        &self,
        application_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawApplicationAssignment>>;
}
