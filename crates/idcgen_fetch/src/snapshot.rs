//! Snapshot-backed directory source.
//!
//! A snapshot is a YAML or JSON document holding raw directory records in
//! the same shape the directory APIs return them. [`SnapshotSource`] serves
//! it page by page, so a snapshot exercises the same code path as a live
//! directory.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use idcgen_core::{AttachedManagedPolicy, CustomerManagedPolicyRef, Tag};

use crate::error::{FetchError, FetchResult};
use crate::source::{
    DirectorySource, Page, RawAccount, RawAccountAssignment, RawApplication,
    RawApplicationAssignment, RawGroup, RawGroupMembership, RawInstance, RawItem,
    RawManagedPolicy, RawOrganizationalUnit, RawPermissionSet, RawTable, RawUser,
};

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotUnit {
    #[serde(flatten)]
    pub unit: RawOrganizationalUnit,
    pub parent_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotPermissionSet {
    #[serde(flatten)]
    pub permission_set: RawPermissionSet,
    #[serde(default)]
    pub inline_policy: Option<serde_json::Value>,
    #[serde(default)]
    pub managed_policies: Vec<AttachedManagedPolicy>,
    #[serde(default)]
    pub customer_managed_policies: Vec<CustomerManagedPolicyRef>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub provisioned_accounts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotAssignment {
    pub account_id: String,
    pub permission_set_arn: String,
    pub principal_id: String,
    pub principal_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotManagedPolicy {
    #[serde(flatten)]
    pub policy: RawManagedPolicy,
    #[serde(default)]
    pub document: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotTable {
    pub table_name: String,
    pub table_arn: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotApplication {
    #[serde(flatten)]
    pub application: RawApplication,
    #[serde(default)]
    pub assignments: Vec<RawApplicationAssignment>,
}

/// Full directory snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DirectorySnapshot {
    pub region: String,
    pub instances: Vec<RawInstance>,
    pub users: Vec<RawUser>,
    pub groups: Vec<RawGroup>,
    pub group_memberships: Vec<RawGroupMembership>,
    pub accounts: Vec<RawAccount>,
    pub roots: Vec<RawOrganizationalUnit>,
    pub organizational_units: Vec<SnapshotUnit>,
    pub permission_sets: Vec<SnapshotPermissionSet>,
    pub account_assignments: Vec<SnapshotAssignment>,
    pub managed_policies: Vec<SnapshotManagedPolicy>,
    pub tables: Vec<SnapshotTable>,
    pub applications: Vec<SnapshotApplication>,
}

impl DirectorySnapshot {
    /// Load a snapshot; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> FetchResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| FetchError::Snapshot {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| FetchError::Snapshot {
            path: path.to_path_buf(),
            message,
        })
    }
}

/// Calls a [`SnapshotSource`] should fail, for exercising degraded paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    DescribeTable(String),
    TableTags(String),
    ScanTable(String),
    DescribePrincipal(String),
}

/// [`DirectorySource`] over an in-memory snapshot.
pub struct SnapshotSource {
    snapshot: DirectorySnapshot,
    page_size: usize,
    faults: HashSet<Fault>,
}

impl SnapshotSource {
    pub fn new(snapshot: DirectorySnapshot) -> Self {
        Self {
            snapshot,
            page_size: DEFAULT_PAGE_SIZE,
            faults: HashSet::new(),
        }
    }

    /// Load a snapshot file.
    pub fn from_file(path: &Path) -> FetchResult<Self> {
        debug!("Loading directory snapshot from {:?}", path);
        Ok(Self::new(DirectorySnapshot::load(path)?))
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.insert(fault);
        self
    }

    fn check(&self, fault: Fault, operation: &str) -> FetchResult<()> {
        if self.faults.contains(&fault) {
            return Err(FetchError::source_call(operation, "injected failure"));
        }
        Ok(())
    }

    fn page<T: Clone>(&self, items: Vec<T>, token: Option<String>) -> FetchResult<Page<T>> {
        let start = match token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| FetchError::source_call("paginate", format!("bad token {}", token)))?,
            None => 0,
        };

        let end = (start + self.page_size).min(items.len());
        let slice = items.get(start..end).map(|s| s.to_vec()).unwrap_or_default();
        let next_token = (end < items.len()).then(|| end.to_string());

        Ok(Page {
            items: slice,
            next_token,
        })
    }

    fn permission_set(&self, arn: &str) -> FetchResult<&SnapshotPermissionSet> {
        self.snapshot
            .permission_sets
            .iter()
            .find(|ps| ps.permission_set.permission_set_arn == arn)
            .ok_or_else(|| FetchError::NotFound(format!("permission set {}", arn)))
    }

    fn table(&self, name: &str) -> FetchResult<&SnapshotTable> {
        self.snapshot
            .tables
            .iter()
            .find(|t| t.table_name == name)
            .ok_or_else(|| FetchError::NotFound(format!("table {}", name)))
    }
}

#[async_trait]
impl DirectorySource for SnapshotSource {
    async fn list_instances(&self) -> FetchResult<Vec<RawInstance>> {
        Ok(self
            .snapshot
            .instances
            .iter()
            .cloned()
            .map(|mut instance| {
                if instance.region.is_empty() {
                    instance.region = self.snapshot.region.clone();
                }
                instance
            })
            .collect())
    }

    async fn list_users(
        &self,
        _identity_store_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawUser>> {
        self.page(self.snapshot.users.clone(), next_token)
    }

    async fn describe_user(&self, _identity_store_id: &str, user_id: &str) -> FetchResult<RawUser> {
        self.check(Fault::DescribePrincipal(user_id.to_string()), "describe_user")?;
        self.snapshot
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("user {}", user_id)))
    }

    async fn list_groups(
        &self,
        _identity_store_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawGroup>> {
        self.page(self.snapshot.groups.clone(), next_token)
    }

    async fn describe_group(
        &self,
        _identity_store_id: &str,
        group_id: &str,
    ) -> FetchResult<RawGroup> {
        self.check(Fault::DescribePrincipal(group_id.to_string()), "describe_group")?;
        self.snapshot
            .groups
            .iter()
            .find(|g| g.group_id == group_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("group {}", group_id)))
    }

    async fn list_group_memberships(
        &self,
        _identity_store_id: &str,
        group_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawGroupMembership>> {
        let memberships = self
            .snapshot
            .group_memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        self.page(memberships, next_token)
    }

    async fn list_accounts(&self, next_token: Option<String>) -> FetchResult<Page<RawAccount>> {
        self.page(self.snapshot.accounts.clone(), next_token)
    }

    async fn list_roots(&self) -> FetchResult<Vec<RawOrganizationalUnit>> {
        Ok(self.snapshot.roots.clone())
    }

    async fn list_organizational_units(
        &self,
        parent_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawOrganizationalUnit>> {
        let children = self
            .snapshot
            .organizational_units
            .iter()
            .filter(|u| u.parent_id == parent_id)
            .map(|u| u.unit.clone())
            .collect();
        self.page(children, next_token)
    }

    async fn list_permission_sets(
        &self,
        _instance_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<String>> {
        let arns = self
            .snapshot
            .permission_sets
            .iter()
            .map(|ps| ps.permission_set.permission_set_arn.clone())
            .collect();
        self.page(arns, next_token)
    }

    async fn describe_permission_set(
        &self,
        _instance_arn: &str,
        permission_set_arn: &str,
    ) -> FetchResult<RawPermissionSet> {
        Ok(self.permission_set(permission_set_arn)?.permission_set.clone())
    }

    async fn get_inline_policy(
        &self,
        _instance_arn: &str,
        permission_set_arn: &str,
    ) -> FetchResult<Option<String>> {
        let ps = self.permission_set(permission_set_arn)?;
        match &ps.inline_policy {
            Some(serde_json::Value::String(text)) => Ok(Some(text.clone())),
            Some(document) => Ok(Some(serde_json::to_string(document)?)),
            None => Ok(None),
        }
    }

    async fn list_managed_policies_in_permission_set(
        &self,
        _instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<AttachedManagedPolicy>> {
        let ps = self.permission_set(permission_set_arn)?;
        self.page(ps.managed_policies.clone(), next_token)
    }

    async fn list_customer_managed_policy_references(
        &self,
        _instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<CustomerManagedPolicyRef>> {
        let ps = self.permission_set(permission_set_arn)?;
        self.page(ps.customer_managed_policies.clone(), next_token)
    }

    async fn list_tags_for_resource(
        &self,
        _instance_arn: &str,
        resource_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<Tag>> {
        let ps = self.permission_set(resource_arn)?;
        self.page(ps.tags.clone(), next_token)
    }

    async fn list_accounts_for_provisioned_permission_set(
        &self,
        _instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<String>> {
        let ps = self.permission_set(permission_set_arn)?;
        self.page(ps.provisioned_accounts.clone(), next_token)
    }

    async fn list_account_assignments(
        &self,
        _instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawAccountAssignment>> {
        let assignments = self
            .snapshot
            .account_assignments
            .iter()
            .filter(|a| a.account_id == account_id && a.permission_set_arn == permission_set_arn)
            .map(|a| RawAccountAssignment {
                principal_id: a.principal_id.clone(),
                principal_type: a.principal_type.clone(),
            })
            .collect();
        self.page(assignments, next_token)
    }

    async fn list_aws_managed_policies(
        &self,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawManagedPolicy>> {
        let policies = self
            .snapshot
            .managed_policies
            .iter()
            .map(|p| p.policy.clone())
            .collect();
        self.page(policies, next_token)
    }

    async fn get_policy_document(
        &self,
        policy_arn: &str,
        _version_id: Option<&str>,
    ) -> FetchResult<serde_json::Value> {
        self.snapshot
            .managed_policies
            .iter()
            .find(|p| p.policy.arn == policy_arn)
            .and_then(|p| p.document.clone())
            .ok_or_else(|| FetchError::NotFound(format!("policy document {}", policy_arn)))
    }

    async fn list_tables(&self, next_token: Option<String>) -> FetchResult<Page<String>> {
        let names = self
            .snapshot
            .tables
            .iter()
            .map(|t| t.table_name.clone())
            .collect();
        self.page(names, next_token)
    }

    async fn describe_table(&self, table_name: &str) -> FetchResult<RawTable> {
        self.check(Fault::DescribeTable(table_name.to_string()), "describe_table")?;
        let table = self.table(table_name)?;
        Ok(RawTable {
            table_name: table.table_name.clone(),
            table_arn: table.table_arn.clone(),
        })
    }

    async fn list_table_tags(&self, table_arn: &str) -> FetchResult<Vec<Tag>> {
        let table = self
            .snapshot
            .tables
            .iter()
            .find(|t| t.table_arn == table_arn)
            .ok_or_else(|| FetchError::NotFound(format!("table {}", table_arn)))?;
        self.check(Fault::TableTags(table.table_name.clone()), "list_table_tags")?;
        Ok(table.tags.clone())
    }

    async fn scan_table(
        &self,
        table_name: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawItem>> {
        self.check(Fault::ScanTable(table_name.to_string()), "scan_table")?;
        let table = self.table(table_name)?;
        self.page(table.items.clone(), next_token)
    }

    async fn list_applications(
        &self,
        _instance_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawApplication>> {
        let applications = self
            .snapshot
            .applications
            .iter()
            .map(|a| a.application.clone())
            .collect();
        self.page(applications, next_token)
    }

    async fn list_application_assignments(
        &self,
        application_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<RawApplicationAssignment>> {
        let assignments = self
            .snapshot
            .applications
            .iter()
            .find(|a| a.application.application_arn == application_arn)
            .map(|a| a.assignments.clone())
            .unwrap_or_default();
        self.page(assignments, next_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(count: usize) -> DirectorySnapshot {
        DirectorySnapshot {
            users: (0..count)
                .map(|i| RawUser {
                    user_id: format!("u-{}", i),
                    user_name: format!("user{}", i),
                    display_name: None,
                    name: None,
                    emails: vec![],
                    external_ids: vec![],
                })
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_pagination_walks_all_pages() {
        let source = SnapshotSource::new(users(5)).with_page_size(2);

        let first = source.list_users("d-1", None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_token.as_deref(), Some("2"));

        let last = source.list_users("d-1", Some("4".to_string())).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(last.next_token.is_none());
    }

    #[tokio::test]
    async fn test_bad_token_is_source_error() {
        let source = SnapshotSource::new(users(1));
        let err = source.list_users("d-1", Some("nope".to_string())).await.unwrap_err();
        assert!(matches!(err, FetchError::Source { .. }));
    }

    #[tokio::test]
    async fn test_injected_fault() {
        let source = SnapshotSource::new(users(1)).with_fault(Fault::DescribePrincipal("u-0".to_string()));
        assert!(source.describe_user("d-1", "u-0").await.is_err());
    }

    #[test]
    fn test_parse_yaml_snapshot() {
        let yaml = r#"
Region: eu-west-1
Instances:
  - InstanceArn: arn:aws:sso:::instance/ssoins-1
    IdentityStoreId: d-1
Users:
  - UserId: u-1
    UserName: jane.doe
    ExternalIds:
      - Issuer: okta
        Id: "00u1"
PermissionSets:
  - PermissionSetArn: arn:aws:sso:::permissionSet/ssoins-1/ps-1
    Name: Admin
    ProvisionedAccounts: ["111111111111"]
"#;
        let snapshot: DirectorySnapshot = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(snapshot.region, "eu-west-1");
        assert_eq!(snapshot.users[0].external_ids.len(), 1);
        assert_eq!(snapshot.permission_sets[0].provisioned_accounts, vec!["111111111111"]);
        assert_eq!(
            snapshot.permission_sets[0].permission_set.name.as_deref(),
            Some("Admin")
        );
    }
}
