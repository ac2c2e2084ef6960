//! Resource normalization engine.
//!
//! Walks a [`DirectorySource`] in dependency order, normalizes every entity
//! and persists it through the [`RecordStore`]. Users and groups are indexed
//! before memberships, and accounts plus permission sets before assignments.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use idcgen_core::{
    composite_name, sanitize_name, DocumentKind, InstanceRecord, ManagedPolicyRecord,
    PrincipalType, Record, RecordKind, RecordStore, Settings, Tag, TeamApplicationAssignmentsRecord,
    TeamApplicationRecord, TeamApproverRecord, TeamAssignmentDetail, TeamEligibilityRecord,
    TeamTableKind, TeamTableRecord,
};

use crate::error::{FetchError, FetchResult};
use crate::normalize::{
    normalize_account, normalize_assignment, normalize_group, normalize_instance,
    normalize_managed_policy, normalize_membership, normalize_permission_set, normalize_team_item,
    normalize_unit, normalize_user, AssignmentParties, CollisionCheck, NameIndex, NameRef,
};
use crate::source::{DirectorySource, Page, RawOrganizationalUnit};

/// Pause between consecutive directory calls.
pub const COURTESY_DELAY: Duration = Duration::from_millis(1);

/// Deepest organizational-unit level that is traversed; the root is level 0.
pub const MAX_OU_DEPTH: u32 = 5;

/// Name of the TEAM identity-center application.
pub const TEAM_APPLICATION_NAME: &str = "TEAM IDC APP";

/// Tags a TEAM lookup table must carry.
pub const TEAM_TABLE_TAGS: [(&str, &str); 2] = [
    ("project", "iam-identity-center-team"),
    ("environment", "prod"),
];

/// Records written per kind during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub counts: BTreeMap<RecordKind, usize>,
}

impl FetchSummary {
    fn add(&mut self, kind: RecordKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }

    pub fn count(&self, kind: RecordKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Collect every page of a paginated call, pausing `delay` after each page.
async fn paginate<T, F, Fut>(delay: Duration, mut call: F) -> FetchResult<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = FetchResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token = None;

    loop {
        let page = call(token.take()).await?;
        items.extend(page.items);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match page.next_token {
            Some(next) => token = Some(next),
            None => return Ok(items),
        }
    }
}

/// Per-run name indexes used to resolve references.
#[derive(Debug, Default)]
struct Indexes {
    users: NameIndex,
    groups: NameIndex,
    accounts: NameIndex,
    permission_sets: NameIndex,
}

/// Drives one fetch run from a directory source into the record store.
pub struct Normalizer<'a> {
    source: &'a dyn DirectorySource,
    store: &'a RecordStore,
    settings: &'a Settings,
    delay: Duration,
}

impl<'a> Normalizer<'a> {
    pub fn new(source: &'a dyn DirectorySource, store: &'a RecordStore, settings: &'a Settings) -> Self {
        Self {
            source,
            store,
            settings,
            delay: COURTESY_DELAY,
        }
    }

    /// Override the courtesy delay between calls.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run a full fetch.
    pub async fn run(&self) -> FetchResult<FetchSummary> {
        let mut summary = FetchSummary::default();
        let mut indexes = Indexes::default();

        if self.settings.retain_managed_policies {
            info!("Clearing record store {:?} (retaining managed policies)", self.store.root());
            self.store.clear_all_except(&[RecordKind::ManagedPolicy])?;
        } else {
            info!("Clearing record store {:?}", self.store.root());
            self.store.clear_all()?;
        }

        let instance = self.fetch_instance(&mut summary).await?;
        self.fetch_users(&instance, &mut indexes, &mut summary).await?;
        self.fetch_groups(&instance, &mut indexes, &mut summary).await?;
        self.fetch_memberships(&instance, &indexes, &mut summary).await?;
        self.fetch_accounts(&mut indexes, &mut summary).await?;
        self.fetch_organizational_units(&mut summary).await?;
        let provisioned = self
            .fetch_permission_sets(&instance, &mut indexes, &mut summary)
            .await?;
        self.fetch_assignments(&instance, &indexes, &provisioned, &mut summary)
            .await?;

        if self.settings.enable_team {
            self.fetch_team(&instance, &mut summary).await;
        } else {
            debug!("TEAM support disabled, skipping TEAM records");
        }

        if self.settings.retain_managed_policies {
            info!("Retaining existing managed policies, skipping refresh");
        } else {
            self.fetch_managed_policies(&mut summary).await?;
        }

        info!("Fetch complete: {} records", summary.total());
        Ok(summary)
    }

    fn put<R: Record>(&self, record: &R, summary: &mut FetchSummary) -> FetchResult<()> {
        self.store.put(record)?;
        summary.add(R::KIND);
        Ok(())
    }

    async fn fetch_instance(&self, summary: &mut FetchSummary) -> FetchResult<InstanceRecord> {
        let instances = self.source.list_instances().await?;
        let raw = instances.first().ok_or(FetchError::NoInstance)?;
        if instances.len() > 1 {
            warn!(
                "Found {} SSO instances, using {}",
                instances.len(),
                raw.instance_arn
            );
        }

        let instance = normalize_instance(raw);
        info!("Using SSO instance {}", instance.instance_arn);
        self.put(&instance, summary)?;
        Ok(instance)
    }

    async fn fetch_users(
        &self,
        instance: &InstanceRecord,
        indexes: &mut Indexes,
        summary: &mut FetchSummary,
    ) -> FetchResult<()> {
        let store_id = instance.identity_store_id.as_str();
        let source = self.source;
        let users = paginate(self.delay, move |token| source.list_users(store_id, token)).await?;
        info!("Fetched {} users", users.len());

        let mut collisions = CollisionCheck::new(RecordKind::User);
        for raw in &users {
            let user = normalize_user(raw, store_id);
            collisions.observe(&user.resource_name, &user.original_name);
            debug!("Normalized user {} (scim: {})", user.user_name, user.scim);
            indexes.users.insert(
                user.user_id.clone(),
                NameRef::new(&user.original_name).with_scim(user.scim),
            );
            self.put(&user, summary)?;
        }
        Ok(())
    }

    async fn fetch_groups(
        &self,
        instance: &InstanceRecord,
        indexes: &mut Indexes,
        summary: &mut FetchSummary,
    ) -> FetchResult<()> {
        let store_id = instance.identity_store_id.as_str();
        let source = self.source;
        let groups = paginate(self.delay, move |token| source.list_groups(store_id, token)).await?;
        info!("Fetched {} groups", groups.len());

        let mut collisions = CollisionCheck::new(RecordKind::Group);
        for raw in &groups {
            let group = normalize_group(raw, store_id);
            collisions.observe(&group.resource_name, &group.original_name);
            debug!("Normalized group {} (scim: {})", group.display_name, group.scim);
            indexes.groups.insert(
                group.group_id.clone(),
                NameRef::new(&group.original_name).with_scim(group.scim),
            );
            self.put(&group, summary)?;
        }
        Ok(())
    }

    async fn fetch_memberships(
        &self,
        instance: &InstanceRecord,
        indexes: &Indexes,
        summary: &mut FetchSummary,
    ) -> FetchResult<()> {
        let store_id = instance.identity_store_id.as_str();
        let source = self.source;

        let mut group_ids: Vec<&String> = indexes.groups.keys().collect();
        group_ids.sort();

        let mut count = 0;
        for group_id in group_ids {
            let group = &indexes.groups[group_id];
            let gid = group_id.as_str();
            let memberships = paginate(self.delay, move |token| {
                source.list_group_memberships(store_id, gid, token)
            })
            .await?;

            for raw in &memberships {
                let user = match raw.user_id.as_deref() {
                    Some(user_id) => indexes
                        .users
                        .get(user_id)
                        .cloned()
                        .unwrap_or_else(|| NameRef::placeholder("User", user_id)),
                    None => NameRef::placeholder("User", &raw.membership_id),
                };
                let membership = normalize_membership(raw, group, &user, store_id);
                debug!("Normalized membership {}", membership.original_name);
                self.put(&membership, summary)?;
                count += 1;
            }
        }

        info!("Fetched {} group memberships", count);
        Ok(())
    }

    async fn fetch_accounts(&self, indexes: &mut Indexes, summary: &mut FetchSummary) -> FetchResult<()> {
        let source = self.source;
        let accounts = paginate(self.delay, move |token| source.list_accounts(token)).await?;

        let mut collisions = CollisionCheck::new(RecordKind::Account);
        let mut kept = 0;
        for raw in accounts.iter().filter(|a| a.status == "ACTIVE") {
            let account = normalize_account(raw);
            collisions.observe(&account.resource_name, &account.original_name);
            indexes
                .accounts
                .insert(account.id.clone(), NameRef::new(&account.original_name));
            self.put(&account, summary)?;
            kept += 1;
        }

        info!("Fetched {} active accounts ({} total)", kept, accounts.len());
        Ok(())
    }

    /// Depth-first walk from each organization root. Units below
    /// [`MAX_OU_DEPTH`] are not visited; a warning names each truncated unit.
    async fn fetch_organizational_units(&self, summary: &mut FetchSummary) -> FetchResult<()> {
        let source = self.source;
        let roots = source.list_roots().await?;

        let mut stack: Vec<(RawOrganizationalUnit, u32, String)> = roots
            .into_iter()
            .rev()
            .map(|root| (root, 0, String::new()))
            .collect();

        let mut count = 0;
        while let Some((raw, depth, parent_path)) = stack.pop() {
            let unit = normalize_unit(&raw, depth, &parent_path);
            let parent_id = unit.id.as_str();
            let children = paginate(self.delay, move |token| {
                source.list_organizational_units(parent_id, token)
            })
            .await?;

            if depth < MAX_OU_DEPTH {
                for child in children.into_iter().rev() {
                    stack.push((child, depth + 1, unit.full_path.clone()));
                }
            } else if !children.is_empty() {
                warn!(
                    "Organizational unit '{}' is at depth {}; {} child units are not traversed",
                    unit.full_path,
                    depth,
                    children.len()
                );
            }

            debug!("Normalized organizational unit {} (depth {})", unit.full_path, unit.depth);
            self.put(&unit, summary)?;
            count += 1;
        }

        info!("Fetched {} organizational units", count);
        Ok(())
    }

    /// Permission sets plus their four enrichment passes. Each pass walks
    /// every permission set before the next one starts. Returns the
    /// provisioned accounts per permission-set ARN.
    async fn fetch_permission_sets(
        &self,
        instance: &InstanceRecord,
        indexes: &mut Indexes,
        summary: &mut FetchSummary,
    ) -> FetchResult<Vec<(String, Vec<String>)>> {
        let instance_arn = instance.instance_arn.as_str();
        let source = self.source;
        let arns = paginate(self.delay, move |token| {
            source.list_permission_sets(instance_arn, token)
        })
        .await?;
        info!("Fetched {} permission sets", arns.len());

        let mut collisions = CollisionCheck::new(RecordKind::PermissionSet);
        let mut records = Vec::with_capacity(arns.len());
        for arn in &arns {
            let raw = source.describe_permission_set(instance_arn, arn).await?;
            let record = normalize_permission_set(&raw, instance_arn);
            collisions.observe(&record.resource_name, &record.original_name);
            self.store.put(&record)?;
            records.push(record);
        }

        for record in &mut records {
            let ps_arn = record.permission_set_arn.as_str();
            let inline = match source.get_inline_policy(instance_arn, ps_arn).await {
                Ok(Some(text)) if !text.trim().is_empty() => Some(text),
                Ok(_) => None,
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            };
            let has_inline_policy = match inline {
                Some(text) => {
                    let document: serde_json::Value = serde_json::from_str(&text)?;
                    self.store.put_document(
                        DocumentKind::InlinePolicy,
                        &record.resource_name,
                        &document,
                    )?;
                    true
                }
                None => false,
            };
            record.has_inline_policy = Some(has_inline_policy);
            self.store.put(&*record)?;
        }
        debug!("Inline policy pass complete");

        for record in &mut records {
            let ps_arn = record.permission_set_arn.as_str();
            let managed = paginate(self.delay, move |token| {
                source.list_managed_policies_in_permission_set(instance_arn, ps_arn, token)
            })
            .await?;
            record.managed_policies = Some(managed);
            self.store.put(&*record)?;
        }
        debug!("Managed policy pass complete");

        for record in &mut records {
            let ps_arn = record.permission_set_arn.as_str();
            let customer = paginate(self.delay, move |token| {
                source.list_customer_managed_policy_references(instance_arn, ps_arn, token)
            })
            .await?;
            record.customer_managed_policies = Some(customer);
            self.store.put(&*record)?;
        }
        debug!("Customer-managed policy pass complete");

        for record in &mut records {
            let ps_arn = record.permission_set_arn.as_str();
            let tags: Vec<Tag> = paginate(self.delay, move |token| {
                source.list_tags_for_resource(instance_arn, ps_arn, token)
            })
            .await?;
            record.tags = Some(tags);
            self.put(&*record, summary)?;

            debug!(
                "Normalized permission set {} (inline: {:?})",
                record.original_name, record.has_inline_policy
            );
        }

        let mut provisioned = Vec::with_capacity(records.len());
        for record in &records {
            let ps_arn = record.permission_set_arn.as_str();
            let accounts = paginate(self.delay, move |token| {
                source.list_accounts_for_provisioned_permission_set(instance_arn, ps_arn, token)
            })
            .await?;
            indexes.permission_sets.insert(
                record.permission_set_arn.clone(),
                NameRef::new(&record.original_name),
            );
            provisioned.push((record.permission_set_arn.clone(), accounts));
        }

        Ok(provisioned)
    }

    /// Assignments for provisioned (permission set, account) pairs only.
    async fn fetch_assignments(
        &self,
        instance: &InstanceRecord,
        indexes: &Indexes,
        provisioned: &[(String, Vec<String>)],
        summary: &mut FetchSummary,
    ) -> FetchResult<()> {
        let instance_arn = instance.instance_arn.as_str();
        let source = self.source;
        let mut count = 0;

        for (ps_arn, accounts) in provisioned {
            let Some(permission_set) = indexes.permission_sets.get(ps_arn) else {
                continue;
            };

            for account_id in accounts {
                let ps = ps_arn.as_str();
                let acct = account_id.as_str();
                let raw_assignments = paginate(self.delay, move |token| {
                    source.list_account_assignments(instance_arn, acct, ps, token)
                })
                .await?;

                let account = indexes
                    .accounts
                    .get(account_id)
                    .cloned()
                    .unwrap_or_else(|| NameRef::placeholder("Account", account_id));

                for raw in &raw_assignments {
                    let Some(principal_type) = PrincipalType::from_str(&raw.principal_type) else {
                        warn!(
                            "Skipping assignment of {} with unsupported principal type {}",
                            raw.principal_id, raw.principal_type
                        );
                        continue;
                    };

                    let principal = match principal_type {
                        PrincipalType::User => indexes.users.get(&raw.principal_id),
                        PrincipalType::Group => indexes.groups.get(&raw.principal_id),
                    }
                    .cloned()
                    .unwrap_or_else(|| NameRef::missing_principal(principal_type, &raw.principal_id));

                    let record = normalize_assignment(&AssignmentParties {
                        instance_arn,
                        account_id,
                        account: &account,
                        permission_set_arn: ps_arn,
                        permission_set,
                        principal_id: &raw.principal_id,
                        principal_type,
                        principal: &principal,
                    });
                    debug!("Normalized account assignment {}", record.original_name);
                    self.put(&record, summary)?;
                    count += 1;
                }
            }
        }

        info!("Fetched {} account assignments", count);
        Ok(())
    }

    async fn fetch_managed_policies(&self, summary: &mut FetchSummary) -> FetchResult<()> {
        let source = self.source;
        let policies = paginate(self.delay, move |token| source.list_aws_managed_policies(token)).await?;

        for raw in &policies {
            let record: ManagedPolicyRecord = normalize_managed_policy(raw);
            match source
                .get_policy_document(&record.arn, record.default_version_id.as_deref())
                .await
            {
                Ok(document) => {
                    self.store.put_document(
                        DocumentKind::ManagedPolicyDocument,
                        &record.resource_name,
                        &document,
                    )?;
                }
                Err(e) => debug!("No document for managed policy {}: {}", record.policy_name, e),
            }
            self.put(&record, summary)?;
        }

        info!("Fetched {} managed policies", policies.len());
        Ok(())
    }

    /// TEAM tables, items and application. Failures are logged and skipped.
    async fn fetch_team(&self, instance: &InstanceRecord, summary: &mut FetchSummary) {
        if let Err(e) = self.fetch_team_tables(summary).await {
            warn!("Failed to fetch TEAM tables: {}", e);
        }
        if let Err(e) = self.fetch_team_application(instance, summary).await {
            warn!("Failed to fetch TEAM application: {}", e);
        }
    }

    async fn fetch_team_tables(&self, summary: &mut FetchSummary) -> FetchResult<()> {
        let source = self.source;
        let names = paginate(self.delay, move |token| source.list_tables(token)).await?;

        for name in &names {
            let Some(kind) = team_table_kind(name) else {
                continue;
            };

            let table = match source.describe_table(name).await {
                Ok(table) => table,
                Err(e) => {
                    warn!("Skipping TEAM table {}: {}", name, e);
                    continue;
                }
            };
            let tags = match source.list_table_tags(&table.table_arn).await {
                Ok(tags) => tags,
                Err(e) => {
                    warn!("Skipping TEAM table {}: tag lookup failed: {}", name, e);
                    continue;
                }
            };
            if !has_team_tags(&tags) {
                debug!("Table {} lacks TEAM tags, skipping", name);
                continue;
            }

            let table_name = table.table_name.as_str();
            let items = match paginate(self.delay, move |token| source.scan_table(table_name, token)).await {
                Ok(items) => items,
                Err(e) => {
                    warn!("Skipping TEAM table {}: scan failed: {}", name, e);
                    continue;
                }
            };

            let record = TeamTableRecord {
                resource_name: sanitize_name(&table.table_name),
                table_name: table.table_name.clone(),
                table_arn: table.table_arn.clone(),
                table_kind: kind,
                tags,
            };
            self.put(&record, summary)?;

            for raw in &items {
                let item = normalize_team_item(raw);
                match kind {
                    TeamTableKind::Approvers => self.put(&TeamApproverRecord(item), summary)?,
                    TeamTableKind::Eligibility => self.put(&TeamEligibilityRecord(item), summary)?,
                }
            }
            info!("Fetched TEAM {} table {} ({} items)", kind.as_str(), name, items.len());
        }
        Ok(())
    }

    async fn fetch_team_application(
        &self,
        instance: &InstanceRecord,
        summary: &mut FetchSummary,
    ) -> FetchResult<()> {
        let source = self.source;
        let instance_arn = instance.instance_arn.as_str();
        let store_id = instance.identity_store_id.as_str();
        let applications = paginate(self.delay, move |token| {
            source.list_applications(instance_arn, token)
        })
        .await?;

        let Some(app) = applications.iter().find(|a| a.name == TEAM_APPLICATION_NAME) else {
            warn!("TEAM application '{}' not found", TEAM_APPLICATION_NAME);
            return Ok(());
        };

        let resource_name = sanitize_name(&app.name);
        self.put(
            &TeamApplicationRecord {
                application_arn: app.application_arn.clone(),
                name: app.name.clone(),
                status: app.status.clone(),
                resource_name: resource_name.clone(),
            },
            summary,
        )?;

        let app_arn = app.application_arn.as_str();
        let raw_assignments = paginate(self.delay, move |token| {
            source.list_application_assignments(app_arn, token)
        })
        .await?;

        let mut cache: HashMap<(PrincipalType, String), String> = HashMap::new();
        let mut users = Vec::new();
        let mut groups = Vec::new();
        let mut assignments = Vec::new();

        for raw in &raw_assignments {
            let Some(principal_type) = PrincipalType::from_str(&raw.principal_type) else {
                debug!("Ignoring TEAM assignment with principal type {}", raw.principal_type);
                continue;
            };

            let key = (principal_type, raw.principal_id.clone());
            let name = match cache.get(&key) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .resolve_principal(store_id, principal_type, &raw.principal_id)
                        .await;
                    cache.insert(key, name.clone());
                    name
                }
            };

            match principal_type {
                PrincipalType::User => users.push(name.clone()),
                PrincipalType::Group => groups.push(name.clone()),
            }
            assignments.push(TeamAssignmentDetail {
                principal_type,
                principal_name: name,
                principal_id: raw.principal_id.clone(),
            });
        }

        users.sort();
        groups.sort();
        assignments.sort();

        self.put(
            &TeamApplicationAssignmentsRecord {
                application_arn: app.application_arn.clone(),
                users,
                groups,
                assignments,
                resource_name: composite_name(&[&resource_name, "assignments"]),
            },
            summary,
        )?;
        info!("Fetched TEAM application {}", app.name);
        Ok(())
    }

    /// Display name of a principal, or a placeholder when it cannot be read.
    async fn resolve_principal(
        &self,
        identity_store_id: &str,
        principal_type: PrincipalType,
        principal_id: &str,
    ) -> String {
        let resolved = match principal_type {
            PrincipalType::User => self
                .source
                .describe_user(identity_store_id, principal_id)
                .await
                .map(|u| u.user_name),
            PrincipalType::Group => self
                .source
                .describe_group(identity_store_id, principal_id)
                .await
                .map(|g| g.display_name.unwrap_or_else(|| g.group_id.clone())),
        };

        resolved.unwrap_or_else(|e| {
            debug!("Could not resolve {} {}: {}", principal_type.as_str(), principal_id, e);
            NameRef::missing_principal(principal_type, principal_id).original_name
        })
    }
}

fn team_table_kind(name: &str) -> Option<TeamTableKind> {
    static PATTERNS: std::sync::OnceLock<[(Regex, TeamTableKind); 2]> = std::sync::OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            (
                Regex::new(r"^Approvers-.*-main$").expect("approvers pattern is valid"),
                TeamTableKind::Approvers,
            ),
            (
                Regex::new(r"^Eligibility-.*-main$").expect("eligibility pattern is valid"),
                TeamTableKind::Eligibility,
            ),
        ]
    });

    patterns
        .iter()
        .find(|(pattern, _)| pattern.is_match(name))
        .map(|(_, kind)| *kind)
}

fn has_team_tags(tags: &[Tag]) -> bool {
    TEAM_TABLE_TAGS
        .iter()
        .all(|(key, value)| tags.iter().any(|t| t.key == *key && t.value == *value))
}
