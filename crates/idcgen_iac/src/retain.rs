//! Managed-policy retention across full rebuilds.
//!
//! Before the output tree is wiped, the managed policies of the previous
//! generation are parsed back into records so the rebuild regenerates them.

use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::{info, warn};

use idcgen_core::{
    sanitize_name, Component, DocumentKind, ManagedPolicyRecord, RecordStore, TaskId,
};
use idcgen_templates::copy_tree;

use crate::error::IacResult;

/// ARN prefix of AWS managed policies.
pub const AWS_MANAGED_POLICY_ARN_PREFIX: &str = "arn:aws:iam::aws:policy/";

/// Which generated form the policies were recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetainedForm {
    List,
    Map,
}

/// Policies recovered from a previous generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Retained {
    pub form: RetainedForm,
    pub policies: Vec<ManagedPolicyRecord>,
    pub documents: usize,
}

/// Parser for the generated managed-policy files.
pub struct PolicyParser {
    list_pattern: Regex,
    quoted_pattern: Regex,
    map_entry_pattern: Regex,
}

impl Default for PolicyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyParser {
    pub fn new() -> Self {
        Self {
            list_pattern: Regex::new(r"(?s)managed_policies_list\s*=\s*\[(.*?)\]")
                .expect("list pattern is valid"),
            quoted_pattern: Regex::new(r#""([^"]+)""#).expect("quoted pattern is valid"),
            map_entry_pattern: Regex::new(r#"(?m)^\s*"([^"]+)"\s*=\s*"(arn:[^"]+)"\s*$"#)
                .expect("map entry pattern is valid"),
        }
    }

    /// Policy names of a `managed_policies_list` file.
    pub fn parse_list(&self, content: &str) -> Vec<ManagedPolicyRecord> {
        let Some(caps) = self.list_pattern.captures(content) else {
            return Vec::new();
        };
        self.quoted_pattern
            .captures_iter(&caps[1])
            .map(|c| {
                let name = c[1].to_string();
                let arn = format!("{}{}", AWS_MANAGED_POLICY_ARN_PREFIX, name);
                policy(name, arn)
            })
            .collect()
    }

    /// Name and ARN pairs of a static `managed_policies_map` file.
    pub fn parse_map(&self, content: &str) -> Vec<ManagedPolicyRecord> {
        self.map_entry_pattern
            .captures_iter(content)
            .map(|c| policy(c[1].to_string(), c[2].to_string()))
            .collect()
    }
}

fn policy(name: String, arn: String) -> ManagedPolicyRecord {
    ManagedPolicyRecord {
        resource_name: sanitize_name(&name),
        policy_name: name,
        arn,
        policy_id: None,
        default_version_id: None,
        path: None,
    }
}

/// Recover managed policies from the previous output under `terraform_dir`
/// into the store. Warns and returns `None` when nothing can be retained.
pub fn retain_managed_policies(
    terraform_dir: &Path,
    store: &RecordStore,
) -> IacResult<Option<Retained>> {
    let dir = terraform_dir.join(Component::ManagedPolicies.as_str());
    let parser = PolicyParser::new();

    let list_file = dir.join(TaskId::ManagedPoliciesList.file_name());
    let map_file = dir.join(TaskId::ManagedPoliciesMap.file_name());

    let mut recovered = None;
    if list_file.is_file() {
        let policies = parser.parse_list(&fs::read_to_string(&list_file)?);
        if !policies.is_empty() {
            recovered = Some((RetainedForm::List, policies));
        }
    }
    if recovered.is_none() && map_file.is_file() {
        let policies = parser.parse_map(&fs::read_to_string(&map_file)?);
        if !policies.is_empty() {
            recovered = Some((RetainedForm::Map, policies));
        }
    }

    let Some((form, policies)) = recovered else {
        warn!("Retaining managed policies was requested, but none were found.");
        warn!("Looked for {:?} and {:?}.", list_file, map_file);
        warn!("Managed policies will be generated from the fetched records only.");
        warn!("Run generate without retention once to create them.");
        return Ok(None);
    };

    store.clear(idcgen_core::RecordKind::ManagedPolicy)?;
    for record in &policies {
        store.put(record)?;
    }

    let previous_documents = dir.join("policies");
    let documents = if previous_documents.is_dir() {
        copy_tree(
            &previous_documents,
            &store.document_dir(DocumentKind::ManagedPolicyDocument),
        )?;
        store.list_documents(DocumentKind::ManagedPolicyDocument).len()
    } else {
        0
    };

    info!(
        "Retained {} managed policies from the {:?} form",
        policies.len(),
        form
    );
    Ok(Some(Retained {
        form,
        policies,
        documents,
    }))
}
