//! TEAM (temporary elevated access) component.

use std::collections::BTreeMap;

use serde_json::Value;

use idcgen_core::{
    AccountRecord, OrganizationalUnitRecord, TeamApplicationAssignmentsRecord, TeamItem,
    TeamTableKind, TeamTableRecord, COMPOSITE_SEPARATOR,
};

use super::{import_block, locals_map, quote, value};

/// Address of the TEAM application assignment module inside the component.
pub const TEAM_APP_MODULE: &str = "module.team_app_assignment.";

/// One approver policy module per approvers table item.
pub fn approver_policies<'a>(items: impl IntoIterator<Item = &'a TeamItem>) -> String {
    item_modules("approver", TeamTableKind::Approvers, items)
}

/// One eligibility policy module per eligibility table item.
pub fn eligibility_policies<'a>(items: impl IntoIterator<Item = &'a TeamItem>) -> String {
    item_modules("eligibility", TeamTableKind::Eligibility, items)
}

fn item_modules<'a>(
    module: &str,
    kind: TeamTableKind,
    items: impl IntoIterator<Item = &'a TeamItem>,
) -> String {
    let blocks: Vec<String> = items
        .into_iter()
        .map(|item| {
            let attributes: serde_json::Map<String, Value> = item
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            format!(
                r#"module "{module}_{rn}" {{
  source     = "./modules/{module}"
  table_name = local.{kind}_table_name
  item       = {item}
}}
"#,
                module = module,
                rn = item.resource_name,
                kind = kind.as_str(),
                item = value(&Value::Object(attributes)),
            )
        })
        .collect();
    blocks.join("\n")
}

/// Lookup tables and the TEAM application ARN.
pub fn data(tables: &[TeamTableRecord], application_arn: &str) -> String {
    let mut out = String::new();
    for table in tables {
        out.push_str(&format!(
            r#"data "aws_dynamodb_table" "{rn}" {{
  name = {name}
}}

"#,
            rn = table.resource_name,
            name = quote(&table.table_name)
        ));
    }

    let table_name = |kind: TeamTableKind| {
        tables
            .iter()
            .find(|t| t.table_kind == kind)
            .map(|t| format!("data.aws_dynamodb_table.{}.name", t.resource_name))
            .unwrap_or_else(|| "null".to_string())
    };
    out.push_str(&format!(
        r#"locals {{
  approvers_table_name   = {approvers}
  eligibility_table_name = {eligibility}
  team_application_arn   = {arn}
}}
"#,
        approvers = table_name(TeamTableKind::Approvers),
        eligibility = table_name(TeamTableKind::Eligibility),
        arn = quote(application_arn),
    ));
    out
}

/// `accounts_map` and `ou_map`, the OU map ordered by full path.
pub fn locals(accounts: &[AccountRecord], units: &[OrganizationalUnitRecord]) -> String {
    let account_entries: Vec<(String, String)> = accounts
        .iter()
        .map(|a| (a.original_name.clone(), quote(&a.id)))
        .collect();

    let by_path: BTreeMap<&str, &str> = units
        .iter()
        .map(|u| (u.full_path.as_str(), u.id.as_str()))
        .collect();
    let ou_entries: Vec<(String, String)> = by_path
        .into_iter()
        .map(|(path, id)| (path.to_string(), quote(id)))
        .collect();

    format!(
        "{}\n{}",
        locals_map("accounts_map", &account_entries),
        locals_map("ou_map", &ou_entries)
    )
}

/// Principals assigned to the TEAM application.
pub fn application_assignments(record: &TeamApplicationAssignmentsRecord) -> String {
    let mut principals = String::new();
    for detail in &record.assignments {
        principals.push_str(&format!(
            r#"    {key} = {{
      principal_id   = {id}
      principal_type = {kind}
    }}
"#,
            key = quote(&assignment_key(detail.principal_type.as_str(), &detail.principal_name)),
            id = quote(&detail.principal_id),
            kind = quote(detail.principal_type.as_str()),
        ));
    }

    format!(
        r#"module "team_app_assignment" {{
  source          = "./modules/team_app_assignment"
  application_arn = local.team_application_arn

  principals = {{
{principals}  }}
}}
"#,
        principals = principals
    )
}

pub fn application_assignments_import(
    record: &TeamApplicationAssignmentsRecord,
    module_prefix: &str,
) -> String {
    let blocks: Vec<String> = record
        .assignments
        .iter()
        .map(|detail| {
            let key = assignment_key(detail.principal_type.as_str(), &detail.principal_name);
            let to = format!(
                "{}{}aws_ssoadmin_application_assignment.this[{}]",
                module_prefix,
                TEAM_APP_MODULE,
                quote(&key)
            );
            let id = format!(
                "{},{},{}",
                record.application_arn, detail.principal_id, detail.principal_type
            );
            import_block(&to, &id)
        })
        .collect();
    blocks.join("\n")
}

fn assignment_key(principal_type: &str, principal_name: &str) -> String {
    format!("{}{}{}", principal_type, COMPOSITE_SEPARATOR, principal_name)
}
