//! Permission sets, their policies and the managed policies they reference.

use idcgen_core::{AttachmentMap, Importable, ManagedPolicyRecord, PermissionSetRecord};

use super::{import_block, import_blocks, locals_map, quote, string_list};
use crate::error::TemplateResult;

/// Permission set resources with their inline policies and customer-managed
/// policy attachments. Every enrichment field must be present.
pub fn permission_sets(records: &[PermissionSetRecord]) -> TemplateResult<String> {
    let mut blocks = Vec::new();
    for ps in records {
        blocks.push(permission_set(ps)?);

        if ps.require_inline_flag()? {
            blocks.push(format!(
                r#"resource "aws_ssoadmin_permission_set_inline_policy" "{rn}" {{
  inline_policy      = file("${{path.module}}/inline_policies/{rn}.json")
  instance_arn       = local.instance_arn
  permission_set_arn = aws_ssoadmin_permission_set.{rn}.arn
}}
"#,
                rn = ps.resource_name
            ));
        }

        for policy in ps.require_customer_managed_policies()? {
            blocks.push(format!(
                r#"resource "aws_ssoadmin_customer_managed_policy_attachment" "{rn}___{policy_rn}" {{
  instance_arn       = local.instance_arn
  permission_set_arn = aws_ssoadmin_permission_set.{rn}.arn

  customer_managed_policy_reference {{
    name = {name}
    path = {path}
  }}
}}
"#,
                rn = ps.resource_name,
                policy_rn = idcgen_core::sanitize_name(&policy.name),
                name = quote(&policy.name),
                path = quote(&policy.path),
            ));
        }
    }
    Ok(blocks.join("\n"))
}

fn permission_set(ps: &PermissionSetRecord) -> TemplateResult<String> {
    let mut block = format!(
        "resource \"aws_ssoadmin_permission_set\" \"{}\" {{\n  name             = {}\n",
        ps.resource_name,
        quote(&ps.original_name)
    );
    if let Some(description) = &ps.description {
        block.push_str(&format!("  description      = {}\n", quote(description)));
    }
    block.push_str("  instance_arn     = local.instance_arn\n");
    block.push_str(&format!(
        "  session_duration = {}\n",
        quote(&ps.session_duration)
    ));
    if let Some(relay_state) = &ps.relay_state {
        block.push_str(&format!("  relay_state      = {}\n", quote(relay_state)));
    }

    let tags = ps.require_tags()?;
    if !tags.is_empty() {
        block.push_str("\n  tags = {\n");
        for tag in tags {
            block.push_str(&format!("    {} = {}\n", quote(&tag.key), quote(&tag.value)));
        }
        block.push_str("  }\n");
    }
    block.push_str("}\n");
    Ok(block)
}

/// `permission_sets_map`: resource name to permission set ARN.
pub fn permission_sets_map(records: &[PermissionSetRecord]) -> String {
    let entries: Vec<(String, String)> = records
        .iter()
        .map(|ps| {
            (
                ps.resource_name.clone(),
                format!("aws_ssoadmin_permission_set.{}.arn", ps.resource_name),
            )
        })
        .collect();
    locals_map("permission_sets_map", &entries)
}

pub fn permission_sets_import(records: &[PermissionSetRecord]) -> String {
    import_blocks(records.iter().map(|ps| (ps.import_to(), ps.import_id().to_string())))
}

/// Imports of inline policies, for permission sets that carry one.
pub fn inline_policies_import(
    records: &[PermissionSetRecord],
    module_prefix: &str,
) -> TemplateResult<String> {
    let mut blocks = Vec::new();
    for ps in records {
        if !ps.require_inline_flag()? {
            continue;
        }
        let to = format!(
            "{}aws_ssoadmin_permission_set_inline_policy.{}",
            module_prefix, ps.resource_name
        );
        blocks.push(import_block(&to, ps.import_id()));
    }
    Ok(blocks.join("\n"))
}

/// `managed_policy_attachments_map`, keyed `<permission set>___<policy>`.
pub fn managed_policy_attachments_map(attachments: &AttachmentMap) -> String {
    let entries: Vec<(String, String)> = attachments
        .values()
        .flatten()
        .map(|a| {
            (
                a.key(),
                format!(
                    "{{\n      permission_set = {}\n      policy_name    = {}\n    }}",
                    quote(&a.permission_set_name),
                    quote(&a.policy_name)
                ),
            )
        })
        .collect();
    locals_map("managed_policy_attachments_map", &entries)
}

pub fn managed_policy_attachments_import(attachments: &AttachmentMap, module_prefix: &str) -> String {
    let blocks: Vec<String> = attachments
        .values()
        .flatten()
        .map(|a| import_block(&a.import_to(module_prefix), &a.import_id()))
        .collect();
    blocks.join("\n")
}

/// Managed policy names and their data sources.
pub fn managed_policies_list(records: &[ManagedPolicyRecord]) -> String {
    let names: Vec<String> = records.iter().map(|p| p.policy_name.clone()).collect();
    format!(
        r#"locals {{
  managed_policies_list = {names}
}}

data "aws_iam_policy" "managed" {{
  for_each = toset(local.managed_policies_list)
  name     = each.value
}}
"#,
        names = string_list(&names, 2)
    )
}

/// `managed_policies_map` resolved through the policy data sources.
pub fn managed_policies_map_data() -> String {
    r#"locals {
  managed_policies_map = {
    for name, policy in data.aws_iam_policy.managed : name => policy.arn
  }
}
"#
    .to_string()
}

/// `managed_policies_map` with the ARNs written out.
pub fn managed_policies_map_static(records: &[ManagedPolicyRecord]) -> String {
    let entries: Vec<(String, String)> = records
        .iter()
        .map(|p| (p.policy_name.clone(), quote(&p.arn)))
        .collect();
    locals_map("managed_policies_map", &entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use idcgen_core::{CustomerManagedPolicyRef, ManagedAttachment, Tag};

    fn permission_set(inline: bool) -> PermissionSetRecord {
        PermissionSetRecord {
            permission_set_arn: "arn:ps-1".to_string(),
            instance_arn: "arn:ins".to_string(),
            description: Some("Admins".to_string()),
            session_duration: "PT4H".to_string(),
            relay_state: None,
            resource_name: "AdminAccess".to_string(),
            original_name: "AdminAccess".to_string(),
            import_id: "arn:ps-1,arn:ins".to_string(),
            import_to: "aws_ssoadmin_permission_set.AdminAccess".to_string(),
            has_inline_policy: Some(inline),
            managed_policies: Some(vec![]),
            customer_managed_policies: Some(vec![CustomerManagedPolicyRef {
                name: "billing-read".to_string(),
                path: "/".to_string(),
            }]),
            tags: Some(vec![Tag {
                key: "team".to_string(),
                value: "platform".to_string(),
            }]),
        }
    }

    fn policy(name: &str) -> ManagedPolicyRecord {
        ManagedPolicyRecord {
            policy_name: name.to_string(),
            arn: format!("arn:aws:iam::aws:policy/{}", name),
            policy_id: None,
            default_version_id: None,
            path: None,
            resource_name: name.to_string(),
        }
    }

    #[test]
    fn test_permission_set_with_inline_and_customer_policy() {
        let out = permission_sets(&[permission_set(true)]).unwrap();
        assert!(out.contains("resource \"aws_ssoadmin_permission_set\" \"AdminAccess\""));
        assert!(out.contains("session_duration = \"PT4H\""));
        assert!(out.contains("\"team\" = \"platform\""));
        assert!(out.contains("file(\"${path.module}/inline_policies/AdminAccess.json\")"));
        assert!(out.contains("\"AdminAccess___billing-read\""));
    }

    #[test]
    fn test_missing_enrichment_is_an_error() {
        let mut ps = permission_set(false);
        ps.tags = None;
        let err = permission_sets(&[ps]).unwrap_err();
        assert!(err.to_string().contains("Tags"));
    }

    #[test]
    fn test_inline_import_only_for_inline_sets() {
        let mut without = permission_set(false);
        without.resource_name = "ReadOnly".to_string();
        let out = inline_policies_import(&[permission_set(true), without], "module.permission_sets.")
            .unwrap();
        assert_eq!(
            out,
            "import {\n  to = module.permission_sets.aws_ssoadmin_permission_set_inline_policy.AdminAccess\n  id = \"arn:ps-1,arn:ins\"\n}\n"
        );
    }

    #[test]
    fn test_attachment_map() {
        let mut map = AttachmentMap::new();
        map.insert(
            "AdminAccess".to_string(),
            vec![ManagedAttachment {
                permission_set_name: "AdminAccess".to_string(),
                permission_set_arn: "arn:ps-1".to_string(),
                instance_arn: "arn:ins".to_string(),
                policy_name: "AdministratorAccess".to_string(),
                policy_arn: "arn:aws:iam::aws:policy/AdministratorAccess".to_string(),
            }],
        );
        let out = managed_policy_attachments_map(&map);
        assert!(out.contains("\"AdminAccess___AdministratorAccess\" = {"));
        assert!(out.contains("policy_name    = \"AdministratorAccess\""));

        let imports = managed_policy_attachments_import(&map, "");
        assert!(imports.contains(
            "to = aws_ssoadmin_managed_policy_attachment.controller[\"AdminAccess___AdministratorAccess\"]"
        ));
    }

    #[test]
    fn test_managed_policy_forms() {
        let policies = vec![policy("AdministratorAccess"), policy("ReadOnlyAccess")];
        let list = managed_policies_list(&policies);
        assert!(list.contains("managed_policies_list = [\n    \"AdministratorAccess\",\n"));
        assert!(list.contains("data \"aws_iam_policy\" \"managed\""));

        let map = managed_policies_map_static(&policies);
        assert!(map.contains(
            "\"ReadOnlyAccess\" = \"arn:aws:iam::aws:policy/ReadOnlyAccess\""
        ));
        assert!(managed_policies_map_data().contains("data.aws_iam_policy.managed"));
    }
}
