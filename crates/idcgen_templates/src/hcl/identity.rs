//! Identity store users, groups and memberships.

use idcgen_core::{GroupMembershipRecord, GroupRecord, Importable, MembershipMap, UserRecord};

use super::{import_blocks, locals_map, quote, string_list};

/// `aws_identitystore_user` resources for directory-managed users.
pub fn users(users: &[UserRecord]) -> String {
    let blocks: Vec<String> = users
        .iter()
        .map(|user| {
            let display_name = user.display_name.as_deref().unwrap_or(&user.user_name);
            let given_name = user.given_name.as_deref().unwrap_or(&user.user_name);
            let family_name = user.family_name.as_deref().unwrap_or(&user.user_name);
            let mut block = format!(
                r#"resource "aws_identitystore_user" "{rn}" {{
  identity_store_id = local.identity_store_id
  user_name         = {user_name}
  display_name      = {display_name}

  name {{
    given_name  = {given_name}
    family_name = {family_name}
  }}
"#,
                rn = user.resource_name,
                user_name = quote(&user.user_name),
                display_name = quote(display_name),
                given_name = quote(given_name),
                family_name = quote(family_name),
            );
            if let Some(email) = &user.email {
                block.push_str(&format!(
                    r#"
  emails {{
    value   = {}
    primary = true
  }}
"#,
                    quote(email)
                ));
            }
            block.push_str("}\n");
            block
        })
        .collect();
    blocks.join("\n")
}

/// Lookups of SCIM-provisioned users, which stay owned by the identity provider.
pub fn users_scim(users: &[UserRecord]) -> String {
    lookups("aws_identitystore_user", "UserName", users.iter().map(|u| (&u.resource_name, &u.user_name)))
}

/// `users_map`: user name to user id, from the lookup or the resource.
pub fn users_map(users: &[UserRecord]) -> String {
    let entries: Vec<(String, String)> = users
        .iter()
        .map(|u| {
            let source = if u.scim { "data." } else { "" };
            (
                u.original_name.clone(),
                format!("{}aws_identitystore_user.{}.user_id", source, u.resource_name),
            )
        })
        .collect();
    locals_map("users_map", &entries)
}

pub fn users_import(users: &[UserRecord]) -> String {
    import_blocks(users.iter().map(|u| (u.import_to(), u.import_id().to_string())))
}

/// `aws_identitystore_group` resources for directory-managed groups.
pub fn groups(groups: &[GroupRecord]) -> String {
    let blocks: Vec<String> = groups
        .iter()
        .map(|group| {
            let mut block = format!(
                r#"resource "aws_identitystore_group" "{rn}" {{
  identity_store_id = local.identity_store_id
  display_name      = {display_name}
"#,
                rn = group.resource_name,
                display_name = quote(&group.display_name),
            );
            if let Some(description) = &group.description {
                block.push_str(&format!("  description       = {}\n", quote(description)));
            }
            block.push_str("}\n");
            block
        })
        .collect();
    blocks.join("\n")
}

pub fn groups_scim(groups: &[GroupRecord]) -> String {
    lookups(
        "aws_identitystore_group",
        "DisplayName",
        groups.iter().map(|g| (&g.resource_name, &g.display_name)),
    )
}

/// `groups_map`: display name to group id.
pub fn groups_map(groups: &[GroupRecord]) -> String {
    let entries: Vec<(String, String)> = groups
        .iter()
        .map(|g| {
            let source = if g.scim { "data." } else { "" };
            (
                g.original_name.clone(),
                format!("{}aws_identitystore_group.{}.group_id", source, g.resource_name),
            )
        })
        .collect();
    locals_map("groups_map", &entries)
}

pub fn groups_import(groups: &[GroupRecord]) -> String {
    import_blocks(groups.iter().map(|g| (g.import_to(), g.import_id().to_string())))
}

/// Memberships of directory-managed groups and the resource managing them.
/// Keys of the `for_each` are `<group>___<user>` in original names.
pub fn group_memberships_map(map: &MembershipMap) -> String {
    format!(
        r#"{members}
locals {{
  group_memberships = merge([
    for group, users in local.group_memberships_map : {{
      for user in users : "${{group}}___${{user}}" => {{
        group = group
        user  = user
      }}
    }}
  ]...)
}}

resource "aws_identitystore_group_membership" "controller" {{
  for_each          = local.group_memberships
  identity_store_id = local.identity_store_id
  group_id          = local.groups_map[each.value.group]
  member_id         = local.users_map[each.value.user]
}}
"#,
        members = membership_locals("group_memberships_map", map)
    )
}

/// Memberships of SCIM-provisioned groups, for reference only.
pub fn group_memberships_map_scim(map: &MembershipMap) -> String {
    membership_locals("group_memberships_map_scim", map)
}

pub fn group_memberships_import(memberships: &[GroupMembershipRecord]) -> String {
    import_blocks(
        memberships
            .iter()
            .map(|m| (m.import_to(), m.import_id().to_string())),
    )
}

fn membership_locals(name: &str, map: &MembershipMap) -> String {
    let entries: Vec<(String, String)> = map
        .iter()
        .map(|(group, users)| (group.clone(), string_list(users, 4)))
        .collect();
    locals_map(name, &entries)
}

fn lookups<'a>(
    resource_type: &str,
    attribute: &str,
    items: impl Iterator<Item = (&'a String, &'a String)>,
) -> String {
    let blocks: Vec<String> = items
        .map(|(rn, value)| {
            format!(
                r#"data "{resource_type}" "{rn}" {{
  identity_store_id = local.identity_store_id

  alternate_identifier {{
    unique_attribute {{
      attribute_path  = "{attribute}"
      attribute_value = {value}
    }}
  }}
}}
"#,
                resource_type = resource_type,
                rn = rn,
                attribute = attribute,
                value = quote(value),
            )
        })
        .collect();
    blocks.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, scim: bool) -> UserRecord {
        let rn = idcgen_core::sanitize_name(name);
        UserRecord {
            user_id: format!("id-{}", rn),
            user_name: name.to_string(),
            display_name: None,
            given_name: None,
            family_name: None,
            email: Some(format!("{}@example.com", rn)),
            scim,
            import_to: format!("aws_identitystore_user.{}", rn),
            import_id: format!("d-1/id-{}", rn),
            resource_name: rn,
            original_name: name.to_string(),
        }
    }

    #[test]
    fn test_users_map_picks_source_by_scim() {
        let out = users_map(&[user("jane.doe", true), user("john smith", false)]);
        assert!(out.contains("\"jane.doe\" = data.aws_identitystore_user.jane_doe.user_id"));
        assert!(out.contains("\"john smith\" = aws_identitystore_user.john_smith.user_id"));
    }

    #[test]
    fn test_users_resource() {
        let out = users(&[user("john smith", false)]);
        assert!(out.starts_with("resource \"aws_identitystore_user\" \"john_smith\" {"));
        assert!(out.contains("user_name         = \"john smith\""));
        assert!(out.contains("value   = \"john_smith@example.com\""));
        assert!(out.ends_with("}\n"));
    }

    #[test]
    fn test_scim_lookup() {
        let out = users_scim(&[user("jane.doe", true)]);
        assert!(out.contains("data \"aws_identitystore_user\" \"jane_doe\""));
        assert!(out.contains("attribute_path  = \"UserName\""));
        assert!(out.contains("attribute_value = \"jane.doe\""));
    }

    #[test]
    fn test_membership_map_keys() {
        let mut map = MembershipMap::new();
        map.insert("Eng Team".to_string(), vec!["jane.doe".to_string()]);
        let out = group_memberships_map(&map);
        assert!(out.contains("\"Eng Team\" = [\n      \"jane.doe\",\n    ]"));
        assert!(out.contains("\"${group}___${user}\""));
        assert!(out.contains("resource \"aws_identitystore_group_membership\" \"controller\""));
    }
}
