//! Account assignments.

use idcgen_core::{AccountAssignmentRecord, AccountRecord, AssignmentTree, Importable};

use super::{import_blocks, locals_map, quote, string_list};

pub fn account_assignments_import(records: &[AccountAssignmentRecord]) -> String {
    import_blocks(records.iter().map(|a| (a.import_to(), a.import_id().to_string())))
}

/// `account_assignments_map`: account, permission set, principal type, then
/// principal names.
pub fn account_assignments_map(tree: &AssignmentTree) -> String {
    let mut out = String::from("locals {\n  account_assignments_map = {\n");
    for (account, permission_sets) in tree {
        out.push_str(&format!("    {} = {{\n", quote(account)));
        for (permission_set, principals) in permission_sets {
            out.push_str(&format!("      {} = {{\n", quote(permission_set)));
            for (principal_type, names) in principals {
                out.push_str(&format!(
                    "        {} = {}\n",
                    quote(principal_type.as_str()),
                    string_list(names, 8)
                ));
            }
            out.push_str("      }\n");
        }
        out.push_str("    }\n");
    }
    out.push_str("  }\n}\n");
    out
}

/// `accounts_map`: account name to account id.
pub fn accounts_map(accounts: &[AccountRecord]) -> String {
    let entries: Vec<(String, String)> = accounts
        .iter()
        .map(|a| (a.original_name.clone(), quote(&a.id)))
        .collect();
    locals_map("accounts_map", &entries)
}
