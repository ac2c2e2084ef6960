//! Root module wiring for single-state layouts.

use idcgen_core::Component;

/// `main.tf` calling one child module per active component.
pub fn main_tf(team_enabled: bool) -> String {
    let blocks: Vec<String> = Component::active(team_enabled)
        .into_iter()
        .map(module_block)
        .collect();
    blocks.join("\n")
}

fn module_block(component: Component) -> String {
    let inputs: &[(&str, &str)] = match component {
        Component::PermissionSets => &[("managed_policies_map", "managed_policies")],
        Component::AccountAssignments => &[
            ("users_map", "identity_store"),
            ("groups_map", "identity_store"),
            ("permission_sets_map", "permission_sets"),
        ],
        _ => &[],
    };
    let width = inputs
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0)
        .max("source".len());

    let mut out = format!(
        "module \"{name}\" {{\n  {:<width$} = \"./{name}\"\n",
        "source",
        name = component.as_str(),
        width = width
    );
    for (input, from) in inputs {
        out.push_str(&format!(
            "  {:<width$} = module.{}.{}\n",
            input,
            from,
            input,
            width = width
        ));
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_tf_wires_outputs() {
        let out = main_tf(false);
        assert!(out.contains("module \"identity_store\" {\n  source = \"./identity_store\"\n}\n"));
        assert!(out.contains(
            "  permission_sets_map = module.permission_sets.permission_sets_map\n"
        ));
        assert!(out.contains(
            "  managed_policies_map = module.managed_policies.managed_policies_map\n"
        ));
        assert!(!out.contains("module \"team\""));
    }

    #[test]
    fn test_main_tf_with_team() {
        assert!(main_tf(true).contains("module \"team\" {\n  source = \"./team\"\n}\n"));
    }
}
