//! Builders for data-driven Terraform files.
//!
//! Each builder is a pure function from normalized records to file content.
//! Output is deterministic: records arrive in store order and every map is
//! emitted with sorted keys.

pub mod assignments;
pub mod identity;
pub mod permissions;
pub mod root;
pub mod team;

use serde_json::Value;

/// HCL string literal for `s`, with template sequences escaped.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Multi-line list of quoted strings at the given indentation.
pub fn string_list(items: &[String], indent: usize) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    let pad = " ".repeat(indent + 2);
    let mut out = String::from("[\n");
    for item in items {
        out.push_str(&format!("{}{},\n", pad, quote(item)));
    }
    out.push_str(&" ".repeat(indent));
    out.push(']');
    out
}

/// Single-line HCL expression for a JSON value.
pub fn value(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(value).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(fields) => {
            if fields.is_empty() {
                return "{}".to_string();
            }
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            let inner: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{} = {}", quote(k), value(&fields[k])))
                .collect();
            format!("{{ {} }}", inner.join(", "))
        }
    }
}

/// One `import` block.
pub fn import_block(to: &str, id: &str) -> String {
    format!(
        r#"import {{
  to = {to}
  id = {id}
}}
"#,
        to = to,
        id = quote(id)
    )
}

/// `import` blocks separated by blank lines.
pub fn import_blocks<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> String {
    pairs
        .into_iter()
        .map(|(to, id)| import_block(to, &id))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `locals { name = { "key" = expr ... } }` for pre-sorted entries.
pub fn locals_map(name: &str, entries: &[(String, String)]) -> String {
    let mut out = format!("locals {{\n  {} = {{\n", name);
    for (key, expr) in entries {
        out.push_str(&format!("    {} = {}\n", quote(key), expr));
    }
    out.push_str("  }\n}\n");
    out
}
