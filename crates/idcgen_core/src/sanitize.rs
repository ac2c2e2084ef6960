//! Resource name sanitization.

use std::sync::OnceLock;

use regex::Regex;

/// Separator used when joining participant names into a composite name.
pub const COMPOSITE_SEPARATOR: &str = "___";

fn invalid_characters() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("sanitizer pattern is valid"))
}

/// Convert an arbitrary display name into a safe resource identifier.
///
/// The input is trimmed, prefixed with `_` when it does not start with an
/// ASCII letter or underscore, and every character outside `[a-zA-Z0-9_-]`
/// is replaced by `_`. Case and Unicode are otherwise left alone.
pub fn sanitize_name(name: &str) -> String {
    let trimmed = name.trim();
    let starts_ok = trimmed
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    let prefixed = if starts_ok {
        trimmed.to_string()
    } else {
        format!("_{}", trimmed)
    };

    invalid_characters().replace_all(&prefixed, "_").into_owned()
}

/// Join participant names with the composite separator and re-sanitize.
pub fn composite_name(parts: &[&str]) -> String {
    sanitize_name(&parts.join(COMPOSITE_SEPARATOR))
}

/// Check whether a string is already a valid resource identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "   ",
        "Eng Team",
        "jane.doe",
        "jane.doe@example.com",
        "123abc",
        "-leading-dash",
        "_already_ok",
        "AdministratorAccess",
        "  padded name  ",
        "Ünïcödé Grüppe",
        "日本語",
        "tab\tand\nnewline",
        "a/b\\c:d*e?f\"g<h>i|j",
        "already-valid_name-01",
        "___",
        "emoji 🚀 launch",
    ];

    #[test]
    fn test_sanitize_examples() {
        assert_eq!(sanitize_name("Eng Team"), "Eng_Team");
        assert_eq!(sanitize_name("jane.doe"), "jane_doe");
        assert_eq!(sanitize_name("123abc"), "_123abc");
        assert_eq!(sanitize_name("-x"), "_-x");
        assert_eq!(sanitize_name("  padded name  "), "padded_name");
        assert_eq!(sanitize_name(""), "_");
        assert_eq!(sanitize_name("é"), "__");
    }

    #[test]
    fn test_output_is_always_valid_identifier() {
        for sample in SAMPLES {
            let sanitized = sanitize_name(sample);
            assert!(
                is_valid_identifier(&sanitized),
                "{:?} sanitized to invalid {:?}",
                sample,
                sanitized
            );
        }
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for sample in SAMPLES {
            let once = sanitize_name(sample);
            assert_eq!(sanitize_name(&once), once);
        }
        assert_eq!(sanitize_name("already-valid_name-01"), "already-valid_name-01");
    }

    #[test]
    fn test_sanitize_is_deterministic() {
        for sample in SAMPLES {
            assert_eq!(sanitize_name(sample), sanitize_name(sample));
        }
    }

    #[test]
    fn test_composite_name() {
        assert_eq!(
            composite_name(&["Eng_Team", "jane_doe"]),
            "Eng_Team___jane_doe"
        );
        assert_eq!(composite_name(&["1st", "x y"]), "_1st___x_y");
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("abc"));
        assert!(is_valid_identifier("_1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("a.b"));
    }
}
