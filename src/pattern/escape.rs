use std::sync::OnceLock;

use regex::Regex;

/// Stands in for a content hash between literal fragments of a wildcard path.
///
/// One or more filename-safe characters followed by optional `=` padding, so
/// base64url digests match as well as hex ones.
pub const HASH_PLACEHOLDER: &str = r"[\w-]+=*";

fn wildcard_runs() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*+").expect("invalid wildcard regex"))
}

/// Escape every character that has a meaning in pattern syntax.
pub fn escape_literal(value: &str) -> String {
    regex::escape(value)
}

/// Whether `path` is already a complete `^...$` search pattern.
pub fn is_pre_anchored(path: &str) -> bool {
    path.len() >= 2 && path.starts_with('^') && path.ends_with('$')
}

/// Build an anchored search pattern from a wildcard path.
///
/// Runs of `*` become [`HASH_PLACEHOLDER`], the remaining fragments are escaped.
/// Returns `None` when the path has no non-wildcard symbol.
pub fn wildcard_search_pattern(path: &str) -> Option<String> {
    let fragments: Vec<&str> = wildcard_runs().split(path).collect();
    if fragments.iter().all(|fragment| fragment.is_empty()) {
        return None;
    }

    let body = fragments
        .iter()
        .map(|fragment| escape_literal(fragment))
        .collect::<Vec<_>>()
        .join(HASH_PLACEHOLDER);
    Some(format!("^{body}$"))
}
