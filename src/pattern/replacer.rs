use std::sync::OnceLock;

use regex::{Captures, Regex};

fn replacer_tokens() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[(path|\d+)\]").expect("invalid replacer regex"))
}

/// Expand a replacement template for one path-token match.
///
/// `[path]` becomes `rewritten`, `[N]` the N-th capture of the match. Groups that
/// did not participate in the match expand to an empty string.
pub fn apply_replacer(template: &str, rewritten: &str, captures: &Captures<'_>) -> String {
    replacer_tokens()
        .replace_all(template, |token: &Captures<'_>| {
            let name = &token[1];
            if name == "path" {
                return rewritten.to_string();
            }
            name.parse::<usize>()
                .ok()
                .and_then(|index| captures.get(index))
                .map(|group| group.as_str().to_string())
                .unwrap_or_default()
        })
        .into_owned()
}
