use std::sync::OnceLock;

use regex::Regex;

fn non_request_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            vec![
                Regex::new(r"^//").expect("invalid protocol-relative regex"),
                Regex::new(r"^/").expect("invalid root-relative regex"),
                Regex::new(r"^#").expect("invalid fragment regex"),
                Regex::new(r"^[{$]").expect("invalid template expression regex"),
            ]
        })
        .as_slice()
}

fn scheme_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").expect("invalid scheme regex"))
}

fn windows_drive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z]:[\\/]").expect("invalid drive regex"))
}

fn absolute_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^/|^\w+://").expect("invalid absolute url regex"))
}

/// Whether a token refers to a file the bundler can resolve.
///
/// Scheme URLs (`http:`, `data:`, `mailto:` ...), protocol-relative and root
/// absolute paths, fragments and template expressions are left to the browser.
/// Windows drive paths still count as requests.
pub fn is_url_request(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    if windows_drive_pattern().is_match(value) {
        return true;
    }
    if scheme_pattern().is_match(value) {
        return false;
    }
    !non_request_patterns()
        .iter()
        .any(|pattern| pattern.is_match(value))
}

/// Convert a url-ish token into a module request.
///
/// `~module/file` addresses a package, `./` and `../` stay relative, bare
/// relative paths gain a `./` prefix.
pub fn url_to_request(value: &str) -> String {
    if let Some(module) = value.strip_prefix('~') {
        return module.to_string();
    }
    if value.starts_with("./")
        || value.starts_with("../")
        || windows_drive_pattern().is_match(value)
        || value.starts_with('/')
    {
        return value.to_string();
    }
    format!("./{value}")
}

/// Whether a rewritten path must be used as-is instead of being prefixed with a public path.
pub fn is_absolute_url(value: &str) -> bool {
    absolute_url_pattern().is_match(value)
}

/// Prefix `path` with `public_path` unless it is already absolute.
pub fn prepend_public_path(public_path: &str, path: &str) -> String {
    if is_absolute_url(path) {
        path.to_string()
    } else {
        format!("{public_path}{path}")
    }
}

/// Append a trailing `/` to a non-empty public path.
pub fn normalise_public_path(public_path: &str) -> String {
    if public_path.is_empty() || public_path.ends_with('/') {
        public_path.to_string()
    } else {
        format!("{public_path}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_scheme_urls() {
        assert!(!is_url_request("https://example.com/a.png"));
        assert!(!is_url_request("HTTP://example.com"));
        assert!(!is_url_request("data:image/png;base64,abc"));
        assert!(!is_url_request("mailto:user@example.com"));
    }

    #[test]
    fn skips_browser_only_references() {
        assert!(!is_url_request("//cdn.example.com/a.js"));
        assert!(!is_url_request("/static/a.png"));
        assert!(!is_url_request("#top"));
        assert!(!is_url_request("{{ asset }}"));
        assert!(!is_url_request("${asset}"));
        assert!(!is_url_request(""));
    }

    #[test]
    fn keeps_relative_and_drive_paths() {
        assert!(is_url_request("images/photo.png"));
        assert!(is_url_request("./a.png"));
        assert!(is_url_request("../shared/b.css"));
        assert!(is_url_request("~pkg/c.svg"));
        assert!(is_url_request("C:\\assets\\d.png"));
    }

    #[test]
    fn converts_urls_to_requests() {
        assert_eq!(url_to_request("a.png"), "./a.png");
        assert_eq!(url_to_request("./a.png"), "./a.png");
        assert_eq!(url_to_request("../a.png"), "../a.png");
        assert_eq!(url_to_request("~pkg/a.png"), "pkg/a.png");
    }

    #[test]
    fn prepends_public_path_to_relative_results_only() {
        assert_eq!(prepend_public_path("/static/", "a-5f3c.png"), "/static/a-5f3c.png");
        assert_eq!(prepend_public_path("/static/", "/abs/a.png"), "/abs/a.png");
        assert_eq!(
            prepend_public_path("/static/", "https://cdn/a.png"),
            "https://cdn/a.png"
        );
    }

    #[test]
    fn normalises_public_path_suffix() {
        assert_eq!(normalise_public_path(""), "");
        assert_eq!(normalise_public_path("/public"), "/public/");
        assert_eq!(normalise_public_path("/public/"), "/public/");
    }
}
