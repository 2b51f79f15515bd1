//! Wildcard matching for path and domain patterns.
//!
//! Patterns use a single wildcard: `*` matches any run of characters, with
//! no directory semantics. A pattern compiles to an anchored regex by
//! escaping every regex metacharacter and then widening `*` to `.*`.
//! Intentionally simpler than shell globbing: `**`, `?`, and character
//! classes have no special meaning, and substituting a full glob engine
//! would change which patterns match.

use regex::Regex;

/// Compile a wildcard pattern to an anchored regex.
fn compile(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern).replace("\\*", ".*");
    Regex::new(&format!("^{escaped}$")).ok()
}

/// Whether `path` matches the wildcard `pattern`.
#[must_use]
pub fn path_matches(pattern: &str, path: &str) -> bool {
    compile(pattern).is_some_and(|re| re.is_match(path))
}

/// Whether any pattern in `patterns` matches `path`.
#[must_use]
pub fn any_path_matches(patterns: &[String], path: &str) -> bool {
    patterns.iter().any(|p| path_matches(p, path))
}

/// Whether `domain` matches the wildcard `pattern`.
///
/// In addition to plain wildcard matching, a subdomain pattern `*.x.y`
/// matches the bare apex `x.y`.
#[must_use]
pub fn domain_matches(pattern: &str, domain: &str) -> bool {
    if path_matches(pattern, domain) {
        return true;
    }
    pattern
        .strip_prefix("*.")
        .is_some_and(|apex| apex == domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        assert!(path_matches("src/main.rs", "src/main.rs"));
        assert!(!path_matches("src/main.rs", "src/lib.rs"));
    }

    #[test]
    fn test_star_spans_directories() {
        // No directory semantics: a single star crosses separators.
        assert!(path_matches("src/*", "src/deep/nested.rs"));
        assert!(path_matches("*.txt", "notes/readme.txt"));
    }

    #[test]
    fn test_star_in_the_middle() {
        assert!(path_matches("logs/*.log", "logs/2024-01-01.log"));
        assert!(!path_matches("logs/*.log", "logs/2024-01-01.txt"));
    }

    #[test]
    fn test_metacharacters_are_literal() {
        assert!(path_matches("a.b", "a.b"));
        assert!(!path_matches("a.b", "axb"));
        assert!(path_matches("file(1)*", "file(1).txt"));
        assert!(!path_matches("file?1", "file1"));
    }

    #[test]
    fn test_match_is_anchored() {
        assert!(!path_matches("main.rs", "src/main.rs"));
        assert!(!path_matches("src", "src/main.rs"));
    }

    #[test]
    fn test_bare_star_matches_everything() {
        assert!(path_matches("*", ""));
        assert!(path_matches("*", "anything/at/all"));
    }

    #[test]
    fn test_any_path_matches() {
        let patterns = vec!["*.secret".to_string(), "vault/*".to_string()];
        assert!(any_path_matches(&patterns, "api.secret"));
        assert!(any_path_matches(&patterns, "vault/key"));
        assert!(!any_path_matches(&patterns, "notes.txt"));
    }

    #[test]
    fn test_domain_wildcard() {
        assert!(domain_matches("*.example.com", "api.example.com"));
        assert!(domain_matches("*.example.com", "a.b.example.com"));
        assert!(!domain_matches("*.example.com", "example.org"));
    }

    #[test]
    fn test_subdomain_pattern_matches_apex() {
        assert!(domain_matches("*.example.com", "example.com"));
    }

    #[test]
    fn test_domain_star() {
        assert!(domain_matches("*", "anything.example.com"));
    }
}
