//! URL-safe slug generation from a keyword.

use std::sync::OnceLock;

use regex::Regex;

fn non_slug_char_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9\s-]").expect("slug char regex must compile"))
}

fn whitespace_underscore_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s_]+").expect("slug whitespace regex must compile"))
}

fn dash_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-+").expect("slug dash run regex must compile"))
}

const MAX_SLUG_LEN: usize = 100;

/// Derive a URL-safe slug from a keyword.
///
/// `slug(slug(x)) == slug(x)` for every non-empty `x`; empty or
/// punctuation-only input yields `"article"`.
pub fn generate_slug(keyword: &str) -> String {
    let lowered = keyword.trim().to_lowercase();
    let stripped = non_slug_char_re().replace_all(&lowered, "");
    let dashed = whitespace_underscore_re().replace_all(&stripped, "-");
    let collapsed = dash_run_re().replace_all(&dashed, "-");
    let trimmed = collapsed.trim_matches('-');

    if trimmed.is_empty() {
        return "article".to_string();
    }

    if trimmed.len() <= MAX_SLUG_LEN {
        return trimmed.to_string();
    }

    truncate_at_hyphen(trimmed)
}

fn truncate_at_hyphen(slug: &str) -> String {
    let truncated = &slug[..MAX_SLUG_LEN];
    match truncated.rfind('-') {
        Some(last_hyphen) if last_hyphen > MAX_SLUG_LEN / 2 => truncated[..last_hyphen].to_string(),
        _ => truncated.trim_end_matches('-').to_string(),
    }
}

/// Resolve a slug collision by appending `-2`, `-3`, ... until `taken` no
/// longer contains the candidate.
pub fn dedupe_slug(base: &str, taken: &std::collections::HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_keyword() {
        assert_eq!(generate_slug("A"), "a");
        assert_eq!(generate_slug("a b"), "a-b");
    }

    #[test]
    fn strips_punctuation() {
        assert_eq!(generate_slug("A/B!"), "ab");
    }

    #[test]
    fn collapses_whitespace_and_dashes() {
        assert_eq!(generate_slug("Best   Coffee -- Makers"), "best-coffee-makers");
    }

    #[test]
    fn empty_or_punctuation_only_yields_article() {
        assert_eq!(generate_slug(""), "article");
        assert_eq!(generate_slug("!!!"), "article");
        assert_eq!(generate_slug("   "), "article");
    }

    #[test]
    fn idempotent() {
        let cases = ["A", "a b", "A/B!", "Best Coffee Makers!!", "", "   ", "???"];
        for c in cases {
            let once = generate_slug(c);
            let twice = generate_slug(&once);
            assert_eq!(once, twice, "not idempotent for {c:?}");
        }
    }

    #[test]
    fn truncates_long_slug_at_word_boundary() {
        let long = "word ".repeat(40);
        let slug = generate_slug(&long);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn dedupe_appends_suffix() {
        let mut taken = std::collections::HashSet::new();
        taken.insert("a-b".to_string());
        assert_eq!(dedupe_slug("a-b", &taken), "a-b-2");
        taken.insert("a-b-2".to_string());
        assert_eq!(dedupe_slug("a-b", &taken), "a-b-3");
    }

    #[test]
    fn dedupe_no_collision_returns_base() {
        let taken = std::collections::HashSet::new();
        assert_eq!(dedupe_slug("a-b", &taken), "a-b");
    }
}
