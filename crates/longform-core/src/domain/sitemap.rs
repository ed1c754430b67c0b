//! Sitemap data model (C3 output).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Closed taxonomy of URL labels a sitemap crawl classifies URLs into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlLabel {
    /// Blog/article content.
    Blog,
    /// Product page.
    Product,
    /// Service page.
    Service,
    /// Documentation.
    Docs,
    /// Downloadable resource or gated content.
    Resource,
    /// Corporate/about pages.
    Company,
    /// Legal pages (privacy, terms).
    Legal,
    /// Contact pages.
    Contact,
    /// Marketing landing pages.
    Landing,
    /// Interactive tool/calculator page.
    Tool,
    /// Unclassified, or the AI classifier is disabled/unavailable.
    Other,
}

/// One classified sitemap entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapEntry {
    /// The canonicalized URL.
    pub url: String,
    /// Its single label.
    pub label: UrlLabel,
}

/// The output of a sitemap crawl: a labelled, deduplicated URL set.
///
/// Invariant: labels partition the URL set — every URL has exactly one
/// label, enforced by storing entries in a map keyed by canonical URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitemapData {
    entries: BTreeMap<String, UrlLabel>,
}

impl SitemapData {
    /// An empty result, used when the crawl degrades (C3 failure policy).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert a classified URL, overwriting any previous label for the same
    /// canonical URL (keeping the partition invariant — one label per URL).
    pub fn insert(&mut self, url: String, label: UrlLabel) {
        self.entries.insert(url, label);
    }

    /// Number of classified URLs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the sitemap carries no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in canonical-URL order.
    pub fn iter(&self) -> impl Iterator<Item = SitemapEntry> + '_ {
        self.entries.iter().map(|(url, label)| SitemapEntry {
            url: url.clone(),
            label: *label,
        })
    }

    /// URLs carrying a specific label, e.g. `Blog` for internal-linking
    /// candidates handed to the article generator (C7).
    pub fn urls_with_label(&self, label: UrlLabel) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, l)| **l == label)
            .map(|(u, _)| u.clone())
            .collect()
    }

    /// Summary counts per label.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for label in self.entries.values() {
            *counts.entry(label_name(*label)).or_insert(0) += 1;
        }
        counts
    }

    /// Assert the partition invariant holds: no URL is present twice with
    /// differing labels. Always true by construction (a `BTreeMap` cannot
    /// hold two entries for the same key) — kept as an explicit, testable
    /// property per spec invariant #3.
    pub fn check_partition(&self) -> bool {
        let urls: HashSet<&String> = self.entries.keys().collect();
        urls.len() == self.entries.len()
    }
}

fn label_name(label: UrlLabel) -> &'static str {
    match label {
        UrlLabel::Blog => "blog",
        UrlLabel::Product => "product",
        UrlLabel::Service => "service",
        UrlLabel::Docs => "docs",
        UrlLabel::Resource => "resource",
        UrlLabel::Company => "company",
        UrlLabel::Legal => "legal",
        UrlLabel::Contact => "contact",
        UrlLabel::Landing => "landing",
        UrlLabel::Tool => "tool",
        UrlLabel::Other => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_holds_for_distinct_urls() {
        let mut data = SitemapData::empty();
        data.insert("https://x.com/blog/a".into(), UrlLabel::Blog);
        data.insert("https://x.com/products/b".into(), UrlLabel::Product);
        assert!(data.check_partition());
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn reinserting_same_url_overwrites_label_not_duplicates() {
        let mut data = SitemapData::empty();
        data.insert("https://x.com/a".into(), UrlLabel::Other);
        data.insert("https://x.com/a".into(), UrlLabel::Blog);
        assert_eq!(data.len(), 1);
        assert_eq!(data.urls_with_label(UrlLabel::Blog).len(), 1);
    }

    #[test]
    fn urls_with_label_filters_correctly() {
        let mut data = SitemapData::empty();
        data.insert("https://x.com/blog/a".into(), UrlLabel::Blog);
        data.insert("https://x.com/blog/b".into(), UrlLabel::Blog);
        data.insert("https://x.com/legal/terms".into(), UrlLabel::Legal);
        assert_eq!(data.urls_with_label(UrlLabel::Blog).len(), 2);
        assert_eq!(data.urls_with_label(UrlLabel::Legal).len(), 1);
    }

    #[test]
    fn empty_is_empty() {
        assert!(SitemapData::empty().is_empty());
    }
}
