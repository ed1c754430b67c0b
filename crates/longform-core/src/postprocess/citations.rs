//! Citation discipline (§4.8 step 6): canonicalize `[k]` markers, renumber
//! them contiguously in order of first appearance, reorder the citation
//! list to match, and drop unreferenced citations unless explicitly
//! pinned.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{ArticleOutput, Source};

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Tolerates stray whitespace inside the brackets (`[ 3]`, `[3 ]`) as the
    // non-canonical form the raw LLM output sometimes produces.
    RE.get_or_init(|| Regex::new(r"\[\s*(\d+)\s*\]").expect("citation marker regex must compile"))
}

fn script_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script block regex must compile"))
}

/// Apply citation discipline to `article` in place. `pinned` names citation
/// URLs that must survive even if nothing in the body references them (e.g.
/// a source the caller explicitly wants attributed).
pub fn apply_citation_discipline(article: &mut ArticleOutput, pinned: &[String]) {
    strip_markers_inside_script_blocks(article);

    let order = collect_marker_order(article);
    let renumber: HashMap<u32, u32> = order
        .iter()
        .enumerate()
        .map(|(idx, old)| (*old, (idx + 1) as u32))
        .collect();

    rewrite_markers(article, &renumber);

    let mut by_old_n: HashMap<u32, Source> = article.citations.drain(..).map(|s| (s.n, s)).collect();
    let mut new_citations: Vec<Source> = Vec::with_capacity(renumber.len());
    for old_n in &order {
        if let Some(mut source) = by_old_n.remove(old_n) {
            source.n = renumber[old_n];
            new_citations.push(source);
        }
    }

    // Anything left in `by_old_n` was never referenced in the body; keep it
    // only if its URL is pinned, appended after the referenced citations.
    let mut leftovers: Vec<Source> = by_old_n.into_values().collect();
    leftovers.sort_by_key(|s| s.n);
    for mut source in leftovers {
        if pinned.iter().any(|p| p == &source.url) {
            source.n = new_citations.len() as u32 + 1;
            new_citations.push(source);
        }
    }

    article.citations = new_citations;
}

fn strip_markers_inside_script_blocks(article: &mut ArticleOutput) {
    article.for_each_body_block_mut(|block| {
        if !block.contains("<script") {
            return;
        }
        *block = script_block_re()
            .replace_all(block, |caps: &regex::Captures<'_>| marker_re().replace_all(&caps[0], "").into_owned())
            .into_owned();
    });
}

fn collect_marker_order(article: &ArticleOutput) -> Vec<u32> {
    let mut order = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for block in article.body_text_blocks() {
        for caps in marker_re().captures_iter(block) {
            if let Ok(n) = caps[1].parse::<u32>() {
                if seen.insert(n) {
                    order.push(n);
                }
            }
        }
    }
    order
}

fn rewrite_markers(article: &mut ArticleOutput, renumber: &HashMap<u32, u32>) {
    article.for_each_body_block_mut(|block| {
        *block = marker_re()
            .replace_all(block, |caps: &regex::Captures<'_>| {
                let old: u32 = caps[1].parse().unwrap_or(0);
                match renumber.get(&old) {
                    Some(new) => format!("[{new}]"),
                    None => String::new(),
                }
            })
            .into_owned();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Section;

    fn article_with(lead: &str, citations: Vec<Source>) -> ArticleOutput {
        ArticleOutput {
            lead: lead.to_string(),
            citations,
            ..Default::default()
        }
    }

    fn source(n: u32, url: &str) -> Source {
        Source {
            n,
            title: format!("Source {n}"),
            url: url.to_string(),
            retrieved_at: None,
        }
    }

    #[test]
    fn renumbers_in_order_of_first_appearance() {
        let mut article = article_with(
            "See [5] and then [2] for details.",
            vec![source(2, "https://b.test"), source(5, "https://a.test")],
        );
        apply_citation_discipline(&mut article, &[]);
        assert_eq!(article.lead, "See [1] and then [2] for details.");
        assert_eq!(article.citations.len(), 2);
        assert_eq!(article.citations[0].n, 1);
        assert_eq!(article.citations[0].url, "https://a.test");
        assert_eq!(article.citations[1].n, 2);
        assert_eq!(article.citations[1].url, "https://b.test");
    }

    #[test]
    fn unreferenced_citation_is_dropped() {
        let mut article = article_with("See [1].", vec![source(1, "https://a.test"), source(2, "https://b.test")]);
        apply_citation_discipline(&mut article, &[]);
        assert_eq!(article.citations.len(), 1);
        assert_eq!(article.citations[0].url, "https://a.test");
    }

    #[test]
    fn pinned_citation_survives_without_a_reference() {
        let mut article = article_with("See [1].", vec![source(1, "https://a.test"), source(2, "https://b.test")]);
        apply_citation_discipline(&mut article, &["https://b.test".to_string()]);
        assert_eq!(article.citations.len(), 2);
        assert!(article.citations.iter().any(|s| s.url == "https://b.test"));
    }

    #[test]
    fn dangling_marker_with_no_matching_citation_is_removed() {
        let mut article = article_with("See [9] please.", vec![]);
        apply_citation_discipline(&mut article, &[]);
        assert_eq!(article.lead, "See  please.");
        assert!(article.citations.is_empty());
    }

    #[test]
    fn markers_inside_script_blocks_are_stripped_not_renumbered() {
        let mut article = ArticleOutput {
            lead: "See [1] here.".to_string(),
            sections: vec![Section {
                heading: "Data".to_string(),
                body: "<script type=\"application/ld+json\">{\"citation\": \"[1]\"}</script>".to_string(),
                ..Default::default()
            }],
            citations: vec![source(1, "https://a.test")],
            ..Default::default()
        };
        apply_citation_discipline(&mut article, &[]);
        assert_eq!(article.lead, "See [1] here.");
        assert!(!article.sections[0].body.contains("[1]"));
        assert_eq!(article.citations.len(), 1);
    }

    #[test]
    fn nested_marker_order_spans_sections_and_faq() {
        let mut article = ArticleOutput {
            lead: "Intro [3].".to_string(),
            sections: vec![Section {
                heading: "H".to_string(),
                body: "Body [1].".to_string(),
                ..Default::default()
            }],
            faq: vec![crate::domain::QnA {
                question: "Q".to_string(),
                answer: "Answer [2].".to_string(),
            }],
            citations: vec![source(1, "https://a"), source(2, "https://b"), source(3, "https://c")],
            ..Default::default()
        };
        apply_citation_discipline(&mut article, &[]);
        assert_eq!(article.lead, "Intro [1].");
        assert_eq!(article.sections[0].body, "Body [2].");
        assert_eq!(article.faq[0].answer, "Answer [3].");
    }
}
