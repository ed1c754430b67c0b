//! Heading discipline and table-of-contents construction (§4.8 steps 7-8).
//!
//! The question-prefix list and truncation algorithm are grounded in the
//! original pipeline's `toc.py`: prefixes are checked longest-first so
//! `"What are the future trends in "` is stripped before the shorter
//! `"What are "` would otherwise match part of it.

use crate::domain::{Section, TocEntry};
use crate::domain::slug::generate_slug;

/// Checked in order; longest/most specific phrasing first.
const QUESTION_PREFIXES: &[&str] = &[
    "What is the difference between ",
    "What are the future trends in ",
    "What is ",
    "What are ",
    "How do ",
    "How does ",
    "Why is ",
    "Why are ",
];

const MAX_TOC_LABEL_LEN: usize = 50;
const MAX_TOC_SECTIONS: usize = 9;

/// §4.8 step 7: collapse a doubled question prefix (`"What is What is X"` →
/// `"What is X"`) and drop sections whose heading is empty after trimming.
/// Recurses into subsections first so an empty child doesn't block its
/// parent from being evaluated.
pub fn apply_heading_discipline(sections: &mut Vec<Section>) {
    for section in sections.iter_mut() {
        section.heading = collapse_double_prefix(&section.heading).trim().to_string();
        apply_heading_discipline(&mut section.subsections);
    }
    sections.retain(|s| !s.heading.is_empty());
}

fn collapse_double_prefix(heading: &str) -> String {
    let lower = heading.to_lowercase();
    for prefix in QUESTION_PREFIXES {
        let doubled = prefix.to_lowercase().repeat(2);
        if lower.starts_with(&doubled) {
            return heading[prefix.len()..].to_string();
        }
    }
    heading.to_string()
}

/// §4.8 step 8: build a table of contents from the first
/// [`MAX_TOC_SECTIONS`] top-level section headings.
pub fn build_toc(sections: &[Section]) -> Vec<TocEntry> {
    sections
        .iter()
        .take(MAX_TOC_SECTIONS)
        .filter(|s| !s.heading.trim().is_empty())
        .map(|s| TocEntry {
            label: toc_label(&s.heading),
            anchor: format!("#{}", generate_slug(&s.heading)),
        })
        .collect()
}

/// Strip a leading question prefix, capitalize what remains, drop a
/// trailing `?`, and truncate to a word boundary within
/// [`MAX_TOC_LABEL_LEN`] characters.
fn toc_label(heading: &str) -> String {
    let stripped = strip_question_prefix(heading);
    let without_question_mark = stripped.trim_end_matches('?').to_string();
    truncate_title(&without_question_mark, MAX_TOC_LABEL_LEN)
}

fn strip_question_prefix(heading: &str) -> String {
    let lower = heading.to_lowercase();
    for prefix in QUESTION_PREFIXES {
        if lower.starts_with(&prefix.to_lowercase()) {
            let remainder = &heading[prefix.len()..];
            return capitalize_first(remainder);
        }
    }
    heading.to_string()
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Truncate `title` to `max_length` characters at a word boundary,
/// appending `...`. Mirrors the original's `_truncate_title`: only break
/// at the last space if it falls past the halfway point, otherwise hard
/// truncate.
fn truncate_title(title: &str, max_length: usize) -> String {
    let chars: Vec<char> = title.chars().collect();
    if chars.len() <= max_length {
        return title.to_string();
    }

    let last_space = chars[..max_length].iter().rposition(|&c| c == ' ');
    let cut = match last_space {
        Some(idx) if idx > max_length / 2 => idx,
        _ => max_length,
    };

    let truncated: String = chars[..cut].iter().collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(heading: &str) -> Section {
        Section {
            heading: heading.to_string(),
            body: "body".to_string(),
            subsections: vec![],
            video_url: None,
        }
    }

    #[test]
    fn double_prefix_collapses() {
        let mut sections = vec![section("What is What is Rust?")];
        apply_heading_discipline(&mut sections);
        assert_eq!(sections[0].heading, "What is Rust?");
    }

    #[test]
    fn empty_heading_drops_section() {
        let mut sections = vec![section("Valid Heading"), section("   ")];
        apply_heading_discipline(&mut sections);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "Valid Heading");
    }

    #[test]
    fn empty_subsection_is_dropped_but_parent_survives() {
        let mut sections = vec![Section {
            heading: "Parent".to_string(),
            body: "b".to_string(),
            subsections: vec![section("   "), section("Child")],
            video_url: None,
        }];
        apply_heading_discipline(&mut sections);
        assert_eq!(sections[0].subsections.len(), 1);
        assert_eq!(sections[0].subsections[0].heading, "Child");
    }

    #[test]
    fn toc_label_strips_prefix_and_question_mark() {
        assert_eq!(toc_label("What is Rust?"), "Rust");
        assert_eq!(toc_label("How does caching work?"), "Caching work");
    }

    #[test]
    fn toc_label_prefers_longest_prefix_match() {
        assert_eq!(
            toc_label("What are the future trends in renewable energy?"),
            "Renewable energy"
        );
    }

    #[test]
    fn toc_label_truncates_long_titles_at_word_boundary() {
        let long_heading = "What is the difference between a very long winded heading about many things and another";
        let label = toc_label(long_heading);
        assert!(label.chars().count() <= MAX_TOC_LABEL_LEN + 3);
        assert!(label.ends_with("..."));
        assert!(!label.ends_with(" ..."));
    }

    #[test]
    fn build_toc_caps_at_nine_sections_and_skips_empty() {
        let mut sections: Vec<Section> = (1..=12).map(|i| section(&format!("Heading {i}"))).collect();
        sections.push(section(""));
        let toc = build_toc(&sections);
        assert_eq!(toc.len(), MAX_TOC_SECTIONS);
        assert_eq!(toc[0].anchor, "#heading-1");
    }
}
