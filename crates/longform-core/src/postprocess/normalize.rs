//! Mixed-format normalization, list reconstruction, entity-safety,
//! truncation/fragment detection, and paragraph deduplication (§4.8
//! steps 1-5, 9) — all operating on one HTML/markdown fragment string at
//! a time. Citation and heading/ToC passes operate across the whole
//! article and live in sibling modules.

use std::sync::OnceLock;

use regex::Regex;

fn double_encoded_amp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&amp;amp;").expect("double-encoded ampersand regex must compile"))
}

fn strong_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*([^*]+?)\*\*").expect("strong markdown regex must compile"))
}

fn emphasis_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Single `*x*` not immediately preceded/followed by another `*` (so it
    // doesn't re-match fragments of an already-converted `**x**`). The
    // boundary characters are captured so the replacement can preserve them.
    RE.get_or_init(|| {
        Regex::new(r"(^|[^*])\*([^*\n]+?)\*([^*]|$)").expect("emphasis markdown regex must compile")
    })
}

fn block_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<(p|ul|ol|div|h[1-6])(?:\s[^>]*)?>.*?</\1>").expect("block tag regex must compile")
    })
}

fn inline_dash_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // An intro ending in `:` or `.` followed by two or more ` - item` runs.
    RE.get_or_init(|| {
        Regex::new(r"^(?P<intro>.*?[:.])\s*-\s*(?P<items>.+)$").expect("inline dash split regex must compile")
    })
}

fn dash_bullet_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*-\s+(.+)$").expect("dash bullet line regex must compile"))
}

fn numbered_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*\d+\.\s+(.+)$").expect("numbered line regex must compile"))
}

fn empty_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<(p|li|div)(?:\s[^>]*)?>\s*</\1>").expect("empty block regex must compile")
    })
}

fn nested_same_kind_list_re(kind: &str) -> Regex {
    Regex::new(&format!(r"(?s)<{kind}>\s*<{kind}>(.*?)</{kind}>\s*</{kind}>")).expect("nested list regex must compile")
}

const FRAGMENT_ENDINGS: &[&str] = &[
    "of", "by", "the", "and", "with", "for", "to", "in", "on", "at", "from", "a", "an",
];

/// Full fragment-level pipeline: normalize → reconstruct lists → escape
/// double-encoded entities → drop truncated list items → dedupe → clean
/// orphans. Idempotent: running it twice yields the same string.
pub fn normalize_fragment(raw: &str) -> String {
    let decoded = decode_double_encoded_entities(raw);
    let reconstructed = reconstruct_blocks(&decoded);
    let listed = coalesce_and_collapse_lists(&reconstructed);
    let pruned = drop_fragment_list_items(&listed);
    let deduped = dedupe_paragraphs(&pruned);
    cleanup_orphans(&deduped)
}

/// §4.8 step 3: decode `&amp;amp;` → `&amp;` before any further escaping.
/// Applied repeatedly in case of triple-encoding, never introduces new
/// `&amp;amp;` sequences so it terminates.
fn decode_double_encoded_entities(s: &str) -> String {
    let mut current = s.to_string();
    loop {
        let next = double_encoded_amp_re().replace_all(&current, "&amp;").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// §4.8 step 1: convert markdown constructs inside bare text runs to HTML,
/// and split an inline "intro: - item - item" paragraph into an
/// introductory paragraph plus an unordered list.
fn reconstruct_blocks(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_end = 0;

    for m in block_tag_re().find_iter(raw) {
        out.push_str(&convert_bare_text(&raw[last_end..m.start()]));
        out.push_str(&convert_block(m.as_str()));
        last_end = m.end();
    }
    out.push_str(&convert_bare_text(&raw[last_end..]));
    out
}

/// Convert a recognized `<p>`/`<ul>`/... block: if it's a `<p>` whose inner
/// text matches the inline-dash-bullet pattern, split it into an intro
/// paragraph plus a list; otherwise apply markdown inline conversion to
/// its inner text only.
fn convert_block(block: &str) -> String {
    let Some(inner_start) = block.find('>').map(|i| i + 1) else {
        return block.to_string();
    };
    let Some(close_at) = block.rfind("</") else {
        return block.to_string();
    };
    let tag_end = block[1..].find(['>', ' ']).map(|i| i + 1).unwrap_or(block.len());
    let tag = &block[1..tag_end];
    let inner = &block[inner_start..close_at];

    if tag.eq_ignore_ascii_case("p") {
        if let Some(caps) = inline_dash_split_re().captures(inner.trim()) {
            let intro = caps.name("intro").unwrap().as_str().trim();
            let items = caps.name("items").unwrap().as_str();
            let list_items: Vec<String> = items
                .split(" - ")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!("<li>{}</li>", convert_markdown_inline(s)))
                .collect();
            if list_items.len() >= 2 {
                return format!(
                    "<p>{}</p><ul>{}</ul>",
                    convert_markdown_inline(intro),
                    list_items.join("")
                );
            }
        }
        format!("<p>{}</p>", convert_markdown_inline(inner))
    } else {
        format!("<{tag}>{}</{tag}>", convert_markdown_inline(inner))
    }
}

/// Convert a bare (non-block-tagged) text run: markdown emphasis/strong,
/// dash-bullet lines → `<ul>`, numbered lines → `<ol>`, and wrap the
/// remainder in a `<p>` so it isn't left as unstructured text (§4.8 step
/// 1's "paragraph that contains..." rule applies to existing `<p>`
/// blocks; bare runs are wrapped fresh).
fn convert_bare_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some(list_html) = try_dash_list(trimmed) {
        return list_html;
    }
    if let Some(list_html) = try_numbered_list(trimmed) {
        return list_html;
    }

    format!("<p>{}</p>", convert_markdown_inline(trimmed))
}

fn try_dash_list(text: &str) -> Option<String> {
    if !dash_bullet_line_re().is_match(text) {
        return None;
    }
    let items: Vec<String> = dash_bullet_line_re()
        .captures_iter(text)
        .map(|c| format!("<li>{}</li>", convert_markdown_inline(c[1].trim())))
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(format!("<ul>{}</ul>", items.join("")))
    }
}

fn try_numbered_list(text: &str) -> Option<String> {
    if !numbered_line_re().is_match(text) {
        return None;
    }
    let items: Vec<String> = numbered_line_re()
        .captures_iter(text)
        .map(|c| format!("<li>{}</li>", convert_markdown_inline(c[1].trim())))
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(format!("<ol>{}</ol>", items.join("")))
    }
}

fn convert_markdown_inline(text: &str) -> String {
    let with_strong = strong_re().replace_all(text, "<strong>$1</strong>");
    emphasis_re()
        .replace_all(&with_strong, "$1<em>$2</em>$3")
        .into_owned()
}

/// §4.8 step 2: coalesce adjacent same-kind list items and collapse
/// doubly-nested same-kind lists (`<ul><ul>…</ul></ul>` → single `<ul>`).
fn coalesce_and_collapse_lists(s: &str) -> String {
    let mut current = s.to_string();
    for kind in ["ul", "ol"] {
        loop {
            let re = nested_same_kind_list_re(kind);
            let next = re.replace_all(&current, |c: &regex::Captures<'_>| format!("<{kind}>{}</{kind}>", &c[1]));
            if next == current {
                break;
            }
            current = next.into_owned();
        }
    }
    // Coalesce adjacent lists of the same kind: `</ul><ul>` → nothing
    // (merge the two lists' `<li>` runs into one list).
    for kind in ["ul", "ol"] {
        let adjacent = Regex::new(&format!(r"</{kind}>\s*<{kind}>")).expect("adjacent list regex must compile");
        current = adjacent.replace_all(&current, "").into_owned();
    }
    current
}

/// §4.8 step 4: list items ending on a preposition/article with fewer
/// than 5 words are dropped as truncated fragments. Longer items ending
/// the same way are kept (flagging is the quality checker's job, not the
/// post-processor's). A bare word count alone is not a drop signal — S6's
/// `<li>Fast</li>`/`<li>Cheap</li>`/`<li>Safe</li>` are legitimate
/// single-word items and must survive; only the fragment-ending rule
/// applies here, matching `markdown_processor.py`.
fn drop_fragment_list_items(s: &str) -> String {
    let li_re = Regex::new(r"(?s)<li>(.*?)</li>").expect("list item regex must compile");
    li_re
        .replace_all(s, |caps: &regex::Captures<'_>| {
            let text = strip_tags(&caps[1]);
            let words: Vec<&str> = text.split_whitespace().collect();
            let drop = words.len() < 5
                && words
                    .last()
                    .map(|w| FRAGMENT_ENDINGS.contains(&w.to_lowercase().trim_end_matches(['.', ',']).to_string().as_str()))
                    .unwrap_or(false);
            if drop {
                String::new()
            } else {
                caps.get(0).unwrap().as_str().to_string()
            }
        })
        .into_owned()
}

fn strip_tags(s: &str) -> String {
    let tag_re = Regex::new(r"<[^>]*>").expect("tag strip regex must compile");
    tag_re.replace_all(s, "").into_owned()
}

/// §4.8 step 5: if a paragraph is immediately followed by a `<ul>` whose
/// items are a strict subset of that paragraph's sentences, drop the
/// paragraph (the conservative choice documented in DESIGN.md for the
/// open question of which side to drop). Duplicate paragraphs
/// (byte-identical after whitespace normalization) collapse to the first
/// occurrence.
fn dedupe_paragraphs(s: &str) -> String {
    let para_then_list_re =
        Regex::new(r"(?s)<p>(.*?)</p>\s*(<ul>.*?</ul>)").expect("paragraph-then-list regex must compile");
    let li_re = Regex::new(r"(?s)<li>(.*?)</li>").expect("list item regex must compile");
    let after_subset_drop = para_then_list_re
        .replace_all(s, |caps: &regex::Captures<'_>| {
            let paragraph_text = strip_tags(&caps[1]);
            let list_block = &caps[2];
            let items: Vec<String> = li_re.captures_iter(list_block).map(|c| strip_tags(&c[1]).trim().to_lowercase()).collect();
            let normalized_paragraph = paragraph_text.to_lowercase();
            let all_subset = !items.is_empty() && items.iter().all(|item| normalized_paragraph.contains(item.as_str()));
            if all_subset {
                list_block.to_string()
            } else {
                format!("<p>{}</p>{}", &caps[1], list_block)
            }
        })
        .into_owned();

    dedupe_identical_paragraphs(&after_subset_drop)
}

fn dedupe_identical_paragraphs(s: &str) -> String {
    let para_re = Regex::new(r"(?s)<p>.*?</p>").expect("paragraph regex must compile");
    let mut seen = std::collections::HashSet::new();
    para_re
        .replace_all(s, |caps: &regex::Captures<'_>| {
            let normalized: String = caps[0].split_whitespace().collect::<Vec<_>>().join(" ");
            if seen.insert(normalized) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// §4.8 step 9: remove empty paragraphs/list items/divs and unescape any
/// HTML-escaped block-level tags left over in body text.
fn cleanup_orphans(s: &str) -> String {
    let mut current = s.to_string();
    loop {
        let next = empty_block_re().replace_all(&current, "").into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
        .replace("&lt;p&gt;", "<p>")
        .replace("&lt;/p&gt;", "</p>")
        .replace("&lt;ul&gt;", "<ul>")
        .replace("&lt;/ul&gt;", "</ul>")
        .replace("&lt;li&gt;", "<li>")
        .replace("&lt;/li&gt;", "</li>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s6_mixed_format_cleanup_scenario() {
        let input = "<p>Benefits: - Fast - Cheap - Safe</p>**Conclusion:** use it.";
        let output = normalize_fragment(input);
        assert_eq!(
            output,
            "<p>Benefits:</p><ul><li>Fast</li><li>Cheap</li><li>Safe</li></ul><p><strong>Conclusion:</strong> use it.</p>"
        );
    }

    #[test]
    fn double_encoded_ampersand_is_decoded_once() {
        assert_eq!(decode_double_encoded_entities("Tom &amp;amp; Jerry"), "Tom &amp; Jerry");
    }

    #[test]
    fn strong_markdown_converts() {
        assert_eq!(convert_markdown_inline("say **hi** now"), "say <strong>hi</strong> now");
    }

    #[test]
    fn doubly_nested_lists_collapse() {
        let input = "<ul><ul><li>a</li><li>b</li></ul></ul>";
        assert_eq!(coalesce_and_collapse_lists(input), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn adjacent_same_kind_lists_coalesce() {
        let input = "<ul><li>a</li></ul><ul><li>b</li></ul>";
        assert_eq!(coalesce_and_collapse_lists(input), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn short_list_item_is_dropped() {
        let input = "<ul><li>of</li><li>A full useful sentence here</li></ul>";
        let output = drop_fragment_list_items(input);
        assert!(!output.contains("<li>of</li>"));
        assert!(output.contains("A full useful sentence here"));
    }

    #[test]
    fn fragment_ending_short_item_is_dropped() {
        let input = "<ul><li>the best solution for</li><li>A complete and proper item here</li></ul>";
        let output = drop_fragment_list_items(input);
        assert!(!output.contains("the best solution for"));
    }

    #[test]
    fn empty_paragraphs_are_removed() {
        assert_eq!(cleanup_orphans("<p>Hello</p><p>   </p><p></p>"), "<p>Hello</p>");
    }

    #[test]
    fn duplicate_paragraphs_collapse_to_first() {
        let input = "<p>Same text here.</p><p>Same   text here.</p>";
        assert_eq!(dedupe_identical_paragraphs(input), "<p>Same text here.</p>");
    }

    #[test]
    fn normalize_fragment_is_idempotent() {
        let input = "<p>Benefits: - Fast - Cheap - Safe</p>**Conclusion:** use it.";
        let once = normalize_fragment(input);
        let twice = normalize_fragment(&once);
        assert_eq!(once, twice);
    }
}
