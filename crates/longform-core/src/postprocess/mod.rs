//! Content post-processor (C8, §4.8) — the deterministic pass that turns a
//! raw LLM-authored `ArticleOutput` into one that satisfies every §3/§8
//! invariant. Never calls a provider; pure function of its input.
//!
//! Sub-passes run in a fixed order: fragment-level normalization (markdown
//! cleanup, list reconstruction, entity-safety, truncation pruning,
//! paragraph dedup, orphan cleanup) on every body block, then heading
//! discipline, then citation discipline (needs clean body text to find
//! markers reliably), then table-of-contents construction, then final
//! validation. It never returns a hard error: a failed invariant downgrades
//! the stage report to `warn` rather than aborting the article (§4.8 step
//! 10, §7 "`IntegrityViolation` is never silent").

mod citations;
mod headings;
mod normalize;

use crate::domain::{ArticleOutput, StageReport, StageStatus};

const STAGE_ID: &str = "C8.content_postprocessor";

/// Run every C8 sub-pass over `article`, returning the cleaned article and
/// its stage report. `pinned_citation_urls` names sources that must survive
/// even without an in-body reference.
pub fn process_article(mut article: ArticleOutput, pinned_citation_urls: &[String]) -> (ArticleOutput, StageReport) {
    normalize_all_blocks(&mut article);
    headings::apply_heading_discipline(&mut article.sections);
    citations::apply_citation_discipline(&mut article, pinned_citation_urls);
    article.toc = headings::build_toc(&article.sections);

    let warnings = validate_invariants(&article);
    let report = if warnings.is_empty() {
        StageReport::ok(STAGE_ID)
    } else {
        StageReport::new(STAGE_ID, StageStatus::Warn, warnings.join("; "))
    };

    (article, report)
}

fn normalize_all_blocks(article: &mut ArticleOutput) {
    article.headline = normalize::normalize_fragment(&article.headline);
    article.meta_description = normalize::normalize_fragment(&article.meta_description);
    article.for_each_body_block_mut(|block| {
        *block = normalize::normalize_fragment(block);
    });
    for qa in &mut article.paa {
        qa.answer = normalize::normalize_fragment(&qa.answer);
    }
}

/// §8 invariant checks this stage is responsible for: contiguous citation
/// indices with no dangling markers, and no literal `**bold**` markdown
/// left over in body text. Returns human-readable descriptions of any
/// violation found; an empty vec means every invariant held.
fn validate_invariants(article: &ArticleOutput) -> Vec<String> {
    let mut problems = Vec::new();

    for (idx, source) in article.citations.iter().enumerate() {
        let expected = (idx + 1) as u32;
        if source.n != expected {
            problems.push(format!("citation list is not a contiguous 1..n prefix (entry {idx} has n={})", source.n));
            break;
        }
    }

    let marker_re = regex::Regex::new(r"\[\s*(\d+)\s*\]").expect("validation marker regex must compile");
    for block in article.body_text_blocks() {
        if block.contains("**") {
            problems.push("body text still contains raw '**' markdown after normalization".to_string());
            break;
        }
    }
    for block in article.body_text_blocks() {
        for caps in marker_re.captures_iter(block) {
            let n: u32 = caps[1].parse().unwrap_or(0);
            if n == 0 || n as usize > article.citations.len() {
                problems.push(format!("body references citation [{n}] with no matching entry"));
            }
        }
    }

    problems
}
