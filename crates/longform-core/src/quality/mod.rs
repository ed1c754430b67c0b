//! Quality gate (C10, §4.10): a purely observational invariant checker
//! that runs after rendering. It never mutates the article — C8 already
//! owns normalization — it only reports what it finds, the same
//! "narrow pass, typed report" shape C8's `validate_invariants` uses.
//!
//! Findings split into two severities. A `Critical` finding means some
//! invariant the pipeline promises (§8) did not hold even after C8;
//! `articles_failed` in the batch report should count these. A `Warning`
//! finding is a soft content-quality signal (missing FAQ, thin ToC) that
//! never fails the article.

use regex::Regex;

use crate::domain::{ArticleOutput, StageReport, StageStatus};

const STAGE_ID: &str = "C10.quality_gate";

/// Severity of a single quality finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// An invariant the pipeline is supposed to guarantee did not hold.
    Critical,
    /// A soft content-quality signal; never fails the article.
    Warning,
}

/// One observation from the quality gate.
#[derive(Debug, Clone)]
pub struct Finding {
    /// Severity bucket.
    pub severity: Severity,
    /// Stable machine-readable code (e.g. `"residual_markdown_bold"`).
    pub code: &'static str,
    /// Human-readable detail.
    pub message: String,
}

/// The full set of findings for one article.
#[derive(Debug, Clone, Default)]
pub struct QualityReport {
    /// Every finding, critical first.
    pub findings: Vec<Finding>,
}

impl QualityReport {
    /// Number of `Critical` findings.
    pub fn critical_count(&self) -> usize {
        self.findings.iter().filter(|f| f.severity == Severity::Critical).count()
    }

    /// Whether the article satisfies every hard invariant.
    pub fn is_clean(&self) -> bool {
        self.critical_count() == 0
    }

    /// Fold this report into a `StageReport`: `Fail` if any critical
    /// finding survived, `Warn` if only soft findings remain, `Ok`
    /// otherwise.
    pub fn to_stage_report(&self) -> StageReport {
        if self.findings.is_empty() {
            return StageReport::ok(STAGE_ID);
        }
        let details = self
            .findings
            .iter()
            .map(|f| format!("[{:?}] {}: {}", f.severity, f.code, f.message))
            .collect::<Vec<_>>()
            .join("; ");
        let status = if self.critical_count() > 0 { StageStatus::Fail } else { StageStatus::Warn };
        StageReport::new(STAGE_ID, status, details)
    }
}

fn marker_re() -> Regex {
    Regex::new(r"\[\s*(\d+)\s*\]").expect("quality marker regex must compile")
}

fn empty_block_re() -> Regex {
    Regex::new(r"<(p|li|div|section)(\s[^>]*)?>\s*</\1>").expect("empty block regex must compile")
}

fn double_encoded_entity_re() -> Regex {
    Regex::new(r"&amp;(amp|lt|gt|quot|#039|apos);").expect("double-encoded entity regex must compile")
}

/// Run every C10 check against `article` (already C8-cleaned and C9-rendered)
/// and its rendered HTML body. `forbid_em_dash` toggles the em/en-dash house
/// style rule (§9 open question: left configurable rather than hard-coded,
/// since spec.md never states a default).
pub fn check_article(article: &ArticleOutput, rendered_html: &str, forbid_em_dash: bool) -> QualityReport {
    let mut findings = Vec::new();

    check_residual_markdown(article, &mut findings);
    check_dangling_citation_markers(article, &mut findings);
    check_unverified_tokens(article, &mut findings);
    if forbid_em_dash {
        check_forbidden_dashes(article, &mut findings);
    }
    check_duplicate_paragraphs(article, &mut findings);
    check_truncated_list_items(article, &mut findings);
    check_double_encoded_entities(article, &mut findings);
    check_citation_contiguity(article, &mut findings);
    check_empty_blocks(rendered_html, &mut findings);

    check_og_tags(rendered_html, &mut findings);
    check_published_time(article, &mut findings);
    check_toc_depth(article, &mut findings);
    check_faq_presence(article, &mut findings);
    check_citation_presence(article, &mut findings);

    QualityReport { findings }
}

fn check_residual_markdown(article: &ArticleOutput, findings: &mut Vec<Finding>) {
    if article.body_text_blocks().iter().any(|b| b.contains("**")) {
        findings.push(Finding {
            severity: Severity::Critical,
            code: "residual_markdown_bold",
            message: "body text still contains raw '**' after post-processing".to_string(),
        });
    }
}

fn check_dangling_citation_markers(article: &ArticleOutput, findings: &mut Vec<Finding>) {
    let re = marker_re();
    for block in article.body_text_blocks() {
        for caps in re.captures_iter(block) {
            let n: u32 = caps[1].parse().unwrap_or(0);
            if n == 0 || n as usize > article.citations.len() {
                findings.push(Finding {
                    severity: Severity::Critical,
                    code: "dangling_citation_marker",
                    message: format!("body references [{n}] with no matching citation entry"),
                });
            }
        }
    }
}

fn check_unverified_tokens(article: &ArticleOutput, findings: &mut Vec<Finding>) {
    if article.body_text_blocks().iter().any(|b| b.contains("UNVERIFIED")) {
        findings.push(Finding {
            severity: Severity::Critical,
            code: "unverified_placeholder_token",
            message: "body text contains a literal 'UNVERIFIED' placeholder".to_string(),
        });
    }
}

fn check_forbidden_dashes(article: &ArticleOutput, findings: &mut Vec<Finding>) {
    if article.body_text_blocks().iter().any(|b| b.contains('\u{2014}') || b.contains('\u{2013}')) {
        findings.push(Finding {
            severity: Severity::Critical,
            code: "forbidden_em_en_dash",
            message: "body text contains an em-dash or en-dash, disallowed by house style".to_string(),
        });
    }
}

fn check_duplicate_paragraphs(article: &ArticleOutput, findings: &mut Vec<Finding>) {
    let mut seen = std::collections::HashSet::new();
    for block in article.body_text_blocks() {
        let trimmed = block.trim();
        if trimmed.len() < 20 {
            continue;
        }
        if !seen.insert(trimmed) {
            findings.push(Finding {
                severity: Severity::Critical,
                code: "duplicate_paragraph",
                message: "an identical paragraph appears more than once in the body".to_string(),
            });
            break;
        }
    }
}

const FRAGMENT_ENDINGS: &[&str] =
    &["of", "by", "the", "and", "with", "for", "to", "in", "on", "at", "from", "a", "an"];

fn check_truncated_list_items(article: &ArticleOutput, findings: &mut Vec<Finding>) {
    let li_re = Regex::new(r"(?s)<li>(.*?)</li>").expect("list item regex must compile");
    for block in article.body_text_blocks() {
        for caps in li_re.captures_iter(block) {
            let text = caps[1].trim().trim_end_matches(['.', ',']).to_lowercase();
            let words: Vec<&str> = text.split_whitespace().collect();
            if let Some(last) = words.last() {
                if words.len() < 5 && FRAGMENT_ENDINGS.contains(last) {
                    findings.push(Finding {
                        severity: Severity::Critical,
                        code: "truncated_list_item",
                        message: format!("list item looks truncated: \"{}\"", caps[1].trim()),
                    });
                }
            }
        }
    }
}

fn check_double_encoded_entities(article: &ArticleOutput, findings: &mut Vec<Finding>) {
    let re = double_encoded_entity_re();
    if article.body_text_blocks().iter().any(|b| re.is_match(b)) {
        findings.push(Finding {
            severity: Severity::Critical,
            code: "double_encoded_entity",
            message: "body text contains a double-encoded HTML entity".to_string(),
        });
    }
}

fn check_citation_contiguity(article: &ArticleOutput, findings: &mut Vec<Finding>) {
    for (idx, source) in article.citations.iter().enumerate() {
        let expected = (idx + 1) as u32;
        if source.n != expected {
            findings.push(Finding {
                severity: Severity::Critical,
                code: "citation_list_not_contiguous",
                message: format!("citation entry {idx} has n={} but expected {expected}", source.n),
            });
            break;
        }
    }
}

fn check_empty_blocks(rendered_html: &str, findings: &mut Vec<Finding>) {
    if empty_block_re().is_match(rendered_html) {
        findings.push(Finding {
            severity: Severity::Critical,
            code: "empty_block_element",
            message: "rendered HTML contains an empty block-level element".to_string(),
        });
    }
}

fn check_og_tags(rendered_html: &str, findings: &mut Vec<Finding>) {
    let has_og_title = rendered_html.contains(r#"property="og:title""#);
    let has_og_description = rendered_html.contains(r#"property="og:description""#);
    if !has_og_title || !has_og_description {
        findings.push(Finding {
            severity: Severity::Warning,
            code: "missing_og_tags",
            message: "rendered HTML is missing an og:title or og:description meta tag".to_string(),
        });
    }
}

fn check_published_time(article: &ArticleOutput, findings: &mut Vec<Finding>) {
    let valid = article
        .published_time
        .as_deref()
        .is_some_and(|t| chrono::DateTime::parse_from_rfc3339(t).is_ok());
    if !valid {
        findings.push(Finding {
            severity: Severity::Warning,
            code: "non_iso8601_published_time",
            message: "published_time is missing or not a valid ISO-8601 timestamp".to_string(),
        });
    }
}

fn check_toc_depth(article: &ArticleOutput, findings: &mut Vec<Finding>) {
    if article.toc.len() < 3 {
        findings.push(Finding {
            severity: Severity::Warning,
            code: "thin_table_of_contents",
            message: format!("table of contents has only {} entries (expected at least 3)", article.toc.len()),
        });
    }
}

fn check_faq_presence(article: &ArticleOutput, findings: &mut Vec<Finding>) {
    if article.faq.is_empty() {
        findings.push(Finding {
            severity: Severity::Warning,
            code: "faq_absent",
            message: "article has no FAQ entries".to_string(),
        });
    }
}

fn check_citation_presence(article: &ArticleOutput, findings: &mut Vec<Finding>) {
    if article.citations.is_empty() {
        findings.push(Finding {
            severity: Severity::Warning,
            code: "no_external_citations",
            message: "article body has no external citations".to_string(),
        });
    }
}
