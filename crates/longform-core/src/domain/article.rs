//! Article job input and structured article output (C7/C8/C9 data model).

use serde::{Deserialize, Serialize};

use super::batch::KeywordSpec;

/// One article job, derived from a `KeywordSpec` at batch-build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleJob {
    /// Opaque unique job identifier.
    pub job_id: String,
    /// The source keyword spec.
    pub keyword_spec: KeywordSpec,
    /// URL-safe slug, unique within the batch.
    pub slug: String,
    /// Output-relative href, e.g. `/a-b/`.
    pub href: String,
    /// Resolved word-count target (batch default or per-keyword override).
    pub word_count_target: u32,
}

/// A question/answer pair, used for the FAQ and PAA blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QnA {
    /// The question text.
    pub question: String,
    /// The answer body (HTML fragment).
    pub answer: String,
}

/// One body section, possibly nested.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Section {
    /// Section heading text.
    pub heading: String,
    /// Section body as an HTML fragment (may still contain raw markdown
    /// before C8 normalizes it).
    pub body: String,
    /// Nested subsections, if any.
    #[serde(default)]
    pub subsections: Vec<Section>,
    /// Optional embedded video link (recognized `youtube.com`/`youtu.be`
    /// URL), rendered as a plain link, never executed as an embed.
    #[serde(default)]
    pub video_url: Option<String>,
}

/// A citation/source entry. `n` is 1-based and contiguous after C8.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// 1-based citation index.
    pub n: u32,
    /// Source title.
    pub title: String,
    /// Source URL.
    pub url: String,
    /// Optional retrieval timestamp (ISO-8601).
    #[serde(default)]
    pub retrieved_at: Option<String>,
}

/// Kind of image reference an asset finder (C5) may surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// A photograph.
    Photo,
    /// An illustration or drawing.
    Illustration,
    /// An infographic.
    Infographic,
    /// A chart or graph.
    Chart,
    /// A diagram.
    Diagram,
}

/// One candidate image reference discovered by C5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundAsset {
    /// Direct image URL.
    pub url: String,
    /// Title/caption.
    pub title: String,
    /// Short description.
    pub description: String,
    /// The hosting site (domain), used by the diversity filter.
    pub source_site: String,
    /// Asset kind.
    pub kind: AssetKind,
    /// Pixel width, if known.
    #[serde(default)]
    pub width: Option<u32>,
    /// Pixel height, if known.
    #[serde(default)]
    pub height: Option<u32>,
    /// License description, if known.
    #[serde(default)]
    pub license: Option<String>,
    /// Whether this asset was regenerated on-brand via C6, replacing the
    /// original found URL with a freshly generated one.
    #[serde(default)]
    pub recreated: bool,
}

/// Which slot a generated/found image fills in the rendered article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    /// Top-of-article hero image.
    Hero,
    /// Mid-article supporting image.
    Mid,
    /// Closing image.
    Bottom,
}

impl ImageSlot {
    /// File stem used when writing `images/{slot}.png`.
    pub fn file_stem(self) -> &'static str {
        match self {
            ImageSlot::Hero => "hero",
            ImageSlot::Mid => "mid",
            ImageSlot::Bottom => "bottom",
        }
    }
}

/// An image occupying a slot in the rendered article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleImage {
    /// Which slot this fills.
    pub slot: ImageSlot,
    /// Output-relative URL/path to the stored image.
    pub url: String,
    /// Alt text.
    pub alt: String,
}

/// A two-column comparison table, if the article includes one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonTable {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row cells, each row matching `headers` in length.
    pub rows: Vec<Vec<String>>,
}

/// A table-of-contents entry (built by C8, consumed by C9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocEntry {
    /// Cleaned, truncated label.
    pub label: String,
    /// Anchor/href pointing at the corresponding section.
    pub anchor: String,
}

/// The fully structured article record, shared by C7 (producer, raw),
/// C8 (cleans it in place), and C9 (renders it).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleOutput {
    /// Article headline (sole `h1`).
    pub headline: String,
    /// Meta description.
    pub meta_description: String,
    /// Lead paragraph.
    pub lead: String,
    /// Ordered body sections.
    pub sections: Vec<Section>,
    /// FAQ entries.
    #[serde(default)]
    pub faq: Vec<QnA>,
    /// "People Also Ask" entries, if supplied by a SERP provider.
    #[serde(default)]
    pub paa: Vec<QnA>,
    /// Citation list, contiguous `1..n` after C8.
    #[serde(default)]
    pub citations: Vec<Source>,
    /// Table of contents, built by C8.
    #[serde(default)]
    pub toc: Vec<TocEntry>,
    /// Optional comparison table.
    #[serde(default)]
    pub comparison_table: Option<ComparisonTable>,
    /// Image slots filled by C5/C6.
    #[serde(default)]
    pub images: Vec<ArticleImage>,
    /// ISO-8601 publish timestamp, set at render time.
    #[serde(default)]
    pub published_time: Option<String>,
}

impl ArticleOutput {
    /// All body text blocks in order of first appearance: lead, section
    /// bodies (depth-first, including subsections), then FAQ answers. Used
    /// to scan for citation markers; excludes the citation list itself and
    /// any JSON-LD payload (those are rendered separately by C9).
    pub fn body_text_blocks(&self) -> Vec<&str> {
        let mut blocks = vec![self.lead.as_str()];
        for s in &self.sections {
            collect_section_blocks(s, &mut blocks);
        }
        for qa in &self.faq {
            blocks.push(qa.answer.as_str());
        }
        blocks
    }

    /// Mutable counterpart of [`body_text_blocks`](Self::body_text_blocks),
    /// visiting the same blocks in the same order so a rewrite pass (e.g.
    /// citation marker renumbering) can be applied in place.
    pub fn for_each_body_block_mut(&mut self, mut f: impl FnMut(&mut String)) {
        f(&mut self.lead);
        for s in &mut self.sections {
            visit_section_blocks_mut(s, &mut f);
        }
        for qa in &mut self.faq {
            f(&mut qa.answer);
        }
    }
}

fn collect_section_blocks<'a>(section: &'a Section, out: &mut Vec<&'a str>) {
    out.push(section.body.as_str());
    for sub in &section.subsections {
        collect_section_blocks(sub, out);
    }
}

fn visit_section_blocks_mut(section: &mut Section, f: &mut impl FnMut(&mut String)) {
    f(&mut section.body);
    for sub in &mut section.subsections {
        visit_section_blocks_mut(sub, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_slot_file_stem() {
        assert_eq!(ImageSlot::Hero.file_stem(), "hero");
        assert_eq!(ImageSlot::Mid.file_stem(), "mid");
        assert_eq!(ImageSlot::Bottom.file_stem(), "bottom");
    }

    #[test]
    fn body_text_blocks_includes_nested_sections_and_faq() {
        let mut out = ArticleOutput {
            lead: "lead".into(),
            ..Default::default()
        };
        out.sections.push(Section {
            heading: "H1".into(),
            body: "top".into(),
            subsections: vec![Section {
                heading: "H1.1".into(),
                body: "nested".into(),
                ..Default::default()
            }],
            video_url: None,
        });
        out.faq.push(QnA {
            question: "Q".into(),
            answer: "faq body".into(),
        });

        let blocks = out.body_text_blocks();
        assert_eq!(blocks, vec!["lead", "top", "nested", "faq body"]);
    }
}
