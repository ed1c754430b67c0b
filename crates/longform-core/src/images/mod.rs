//! Image generator (C6, §4.6) and its prompt assembly.
//!
//! Prompt construction is grounded in the original pipeline's
//! `image_prompts.py`: a short, direct prompt built from the topic, a
//! per-slot camera angle, and (when a brand `VisualIdentity` is present)
//! its base style prompt plus an avoid-list, rather than one generic
//! prompt for every slot.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{CompanyContext, ImageSlot};
use crate::error::CoreError;
use crate::llm::image::ImageOptions;
use crate::providers::ProviderSet;

fn fluff_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(guide to|complete)\b\s*").expect("fluff word regex must compile"))
}

fn leading_article_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(the|a|an)\s+").expect("leading article regex must compile"))
}

/// The camera/framing angle assigned to each image slot.
fn position_angle(slot: ImageSlot) -> &'static str {
    match slot {
        ImageSlot::Hero => "wide establishing shot, overview",
        ImageSlot::Mid => "close-up detail, hands-on action",
        ImageSlot::Bottom => "forward-looking, success outcome",
    }
}

/// Strip filler words ("Guide to", "Complete") and a leading article from
/// a keyword to get a clean image topic.
fn clean_topic(keyword: &str) -> String {
    let stripped = fluff_word_re().replace_all(keyword, "");
    let stripped = leading_article_re().replace_all(&stripped, "");
    let topic = stripped.trim();
    if topic.is_empty() {
        keyword.trim().to_string()
    } else {
        topic.to_string()
    }
}

/// Build the image-generation prompt for one article slot.
pub fn build_image_prompt(keyword: &str, company: &CompanyContext, slot: ImageSlot) -> String {
    let industry = if company.industry.trim().is_empty() {
        "professional"
    } else {
        company.industry.as_str()
    };
    let topic = clean_topic(keyword);
    let angle = position_angle(slot);
    let visual_identity = company.visual_identity.as_ref();

    let style_prompt_lower = visual_identity
        .map(|v| v.image_style_prompt.to_lowercase())
        .unwrap_or_default();
    let allow_text = style_prompt_lower.contains("with text") || style_prompt_lower.contains("include text");
    let no_text = if allow_text {
        ""
    } else {
        "NO text, NO words, NO letters, NO logos, NO watermarks."
    };

    let avoid_elements = visual_identity
        .filter(|v| !v.avoid_in_images.is_empty())
        .map(|v| format!("Avoid: {}.", v.avoid_in_images.join(", ")))
        .unwrap_or_default();

    if let Some(style_prompt) = visual_identity
        .map(|v| v.image_style_prompt.trim())
        .filter(|s| !s.is_empty())
    {
        let base = style_prompt.trim_end_matches(['.', '!', '?']);
        return join_parts(&[
            &format!("{base}."),
            &format!("Topic: {topic}."),
            &format!("Style: {angle}."),
            no_text,
            &avoid_elements,
        ]);
    }

    join_parts(&[
        &format!("Professional photo for {industry} blog."),
        &format!("Topic: {topic}."),
        &format!("Style: {angle}."),
        "Modern, clean, realistic.",
        no_text,
        &avoid_elements,
        "16:9 ratio.",
    ])
}

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render `slot`'s prompt and call the image LLM, returning the raw PNG
/// bytes alongside the slot they belong to.
pub async fn generate_slot_image(
    keyword: &str,
    company: &CompanyContext,
    slot: ImageSlot,
    providers: &ProviderSet,
) -> Result<(ImageSlot, Vec<u8>), CoreError> {
    let prompt = build_image_prompt(keyword, company, slot);
    tracing::debug!(slot = ?slot, prompt_len = prompt.len(), "generating article image");
    let bytes = providers.generate_image(&prompt, &ImageOptions::default()).await?;
    Ok((slot, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VisualIdentity;

    fn company_with_industry(industry: &str) -> CompanyContext {
        CompanyContext {
            industry: industry.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn clean_topic_strips_fluff_and_leading_article() {
        assert_eq!(clean_topic("The Complete Guide to Coffee Makers"), "Coffee Makers");
        assert_eq!(clean_topic("A/B Testing"), "A/B Testing");
    }

    #[test]
    fn clean_topic_falls_back_to_original_when_emptied() {
        assert_eq!(clean_topic("The"), "The");
    }

    #[test]
    fn generic_branch_includes_industry_and_ratio_suffix() {
        let company = company_with_industry("coffee roasting");
        let prompt = build_image_prompt("Best Coffee Makers", &company, ImageSlot::Hero);
        assert!(prompt.contains("Professional photo for coffee roasting blog."));
        assert!(prompt.contains("wide establishing shot"));
        assert!(prompt.contains("NO text"));
        assert!(prompt.ends_with("16:9 ratio."));
    }

    #[test]
    fn missing_industry_falls_back_to_professional() {
        let company = CompanyContext::default();
        let prompt = build_image_prompt("Coffee", &company, ImageSlot::Mid);
        assert!(prompt.contains("Professional photo for professional blog."));
        assert!(prompt.contains("close-up detail"));
    }

    #[test]
    fn visual_identity_branch_uses_base_style_prompt() {
        let company = CompanyContext {
            visual_identity: Some(VisualIdentity {
                image_style_prompt: "Warm earthy tones, shot on film".to_string(),
                avoid_in_images: vec!["plastic cups".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        };
        let prompt = build_image_prompt("Coffee Brewing", &company, ImageSlot::Bottom);
        assert!(prompt.starts_with("Warm earthy tones, shot on film."));
        assert!(prompt.contains("forward-looking, success outcome"));
        assert!(prompt.contains("Avoid: plastic cups."));
        assert!(!prompt.contains("16:9 ratio."));
    }

    #[test]
    fn with_text_opt_in_suppresses_no_text_clause() {
        let company = CompanyContext {
            visual_identity: Some(VisualIdentity {
                image_style_prompt: "Bold poster style with text overlays".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let prompt = build_image_prompt("Coffee", &company, ImageSlot::Hero);
        assert!(!prompt.contains("NO text"));
    }
}
