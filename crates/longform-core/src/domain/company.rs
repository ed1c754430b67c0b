//! Company context: the structured profile resolved once per batch (C4).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One author attributed to articles, carried through to rendering.
///
/// Shape recovered from the original implementation's fallback model —
/// `spec.md` names only `AuthorInfo` without a field list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorInfo {
    /// Display name.
    pub name: String,
    /// Job title or role.
    #[serde(default)]
    pub title: String,
    /// Short biography.
    #[serde(default)]
    pub bio: String,
    /// Headshot image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// LinkedIn profile URL.
    #[serde(default)]
    pub linkedin_url: Option<String>,
    /// Twitter/X profile URL.
    #[serde(default)]
    pub twitter_url: Option<String>,
}

/// Brand visual identity used by the image generator (C6) and asset finder
/// (C5) to keep generated/recreated images on-brand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisualIdentity {
    /// Primary brand colors, as hex strings.
    #[serde(default)]
    pub brand_colors: Vec<String>,
    /// Secondary/accent colors, as hex strings.
    #[serde(default)]
    pub secondary_colors: Vec<String>,
    /// Free-text description of the visual style (e.g. "minimalist, flat").
    #[serde(default)]
    pub visual_style: String,
    /// Recurring design motifs.
    #[serde(default)]
    pub design_elements: Vec<String>,
    /// Typography character (e.g. "modern sans-serif").
    #[serde(default)]
    pub typography_style: String,
    /// Overall mood descriptor (e.g. "energetic, optimistic").
    #[serde(default)]
    pub mood: String,
    /// Base prompt fragment threaded into every image-generation request.
    #[serde(default)]
    pub image_style_prompt: String,
    /// Elements the image LLM must avoid depicting.
    #[serde(default)]
    pub avoid_in_images: Vec<String>,
}

/// The structured company profile, built once per batch by C4 and treated
/// as read-only afterward.
///
/// Container-level `#[serde(default)]`: C4 may hand back a partial JSON
/// object (§4.4), and every field here defaults to its empty value rather
/// than failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyContext {
    /// Company name; falls back to the host of `company_url` if the
    /// resolver returns a partial object.
    pub name: String,
    /// The canonical company URL.
    pub url: String,
    /// Industry descriptor.
    #[serde(default)]
    pub industry: String,
    /// Short company description.
    #[serde(default)]
    pub description: String,
    /// Product/service names.
    #[serde(default)]
    pub products: Vec<String>,
    /// Target audience description.
    #[serde(default)]
    pub target_audience: String,
    /// Writing tone (e.g. "professional", "playful").
    #[serde(default)]
    pub tone: String,
    /// Free-form structured voice persona map.
    #[serde(default)]
    pub voice_persona: BTreeMap<String, String>,
    /// Ordered list of attributed authors.
    #[serde(default)]
    pub authors: Vec<AuthorInfo>,
    /// Optional visual-identity record.
    #[serde(default)]
    pub visual_identity: Option<VisualIdentity>,

    // Extra prompt-building fields recovered from the original source's
    // prompt builder; not part of spec.md's CompanyContext proper but
    // consumed by the same LLM prompt that produces this record.
    /// Named competitors.
    #[serde(default)]
    pub competitors: Vec<String>,
    /// Customer pain points the content should speak to.
    #[serde(default)]
    pub pain_points: Vec<String>,
    /// Value propositions to emphasize.
    #[serde(default)]
    pub value_propositions: Vec<String>,
    /// Representative use cases.
    #[serde(default)]
    pub use_cases: Vec<String>,
    /// Recurring content themes.
    #[serde(default)]
    pub content_themes: Vec<String>,
    /// Additional free-text system instructions for the article generator.
    #[serde(default)]
    pub system_instructions: Option<String>,
    /// Free-text excerpt from the client's own knowledge base.
    #[serde(default)]
    pub client_knowledge_base: Option<String>,
}

impl CompanyContext {
    /// Build a minimal context from a URL when the resolver returns nothing
    /// usable (the caller maps that into a fatal error per C4's contract —
    /// this helper exists only to fill in `name` for a partial LLM response).
    pub fn host_name_fallback(company_url: &str) -> String {
        url::Url::parse(company_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| company_url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_name_fallback_extracts_host() {
        assert_eq!(
            CompanyContext::host_name_fallback("https://www.example.com/about"),
            "www.example.com"
        );
    }

    #[test]
    fn host_name_fallback_on_invalid_url_returns_input() {
        assert_eq!(CompanyContext::host_name_fallback("not a url"), "not a url");
    }

    #[test]
    fn deserializes_partial_object_with_defaults() {
        let json = r#"{"name": "Acme", "url": "https://acme.test"}"#;
        let ctx: CompanyContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.name, "Acme");
        assert!(ctx.products.is_empty());
        assert!(ctx.visual_identity.is_none());
    }
}
