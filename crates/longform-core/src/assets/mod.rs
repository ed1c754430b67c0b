//! Asset finder (C5, §4.5): a deduplicated, diverse list of image
//! references for an article topic, with an optional on-brand recreation
//! pass via C6.

use std::collections::HashMap;

use serde::Deserialize;

use crate::config::PipelineSettings;
use crate::domain::{AssetKind, CompanyContext, FoundAsset};
use crate::error::CoreError;
use crate::images::build_image_prompt;
use crate::llm::image::ImageOptions;
use crate::llm::GenerationParams;
use crate::providers::{FailoverAttempt, ImageSearchOptions, ProviderSet};

/// Recognized image file extensions (step 4's "looks like an image" test).
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif", "svg"];

/// Domains known to host images even when the URL carries no file
/// extension (e.g. CDN redirectors).
const KNOWN_IMAGE_HOSTS: &[&str] = &[
    "images.unsplash.com",
    "unsplash.com",
    "images.pexels.com",
    "pexels.com",
    "pixabay.com",
    "cdn.pixabay.com",
    "images.stockcake.com",
    "images.freepik.com",
];

/// Stock-image sites suggested to the grounded LLM as candidate sources.
const STOCK_IMAGE_SITE_HINTS: &str = "site:unsplash.com OR site:pexels.com OR site:pixabay.com";

const ASSET_CANDIDATE_SCHEMA: &str = r#"{
  "type": "array",
  "items": {
    "type": "object",
    "properties": {
      "url": {"type": "string"},
      "title": {"type": "string"},
      "description": {"type": "string"},
      "source_site": {"type": "string"},
      "kind": {"type": "string", "enum": ["photo", "illustration", "infographic", "chart", "diagram"]},
      "width": {"type": "integer"},
      "height": {"type": "integer"},
      "license": {"type": "string"}
    },
    "required": ["url"]
  }
}"#;

/// Build the search query C5 hands to both the LLM candidate path and the
/// SERP-image fallback (topic + type hints + stock-site hints, §4.5 step 1).
pub fn build_search_query(topic: &str, section_hint: Option<&str>) -> String {
    let mut query = topic.to_string();
    if let Some(hint) = section_hint.filter(|h| !h.trim().is_empty()) {
        query.push(' ');
        query.push_str(hint);
    }
    query.push_str(" photo illustration ");
    query.push_str(STOCK_IMAGE_SITE_HINTS);
    query
}

/// Find up to `settings.asset_finder_max_results` image assets for `topic`.
pub async fn find_assets(
    topic: &str,
    section_hint: Option<&str>,
    company: &CompanyContext,
    recreate_in_brand_style: bool,
    settings: &PipelineSettings,
    providers: &ProviderSet,
) -> Result<(Vec<FoundAsset>, Vec<FailoverAttempt>, Vec<RecreatedAsset>), CoreError> {
    let query = build_search_query(topic, section_hint);
    let mut attempts = Vec::new();

    let mut candidates = match fetch_llm_candidates(&query, providers).await {
        Ok((found, mut llm_attempts)) => {
            attempts.append(&mut llm_attempts);
            found
        }
        Err(_) => Vec::new(),
    };

    if candidates.is_empty() {
        let options = ImageSearchOptions {
            max: settings.asset_finder_max_results * 2,
            ..Default::default()
        };
        match providers.search_images(&query, &options).await {
            Ok((hits, mut serp_attempts)) => {
                attempts.append(&mut serp_attempts);
                candidates.extend(hits.into_iter().map(|hit| FoundAsset {
                    url: hit.url,
                    title: hit.title.clone().unwrap_or_default(),
                    description: hit.title.unwrap_or_default(),
                    source_site: domain_of(&hit.thumbnail.unwrap_or_default()).unwrap_or_default(),
                    kind: AssetKind::Photo,
                    width: hit.width,
                    height: hit.height,
                    license: hit.license,
                    recreated: false,
                }));
            }
            Err(err) => {
                tracing::warn!(error = %err, "asset finder: SERP fallback also failed");
            }
        }
    }

    let valid: Vec<FoundAsset> = candidates.into_iter().filter(|a| is_valid_image_url(&a.url)).collect();
    let mut kept = diversity_filter(valid, settings.asset_finder_max_results);

    let recreated = if recreate_in_brand_style {
        recreate_assets(&mut kept, topic, company, settings, providers).await
    } else {
        Vec::new()
    };

    Ok((kept, attempts, recreated))
}

/// One asset recreated on-brand: the raw PNG bytes the caller must persist,
/// paired with the index into the returned `Vec<FoundAsset>` whose `url`
/// now holds the `asset://recreated/{index}` placeholder this replaces.
pub struct RecreatedAsset {
    /// Index into the `Vec<FoundAsset>` returned alongside this value.
    pub index: usize,
    /// Raw PNG bytes from the image LLM.
    pub bytes: Vec<u8>,
}

/// Ask the grounded text LLM for a JSON array of image candidates (§4.5
/// step 2).
async fn fetch_llm_candidates(
    query: &str,
    providers: &ProviderSet,
) -> Result<(Vec<FoundAsset>, Vec<FailoverAttempt>), CoreError> {
    let system = "You find relevant, freely usable stock images. Respond with a JSON array of \
        candidates only, no commentary, no markdown code fences. Prefer royalty-free stock photo \
        sites.";
    let user_message = format!(
        "Find 5-10 image candidates for this query: {query}\n\n\
         Each item needs at least `url`; fill in `title`, `description`, `source_site`, `kind`, \
         `width`, `height`, `license` when known."
    );
    let params = GenerationParams {
        enable_web_search: true,
        response_schema: Some(ASSET_CANDIDATE_SCHEMA.to_string()),
        system_prompt: Some(system.to_string()),
        max_tokens: 2048,
        temperature: 0.3,
    };

    let (response, attempts) = providers.generate_text(system, &user_message, &params).await?;
    let candidates = parse_candidates(&response.text).unwrap_or_default();
    Ok((candidates, attempts))
}

#[derive(Deserialize)]
struct RawCandidate {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    source_site: String,
    #[serde(default)]
    kind: Option<AssetKind>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    license: Option<String>,
}

fn parse_candidates(text: &str) -> Option<Vec<FoundAsset>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    let raw: Vec<RawCandidate> = serde_json::from_str(&text[start..=end]).ok()?;
    Some(
        raw.into_iter()
            .map(|c| {
                let source_site = if c.source_site.is_empty() {
                    domain_of(&c.url).unwrap_or_default()
                } else {
                    c.source_site
                };
                FoundAsset {
                    url: c.url,
                    title: c.title,
                    description: c.description,
                    source_site,
                    kind: c.kind.unwrap_or(AssetKind::Photo),
                    width: c.width,
                    height: c.height,
                    license: c.license,
                    recreated: false,
                }
            })
            .collect(),
    )
}

/// §4.5 step 4: the URL must be HTTP/HTTPS and either carry a recognized
/// image extension or point at a known image-hosting domain.
fn is_valid_image_url(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    if KNOWN_IMAGE_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h)) {
        return true;
    }
    let path = parsed.path().to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(&format!(".{ext}")))
}

fn domain_of(url: &str) -> Option<String> {
    url::Url::parse(url).ok()?.host_str().map(str::to_string)
}

/// §4.5 step 5: at most 2 per domain, at most 2 per source site, no
/// duplicate URLs, capped at `max`.
fn diversity_filter(candidates: Vec<FoundAsset>, max: usize) -> Vec<FoundAsset> {
    let mut seen_urls = std::collections::HashSet::new();
    let mut per_domain: HashMap<String, usize> = HashMap::new();
    let mut per_source: HashMap<String, usize> = HashMap::new();
    let mut kept = Vec::new();

    for candidate in candidates {
        if kept.len() >= max {
            break;
        }
        if !seen_urls.insert(candidate.url.clone()) {
            continue;
        }
        let domain = domain_of(&candidate.url).unwrap_or_default();
        let domain_count = per_domain.get(&domain).copied().unwrap_or(0);
        let source_count = per_source.get(&candidate.source_site).copied().unwrap_or(0);
        if domain_count >= 2 || source_count >= 2 {
            continue;
        }
        *per_domain.entry(domain).or_insert(0) += 1;
        *per_source.entry(candidate.source_site.clone()).or_insert(0) += 1;
        kept.push(candidate);
    }

    kept
}

/// Industry → color-palette hint, used only when no brand `VisualIdentity`
/// colors are present.
fn industry_palette(industry: &str) -> &'static str {
    let lower = industry.to_lowercase();
    if lower.contains("coffee") || lower.contains("food") {
        "warm browns and creams"
    } else if lower.contains("tech") || lower.contains("software") {
        "cool blues and grays"
    } else if lower.contains("health") || lower.contains("wellness") {
        "soft greens and whites"
    } else if lower.contains("finance") {
        "navy and gold"
    } else {
        "neutral, professional tones"
    }
}

/// Brand tone → style-keyword hint for the recreate-in-brand-style prompt.
fn tone_style_keyword(tone: &str) -> &'static str {
    match tone.to_lowercase().as_str() {
        "playful" => "bright, whimsical, illustrative",
        "luxury" | "premium" => "elegant, minimal, high-contrast",
        "friendly" => "warm, approachable, candid",
        "bold" => "high-energy, saturated, dynamic",
        _ => "clean, professional, realistic",
    }
}

/// §4.5 step 6: recreate up to `settings.asset_finder_max_recreated` kept
/// assets via C6, replacing the found URL with a freshly generated one
/// when generation succeeds. Generation failures are non-fatal: the
/// original asset is kept unmodified.
async fn recreate_assets(
    assets: &mut [FoundAsset],
    topic: &str,
    company: &CompanyContext,
    settings: &PipelineSettings,
    providers: &ProviderSet,
) -> Vec<RecreatedAsset> {
    let limit = settings.asset_finder_max_recreated.min(assets.len());
    let mut recreated = Vec::new();
    for (index, asset) in assets.iter_mut().enumerate().take(limit) {
        let prompt = recreate_prompt(topic, company, asset);
        match providers.generate_image(&prompt, &ImageOptions::default()).await {
            Ok(bytes) => {
                asset.recreated = true;
                asset.url = format!("asset://recreated/{index}");
                recreated.push(RecreatedAsset { index, bytes });
            }
            Err(err) => {
                tracing::warn!(error = %err, url = %asset.url, "asset recreation failed, keeping original");
            }
        }
    }
    recreated
}

fn recreate_prompt(topic: &str, company: &CompanyContext, _asset: &FoundAsset) -> String {
    if company.visual_identity.is_some() {
        // Reuse C6's per-slot prompt assembly (mid framing is a reasonable
        // default angle for a recreated supporting image).
        return build_image_prompt(topic, company, crate::domain::ImageSlot::Mid);
    }
    let industry = if company.industry.is_empty() { "professional" } else { &company.industry };
    format!(
        "Professional photo for {industry} blog. Topic: {topic}. Palette: {}. Style: {}. \
         Modern, clean, realistic. NO text, NO words, NO letters, NO logos, NO watermarks. 16:9 ratio.",
        industry_palette(&company.industry),
        tone_style_keyword(&company.tone),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssetKind;

    fn asset(url: &str, source_site: &str) -> FoundAsset {
        FoundAsset {
            url: url.to_string(),
            title: "t".into(),
            description: "d".into(),
            source_site: source_site.to_string(),
            kind: AssetKind::Photo,
            width: None,
            height: None,
            license: None,
            recreated: false,
        }
    }

    #[test]
    fn valid_image_url_requires_http_scheme() {
        assert!(!is_valid_image_url("ftp://example.com/a.jpg"));
        assert!(is_valid_image_url("https://example.com/a.jpg"));
    }

    #[test]
    fn valid_image_url_accepts_known_hosts_without_extension() {
        assert!(is_valid_image_url("https://images.unsplash.com/photo-123"));
    }

    #[test]
    fn valid_image_url_rejects_unknown_host_without_extension() {
        assert!(!is_valid_image_url("https://example.com/article"));
    }

    #[test]
    fn diversity_filter_caps_per_domain() {
        let candidates = vec![
            asset("https://a.com/1.jpg", "a.com"),
            asset("https://a.com/2.jpg", "a.com"),
            asset("https://a.com/3.jpg", "a.com"),
            asset("https://b.com/1.jpg", "b.com"),
        ];
        let kept = diversity_filter(candidates, 10);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn diversity_filter_drops_duplicate_urls() {
        let candidates = vec![asset("https://a.com/1.jpg", "a.com"), asset("https://a.com/1.jpg", "a.com")];
        let kept = diversity_filter(candidates, 10);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn diversity_filter_respects_cap() {
        let candidates = vec![
            asset("https://a.com/1.jpg", "a.com"),
            asset("https://b.com/1.jpg", "b.com"),
            asset("https://c.com/1.jpg", "c.com"),
        ];
        let kept = diversity_filter(candidates, 2);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn build_search_query_includes_stock_site_hints() {
        let q = build_search_query("coffee makers", None);
        assert!(q.contains("coffee makers"));
        assert!(q.contains("unsplash.com"));
    }
}
