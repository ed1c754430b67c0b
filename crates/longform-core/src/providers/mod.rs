//! SERP provider adapters, the shared task-poll abstraction, and the C2
//! fallback router.

pub mod serp_images_primary;
pub mod serp_images_secondary;
pub mod serp_text_paid;
pub mod task_poll;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ProviderCredentials;
use crate::error::{CoreError, ProviderError};
use crate::llm::{image::OpenAiImageProvider, AnthropicProvider, ImageLlmProvider, OpenAiCompatProvider, TextLlmProvider};

/// One image search result, shared by both SERP-image providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageHit {
    /// Direct image URL.
    pub url: String,
    /// Pixel width, if known.
    pub width: Option<u32>,
    /// Pixel height, if known.
    pub height: Option<u32>,
    /// Thumbnail URL, if provided.
    pub thumbnail: Option<String>,
    /// License string, if provided.
    pub license: Option<String>,
    /// Source/title text, if provided.
    pub title: Option<String>,
}

/// Options shared by `search_images` callers.
#[derive(Debug, Clone)]
pub struct ImageSearchOptions {
    /// Preferred minimum size, as a hint only.
    pub size: Option<String>,
    /// Preferred license filter, as a hint only.
    pub license: Option<String>,
    /// Preferred image type (photo/illustration/etc.), as a hint only.
    pub image_type: Option<String>,
    /// Maximum results to return.
    pub max: usize,
    /// ISO-3166 alpha-2 market, used by providers whose backend is
    /// location-aware (the secondary SERP-images provider's DataForSEO
    /// backend; §6's location-code table).
    pub market: String,
}

impl Default for ImageSearchOptions {
    fn default() -> Self {
        Self {
            size: None,
            license: None,
            image_type: None,
            max: 10,
            market: "US".to_string(),
        }
    }
}

/// Narrow contract for a SERP image-search adapter (§4.1).
#[async_trait::async_trait]
pub trait ImageSearchProvider: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;
    /// Whether this adapter has the credentials it needs.
    fn is_configured(&self) -> bool;
    /// Estimated cost per 1,000 queries, for reporting only.
    fn cost_per_thousand_estimate(&self) -> f64;
    /// Run an image search.
    async fn search_images(
        &self,
        query: &str,
        options: &ImageSearchOptions,
    ) -> Result<Vec<ImageHit>, ProviderError>;
}

/// Narrow contract for the paid text-SERP provider (organic results only;
/// used as a text-search fallback input to C5/C7).
#[async_trait::async_trait]
pub trait TextSearchProvider: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;
    /// Whether this adapter has the credentials it needs.
    fn is_configured(&self) -> bool;
    /// Estimated cost per 1,000 queries, for reporting only.
    fn cost_per_thousand_estimate(&self) -> f64;
    /// Run an organic-results search.
    async fn search_text(&self, query: &str, market: &str) -> Result<Vec<String>, ProviderError>;
}

/// The logical operations the fallback router (C2) dispatches over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperation {
    /// Web search, used by C4/C5/C7's grounded LLM calls (not routed
    /// through C2 itself — grounding is a parameter on the text-LLM call —
    /// but tracked here for stage-report symmetry with the other ops.
    WebSearch,
    /// Image search, routed across the two SERP-image providers.
    ImageSearch,
    /// Image generation, single provider today but modeled for symmetry.
    ImageGenerate,
    /// Text generation, routed across the two text-LLM providers.
    TextGenerate,
}

impl LogicalOperation {
    fn label(self) -> &'static str {
        match self {
            LogicalOperation::WebSearch => "web-search",
            LogicalOperation::ImageSearch => "image-search",
            LogicalOperation::ImageGenerate => "image-generate",
            LogicalOperation::TextGenerate => "text-generate",
        }
    }
}

/// One attempt record, collected by the router and surfaced in the
/// article's `StageReport`.
#[derive(Debug, Clone)]
pub struct FailoverAttempt {
    /// The provider that was tried.
    pub provider: String,
    /// Why it didn't satisfy the request (`None` on success).
    pub error: Option<String>,
}

/// Every provider adapter the pipeline may call, passed explicitly through
/// the orchestrator rather than held in global state (§9 design note).
/// Lifetime ends with the batch.
pub struct ProviderSet {
    /// Ordered text-LLM providers, tried in order by the router.
    pub text_llms: Vec<Box<dyn TextLlmProvider>>,
    /// The image-LLM provider.
    pub image_llm: Box<dyn ImageLlmProvider>,
    /// Ordered image-search providers, tried in order by the router.
    pub image_search: Vec<Box<dyn ImageSearchProvider>>,
    /// The paid text-search provider (fallback only, per §4.1).
    pub text_search: Box<dyn TextSearchProvider>,
}

impl ProviderSet {
    /// Build the default provider set from credentials and settings.
    pub fn from_credentials(
        creds: &ProviderCredentials,
        settings: &crate::config::PipelineSettings,
    ) -> Self {
        let anthropic = AnthropicProvider::new(
            creds.text_llm_api_key.clone(),
            settings.text_llm_model.clone(),
        );
        let openai_fallback = OpenAiCompatProvider::new(
            "https://api.openai.com/v1".to_string(),
            creds.text_llm_api_key.clone(),
            "gpt-4o-mini".to_string(),
            "openai".to_string(),
        );
        let image_llm =
            OpenAiImageProvider::new(creds.image_llm_api_key.clone(), settings.image_llm_model.clone());
        let serp_primary = serp_images_primary::SerpImagesPrimary::new(creds.serp_images_primary_key.clone());
        let serp_secondary = serp_images_secondary::SerpImagesSecondary::new(
            creds.serp_secondary_basic_auth(),
        );
        let text_search = serp_text_paid::SerpTextPaid::new(creds.serp_secondary_basic_auth());

        Self {
            text_llms: vec![Box::new(anthropic), Box::new(openai_fallback)],
            image_llm: Box::new(image_llm),
            image_search: vec![Box::new(serp_primary), Box::new(serp_secondary)],
            text_search: Box::new(text_search),
        }
    }

    /// Try text-LLM providers in order; failover only on `QuotaExhausted`
    /// / `ProviderUnavailable` (C2 policy). Returns the response plus the
    /// attempt log for the stage report.
    pub async fn generate_text(
        &self,
        system: &str,
        user_message: &str,
        params: &crate::llm::GenerationParams,
    ) -> Result<(crate::llm::LlmResponse, Vec<FailoverAttempt>), CoreError> {
        let mut attempts = Vec::new();
        let mut most_severe: Option<CoreError> = None;

        for provider in &self.text_llms {
            if !provider.is_configured() {
                continue;
            }
            match provider.complete(system, user_message, params).await {
                Ok(resp) => {
                    attempts.push(FailoverAttempt {
                        provider: provider.name().to_string(),
                        error: None,
                    });
                    return Ok((resp, attempts));
                }
                Err(err) => {
                    let core_err = err.into_core(provider.name());
                    attempts.push(FailoverAttempt {
                        provider: provider.name().to_string(),
                        error: Some(core_err.to_string()),
                    });
                    let should_fail_over = core_err.triggers_failover();
                    let is_final_error = !should_fail_over;
                    most_severe = Some(core_err);
                    if is_final_error {
                        break;
                    }
                }
            }
        }

        Err(most_severe.unwrap_or_else(|| CoreError::ProviderUnavailable {
            provider: LogicalOperation::TextGenerate.label().to_string(),
            message: "no provider configured".to_string(),
        }))
    }

    /// Try image-search providers in order, same failover policy as text.
    pub async fn search_images(
        &self,
        query: &str,
        options: &ImageSearchOptions,
    ) -> Result<(Vec<ImageHit>, Vec<FailoverAttempt>), CoreError> {
        let mut attempts = Vec::new();
        let mut most_severe: Option<CoreError> = None;

        for provider in &self.image_search {
            if !provider.is_configured() {
                continue;
            }
            match provider.search_images(query, options).await {
                Ok(hits) => {
                    attempts.push(FailoverAttempt {
                        provider: provider.name().to_string(),
                        error: None,
                    });
                    return Ok((hits, attempts));
                }
                Err(err) => {
                    let core_err = err.into_core(provider.name());
                    attempts.push(FailoverAttempt {
                        provider: provider.name().to_string(),
                        error: Some(core_err.to_string()),
                    });
                    let should_fail_over = core_err.triggers_failover();
                    most_severe = Some(core_err);
                    if !should_fail_over {
                        break;
                    }
                }
            }
        }

        Err(most_severe.unwrap_or_else(|| CoreError::ProviderUnavailable {
            provider: LogicalOperation::ImageSearch.label().to_string(),
            message: "no provider configured".to_string(),
        }))
    }

    /// Generate a single image via the image-LLM (single provider, no
    /// failover chain — modeled for symmetry with the other operations).
    pub async fn generate_image(
        &self,
        prompt: &str,
        options: &crate::llm::image::ImageOptions,
    ) -> Result<Vec<u8>, CoreError> {
        self.image_llm
            .generate_image(prompt, options)
            .await
            .map_err(|e| e.into_core(self.image_llm.name()))
    }
}

/// Per-call timeout helper shared by the adapters below.
pub(crate) fn http_client_with_timeout(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFails;
    #[async_trait::async_trait]
    impl TextLlmProvider for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }
        fn is_configured(&self) -> bool {
            true
        }
        fn cost_per_thousand_estimate(&self) -> f64 {
            0.0
        }
        async fn complete(
            &self,
            _s: &str,
            _u: &str,
            _p: &crate::llm::GenerationParams,
        ) -> Result<crate::llm::LlmResponse, ProviderError> {
            Err(ProviderError::RateLimited {
                retry_after_secs: 1,
            })
        }
        async fn health_check(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    struct AlwaysInvalid;
    #[async_trait::async_trait]
    impl TextLlmProvider for AlwaysInvalid {
        fn name(&self) -> &str {
            "always-invalid"
        }
        fn is_configured(&self) -> bool {
            true
        }
        fn cost_per_thousand_estimate(&self) -> f64 {
            0.0
        }
        async fn complete(
            &self,
            _s: &str,
            _u: &str,
            _p: &crate::llm::GenerationParams,
        ) -> Result<crate::llm::LlmResponse, ProviderError> {
            Err(ProviderError::Api {
                status: 400,
                message: "bad".into(),
            })
        }
        async fn health_check(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    struct AlwaysSucceeds;
    #[async_trait::async_trait]
    impl TextLlmProvider for AlwaysSucceeds {
        fn name(&self) -> &str {
            "always-succeeds"
        }
        fn is_configured(&self) -> bool {
            true
        }
        fn cost_per_thousand_estimate(&self) -> f64 {
            0.0
        }
        async fn complete(
            &self,
            _s: &str,
            _u: &str,
            _p: &crate::llm::GenerationParams,
        ) -> Result<crate::llm::LlmResponse, ProviderError> {
            Ok(crate::llm::LlmResponse {
                text: "ok".into(),
                usage: Default::default(),
                model: "m".into(),
            })
        }
        async fn health_check(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn minimal_set(text_llms: Vec<Box<dyn TextLlmProvider>>) -> ProviderSet {
        ProviderSet {
            text_llms,
            image_llm: Box::new(OpenAiImageProvider::new(None, "m".into())),
            image_search: vec![],
            text_search: Box::new(serp_text_paid::SerpTextPaid::new(None)),
        }
    }

    #[tokio::test]
    async fn quota_exhaustion_fails_over_to_next_provider() {
        let set = minimal_set(vec![Box::new(AlwaysFails), Box::new(AlwaysSucceeds)]);
        let (resp, attempts) = set
            .generate_text("s", "u", &crate::llm::GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(resp.text, "ok");
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].error.is_some());
        assert!(attempts[1].error.is_none());
    }

    #[tokio::test]
    async fn invalid_output_does_not_fail_over() {
        let set = minimal_set(vec![Box::new(AlwaysInvalid), Box::new(AlwaysSucceeds)]);
        let err = set
            .generate_text("s", "u", &crate::llm::GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidOutput { .. }));
    }

    #[tokio::test]
    async fn no_configured_provider_is_unavailable() {
        let set = minimal_set(vec![]);
        let err = set
            .generate_text("s", "u", &crate::llm::GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ProviderUnavailable { .. }));
    }
}
