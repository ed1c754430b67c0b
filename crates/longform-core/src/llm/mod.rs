//! LLM provider abstractions: a grounded text generator (C1 text-generate)
//! and an image generator (C1 image-generate).

pub mod anthropic;
pub mod image;
pub mod openai_compat;
pub mod pricing;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;

use crate::error::ProviderError;

/// Token usage information from an LLM completion.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the input/prompt.
    pub input_tokens: u32,
    /// Number of tokens in the output/completion.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Accumulate token counts from another usage record (e.g. across a
    /// repair-call retry).
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Response from a text-generation completion request.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The generated text content, verbatim (may be mixed HTML/markdown;
    /// normalizing it is the post-processor's job, not the adapter's).
    pub text: String,
    /// Token usage for this completion.
    pub usage: TokenUsage,
    /// The model that produced this response.
    pub model: String,
}

/// Parameters controlling text-generation behavior (§4.1).
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 = deterministic, 1.0+ = creative).
    pub temperature: f32,
    /// Optional system prompt override. If `Some`, replaces the caller's
    /// system prompt.
    pub system_prompt: Option<String>,
    /// Enable web-search grounding. Callers enabling this MUST NOT set a
    /// timeout below 60s (enforced by the adapter, not the caller).
    pub enable_web_search: bool,
    /// A JSON-schema description the response must conform to. When set,
    /// the adapter appends a schema-following instruction to the prompt
    /// and the caller is responsible for parsing/repair (C7 §4.7 step 3).
    pub response_schema: Option<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
            system_prompt: None,
            enable_web_search: false,
            response_schema: None,
        }
    }
}

/// Trait abstracting the grounded text-generation operation.
///
/// Object-safe for use as `Box<dyn TextLlmProvider>`. Implementations:
/// `anthropic::AnthropicProvider` (primary, supports web-search grounding)
/// and `openai_compat::OpenAiCompatProvider` (fallback).
#[async_trait::async_trait]
pub trait TextLlmProvider: Send + Sync {
    /// Display name (e.g. "anthropic", "openai").
    fn name(&self) -> &str;

    /// Whether this adapter has the credentials it needs.
    fn is_configured(&self) -> bool;

    /// Estimated cost per 1,000 calls, for reporting only.
    fn cost_per_thousand_estimate(&self) -> f64;

    /// Send a completion request.
    async fn complete(
        &self,
        system: &str,
        user_message: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, ProviderError>;

    /// Check if the provider is reachable and configured correctly.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Trait abstracting the image-generation operation (C1 image-generate).
#[async_trait::async_trait]
pub trait ImageLlmProvider: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;

    /// Whether this adapter has the credentials it needs.
    fn is_configured(&self) -> bool;

    /// Estimated cost per 1,000 calls, for reporting only.
    fn cost_per_thousand_estimate(&self) -> f64;

    /// Generate a single PNG image from a prompt.
    async fn generate_image(
        &self,
        prompt: &str,
        options: &image::ImageOptions,
    ) -> Result<Vec<u8>, ProviderError>;
}
