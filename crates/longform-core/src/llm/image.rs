//! Image-LLM provider (§4.1 "Image LLM"). Retries on 429/503/timeout with
//! exponential backoff, capped at 3 attempts and 30s total wait; other
//! errors surface immediately. Output is always verified as a PNG.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ImageLlmProvider;
use crate::error::ProviderError;

const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const MAX_ATTEMPTS: u32 = 3;
const MAX_TOTAL_WAIT: Duration = Duration::from_secs(30);

/// Requested image size/aspect ratio.
#[derive(Debug, Clone)]
pub struct ImageOptions {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Aspect-ratio label, e.g. "16:9" (used for provider APIs that accept
    /// a ratio string instead of explicit dimensions).
    pub aspect_ratio: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            width: 1792,
            height: 1024,
            aspect_ratio: "16:9".to_string(),
        }
    }
}

/// Image-LLM provider using an OpenAI-compatible images API.
pub struct OpenAiImageProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiImageProvider {
    /// Create a provider against the default OpenAI images endpoint.
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key,
            model,
        }
    }

    /// Create a provider against a custom base URL (for testing).
    pub fn with_base_url(api_key: Option<String>, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    async fn generate_once(&self, prompt: &str, options: &ImageOptions) -> Result<Vec<u8>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("image-llm".into()))?;

        let request = ImageRequest {
            model: &self.model,
            prompt,
            size: &format!("{}x{}", options.width, options.height),
            response_format: "b64_json",
        };

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(api_key)
            .timeout(Duration::from_secs(60))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            if status == 429 || status == 503 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(5);
                return Err(ProviderError::RateLimited {
                    retry_after_secs: retry_after,
                });
            }
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, message: body });
        }

        let body: ImageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse image response: {e}")))?;

        let b64 = body
            .data
            .into_iter()
            .next()
            .map(|d| d.b64_json)
            .ok_or_else(|| ProviderError::Parse("image response contained no data".into()))?;

        let bytes = base64_decode(&b64)
            .map_err(|e| ProviderError::Parse(format!("invalid base64 image payload: {e}")))?;

        verify_png(&bytes)?;
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl ImageLlmProvider for OpenAiImageProvider {
    fn name(&self) -> &str {
        "image-llm"
    }

    fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    fn cost_per_thousand_estimate(&self) -> f64 {
        40.0
    }

    async fn generate_image(&self, prompt: &str, options: &ImageOptions) -> Result<Vec<u8>, ProviderError> {
        let mut attempt = 0u32;
        let mut waited = Duration::ZERO;
        let mut delay = Duration::from_millis(500);

        loop {
            attempt += 1;
            match self.generate_once(prompt, options).await {
                Ok(bytes) => return Ok(bytes),
                Err(err @ (ProviderError::RateLimited { .. } | ProviderError::Transport(_)))
                    if attempt < MAX_ATTEMPTS && waited + delay <= MAX_TOTAL_WAIT =>
                {
                    tracing::debug!(attempt, ?delay, "retrying image generation after {err}");
                    tokio::time::sleep(delay).await;
                    waited += delay;
                    delay *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn verify_png(bytes: &[u8]) -> Result<(), ProviderError> {
    if bytes.len() >= PNG_MAGIC.len() && &bytes[..PNG_MAGIC.len()] == PNG_MAGIC {
        Ok(())
    } else {
        Err(ProviderError::InvalidImage(
            "response body is not a valid PNG (magic bytes mismatch)".into(),
        ))
    }
}

fn base64_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(s)
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    b64_json: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tiny_png_b64() -> String {
        use base64::Engine;
        let mut png = PNG_MAGIC.to_vec();
        png.extend_from_slice(&[0, 0, 0, 0]);
        base64::engine::general_purpose::STANDARD.encode(png)
    }

    #[tokio::test]
    async fn generate_image_success_verifies_png() {
        let server = MockServer::start().await;
        let body = serde_json::json!({ "data": [{ "b64_json": tiny_png_b64() }] });

        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let provider =
            OpenAiImageProvider::with_base_url(Some("key".into()), "gpt-image-1".into(), server.uri());

        let bytes = provider
            .generate_image("a cat", &ImageOptions::default())
            .await
            .expect("generate_image");
        assert!(bytes.starts_with(PNG_MAGIC));
    }

    #[tokio::test]
    async fn non_png_payload_is_rejected() {
        let server = MockServer::start().await;
        use base64::Engine;
        let bad = base64::engine::general_purpose::STANDARD.encode(b"not a png");
        let body = serde_json::json!({ "data": [{ "b64_json": bad }] });

        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let provider =
            OpenAiImageProvider::with_base_url(Some("key".into()), "gpt-image-1".into(), server.uri());

        let err = provider
            .generate_image("a cat", &ImageOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidImage(_)));
    }

    #[tokio::test]
    async fn not_configured_without_api_key() {
        let provider = OpenAiImageProvider::new(None, "gpt-image-1".into());
        assert!(!provider.is_configured());
    }

    #[test]
    fn verify_png_rejects_short_buffer() {
        assert!(verify_png(&[0x89, 0x50]).is_err());
    }
}
