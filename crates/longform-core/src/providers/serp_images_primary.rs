//! SERP-image provider (primary) — single-request protocol (§4.1).

use std::time::Duration;

use serde::Deserialize;

use super::{http_client_with_timeout, ImageHit, ImageSearchOptions, ImageSearchProvider};
use crate::error::ProviderError;

const BASE_URL: &str = "https://serpapi.com/search";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Single-request Google-Images SERP adapter.
pub struct SerpImagesPrimary {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SerpImagesPrimary {
    /// Build a provider with the default endpoint.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: http_client_with_timeout(REQUEST_TIMEOUT),
            base_url: BASE_URL.to_string(),
            api_key,
        }
    }

    /// Build a provider against a custom endpoint (for testing).
    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        Self {
            client: http_client_with_timeout(REQUEST_TIMEOUT),
            base_url,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl ImageSearchProvider for SerpImagesPrimary {
    fn name(&self) -> &str {
        "serp-images-primary"
    }

    fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    fn cost_per_thousand_estimate(&self) -> f64 {
        10.0
    }

    async fn search_images(
        &self,
        query: &str,
        options: &ImageSearchOptions,
    ) -> Result<Vec<ImageHit>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured(self.name().to_string()))?;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("engine", "google_images"),
                ("q", query),
                ("api_key", api_key),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            if status == 429 {
                return Err(ProviderError::RateLimited {
                    retry_after_secs: 60,
                });
            }
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, message: body });
        }

        let body: SerpApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse SERP response: {e}")))?;

        let hits = body
            .images_results
            .into_iter()
            .take(options.max)
            .map(|r| ImageHit {
                url: r.original,
                width: r.original_width,
                height: r.original_height,
                thumbnail: r.thumbnail,
                license: None,
                title: r.title,
            })
            .collect();

        Ok(hits)
    }
}

#[derive(Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    images_results: Vec<SerpApiImage>,
}

#[derive(Deserialize)]
struct SerpApiImage {
    original: String,
    #[serde(default)]
    original_width: Option<u32>,
    #[serde(default)]
    original_height: Option<u32>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    title: Option<String>,
}
