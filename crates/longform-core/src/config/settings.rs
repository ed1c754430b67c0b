//! Operational defaults: timeouts, retry/backoff constants, provider base
//! URLs and models. Not part of any single job — these are ambient and
//! loaded once per process.

use std::time::Duration;

/// Operational settings for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Text-LLM model identifier.
    pub text_llm_model: String,
    /// Image-LLM model identifier.
    pub image_llm_model: String,
    /// Minimum timeout for grounded text generation (§4.1: callers must
    /// not time out below 60s when web search is enabled).
    pub text_generate_timeout: Duration,
    /// Timeout for a single image-generation call.
    pub image_generate_timeout: Duration,
    /// Timeout for a single-request SERP call.
    pub serp_single_request_timeout: Duration,
    /// Timeout for one poll attempt against a task-poll provider.
    pub serp_poll_request_timeout: Duration,
    /// Per-article overall timeout.
    pub per_article_timeout: Duration,
    /// Per-batch overall timeout.
    pub per_batch_timeout: Duration,
    /// Hard timeout for aborting in-flight requests after cancellation.
    pub cancellation_grace_period: Duration,
    /// Maximum URLs retained after a sitemap crawl.
    pub sitemap_max_urls: usize,
    /// Maximum sitemap-index recursion depth.
    pub sitemap_max_depth: u32,
    /// Total time budget for a sitemap crawl.
    pub sitemap_crawl_budget: Duration,
    /// Whether the AI-assisted sitemap URL classifier may run.
    pub sitemap_ai_classification_enabled: bool,
    /// Maximum assets C5 returns per article.
    pub asset_finder_max_results: usize,
    /// Maximum images recreated on-brand per article (C5 step 6).
    pub asset_finder_max_recreated: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            text_llm_model: "claude-sonnet-4-5-20250514".to_string(),
            image_llm_model: "gpt-image-1".to_string(),
            text_generate_timeout: Duration::from_secs(60),
            image_generate_timeout: Duration::from_secs(60),
            serp_single_request_timeout: Duration::from_secs(30),
            serp_poll_request_timeout: Duration::from_secs(10),
            per_article_timeout: Duration::from_secs(10 * 60),
            per_batch_timeout: Duration::from_secs(60 * 60),
            cancellation_grace_period: Duration::from_secs(30),
            sitemap_max_urls: 2000,
            sitemap_max_depth: 3,
            sitemap_crawl_budget: Duration::from_secs(60),
            sitemap_ai_classification_enabled: false,
            asset_finder_max_results: 5,
            asset_finder_max_recreated: 3,
        }
    }
}

impl PipelineSettings {
    /// Apply `LONGFORM_`-prefixed environment overrides on top of defaults.
    pub fn from_env_overrides(mut self) -> Self {
        if let Some(v) = read_var("LONGFORM_TEXT_LLM_MODEL") {
            self.text_llm_model = v;
        }
        if let Some(v) = read_var("LONGFORM_IMAGE_LLM_MODEL") {
            self.image_llm_model = v;
        }
        if let Some(v) = read_duration_secs("LONGFORM_PER_ARTICLE_TIMEOUT_SECS") {
            self.per_article_timeout = v;
        }
        if let Some(v) = read_duration_secs("LONGFORM_PER_BATCH_TIMEOUT_SECS") {
            self.per_batch_timeout = v;
        }
        if let Some(v) = read_usize("LONGFORM_SITEMAP_MAX_URLS") {
            self.sitemap_max_urls = v;
        }
        if let Some(v) = read_bool("LONGFORM_SITEMAP_AI_CLASSIFICATION") {
            self.sitemap_ai_classification_enabled = v;
        }
        self
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_duration_secs(name: &str) -> Option<Duration> {
    read_var(name)
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn read_usize(name: &str) -> Option<usize> {
    read_var(name).and_then(|v| v.parse::<usize>().ok())
}

fn read_bool(name: &str) -> Option<bool> {
    read_var(name).and_then(|v| v.parse::<bool>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_satisfy_spec_minimums() {
        let s = PipelineSettings::default();
        assert!(s.text_generate_timeout >= Duration::from_secs(60));
        assert_eq!(s.sitemap_max_urls, 2000);
        assert_eq!(s.sitemap_max_depth, 3);
        assert_eq!(s.sitemap_crawl_budget, Duration::from_secs(60));
    }

    #[test]
    fn env_override_replaces_model() {
        std::env::set_var("LONGFORM_TEXT_LLM_MODEL", "claude-test-model");
        let s = PipelineSettings::default().from_env_overrides();
        assert_eq!(s.text_llm_model, "claude-test-model");
        std::env::remove_var("LONGFORM_TEXT_LLM_MODEL");
    }

    #[test]
    fn missing_env_override_keeps_default() {
        std::env::remove_var("LONGFORM_SITEMAP_MAX_URLS");
        let s = PipelineSettings::default().from_env_overrides();
        assert_eq!(s.sitemap_max_urls, 2000);
    }
}
