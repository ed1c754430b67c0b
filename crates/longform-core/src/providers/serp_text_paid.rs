//! Paid text-SERP provider — same task-submit/task-poll protocol as
//! `serp_images_secondary`, used only as a fallback text-search input to
//! C5/C7 (§4.1: "30% cheaper per-query than 'live' mode; use only as
//! fallback").

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::task_poll::{run_task_future, PollOutcome};
use super::{http_client_with_timeout, TextSearchProvider};
use crate::error::ProviderError;

const TASK_POST_URL: &str = "https://api.dataforseo.com/v3/serp/google/organic/task_post";
const TASK_GET_URL: &str = "https://api.dataforseo.com/v3/serp/google/organic/task_get";
const POLL_TIMEOUT: Duration = Duration::from_secs(10);

const STATUS_STILL_PROCESSING: &[u32] = &[20100, 20101, 20102];
const STATUS_DONE: u32 = 20000;

/// Location-code table carried verbatim from the original implementation's
/// `dataforseo_provider.py::LOCATION_CODES` (§6: "implementations must
/// carry the full table used by the source"). Shared by the SERP-images
/// secondary provider, which targets the same backend.
pub fn location_codes() -> &'static HashMap<&'static str, u32> {
    static CODES: OnceLock<HashMap<&'static str, u32>> = OnceLock::new();
    CODES.get_or_init(|| {
        HashMap::from([
            ("us", 2840),
            ("uk", 2826),
            ("gb", 2826),
            ("ca", 2124),
            ("au", 2036),
            ("de", 2276),
            ("fr", 2250),
            ("es", 2724),
            ("it", 2380),
            ("jp", 2392),
            ("br", 2076),
            ("in", 2356),
            ("mx", 2484),
            ("nl", 2528),
            ("se", 2752),
            ("pl", 2616),
            ("ch", 2756),
            ("at", 2040),
            ("be", 2056),
        ])
    })
}

const DEFAULT_LOCATION_CODE: u32 = 2840;

/// Resolve a market/country code (case-insensitive) to a DataForSEO
/// location code, defaulting to the United States.
pub fn location_code_for(market: &str) -> u32 {
    location_codes()
        .get(market.to_lowercase().as_str())
        .copied()
        .unwrap_or(DEFAULT_LOCATION_CODE)
}

/// Task-submit/task-poll paid organic-search adapter.
pub struct SerpTextPaid {
    client: reqwest::Client,
    post_url: String,
    get_url: String,
    basic_auth: Option<String>,
}

impl SerpTextPaid {
    /// Build a provider with the default endpoints.
    pub fn new(basic_auth: Option<String>) -> Self {
        Self {
            client: http_client_with_timeout(POLL_TIMEOUT),
            post_url: TASK_POST_URL.to_string(),
            get_url: TASK_GET_URL.to_string(),
            basic_auth,
        }
    }

    /// Build a provider against custom endpoints (for testing).
    pub fn with_urls(basic_auth: Option<String>, post_url: String, get_url: String) -> Self {
        Self {
            client: http_client_with_timeout(POLL_TIMEOUT),
            post_url,
            get_url,
            basic_auth,
        }
    }

    async fn submit_task(&self, auth: &str, query: &str, market: &str) -> Result<String, ProviderError> {
        let payload = vec![TaskPostBody {
            keyword: query,
            location_code: location_code_for(market),
            language_code: "en",
            depth: 20,
            priority: 1,
        }];

        let response = self
            .client
            .post(&self.post_url)
            .header("Authorization", format!("Basic {auth}"))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(ProviderError::Api {
                status,
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: TaskPostResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse task_post response: {e}")))?;

        body.tasks
            .into_iter()
            .next()
            .and_then(|t| t.id)
            .ok_or_else(|| ProviderError::Parse("task_post response contained no task id".into()))
    }

    async fn poll_once(&self, auth: &str, task_id: &str) -> Result<PollOutcome<Vec<String>>, ProviderError> {
        let url = format!("{}/{task_id}", self.get_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Basic {auth}"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(PollOutcome::Pending);
        }

        let body: TaskGetResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse task_get response: {e}")))?;

        let Some(task) = body.tasks.into_iter().next() else {
            return Ok(PollOutcome::Pending);
        };

        if STATUS_STILL_PROCESSING.contains(&task.status_code) {
            return Ok(PollOutcome::Pending);
        }

        if task.status_code == STATUS_DONE {
            let links = task
                .result
                .into_iter()
                .next()
                .map(|r| r.items)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|item| item.url)
                .collect();
            return Ok(PollOutcome::Done(links));
        }

        Err(ProviderError::TaskFailed {
            task_id: task_id.to_string(),
            message: task
                .status_message
                .unwrap_or_else(|| format!("task failed with status {}", task.status_code)),
        })
    }
}

#[async_trait::async_trait]
impl TextSearchProvider for SerpTextPaid {
    fn name(&self) -> &str {
        "serp-text-paid"
    }

    fn is_configured(&self) -> bool {
        self.basic_auth.as_deref().is_some_and(|a| !a.is_empty())
    }

    fn cost_per_thousand_estimate(&self) -> f64 {
        0.5
    }

    async fn search_text(&self, query: &str, market: &str) -> Result<Vec<String>, ProviderError> {
        let auth = self
            .basic_auth
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured(self.name().to_string()))?;

        run_task_future(
            || async move { self.submit_task(auth, query, market).await },
            |task_id| async move { self.poll_once(auth, &task_id).await },
        )
        .await
    }
}

// --- Internal Serde types ---

#[derive(Serialize)]
struct TaskPostBody<'a> {
    keyword: &'a str,
    location_code: u32,
    language_code: &'a str,
    depth: u32,
    priority: u32,
}

#[derive(Deserialize)]
struct TaskPostResponse {
    #[serde(default)]
    tasks: Vec<TaskPostTask>,
}

#[derive(Deserialize)]
struct TaskPostTask {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct TaskGetResponse {
    #[serde(default)]
    tasks: Vec<TaskGetTask>,
}

#[derive(Deserialize)]
struct TaskGetTask {
    status_code: u32,
    #[serde(default)]
    status_message: Option<String>,
    #[serde(default)]
    result: Vec<TaskResult>,
}

#[derive(Deserialize)]
struct TaskResult {
    #[serde(default)]
    items: Vec<ResultItem>,
}

#[derive(Deserialize)]
struct ResultItem {
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn location_code_known_markets() {
        assert_eq!(location_code_for("US"), 2840);
        assert_eq!(location_code_for("uk"), 2826);
        assert_eq!(location_code_for("DE"), 2276);
    }

    #[test]
    fn location_code_defaults_to_us_for_unknown_market() {
        assert_eq!(location_code_for("zz"), 2840);
    }

    #[tokio::test]
    async fn search_text_submits_then_polls_to_completion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/post"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tasks": [{"id": "task-1"}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/get/task-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tasks": [{
                    "status_code": 20000,
                    "result": [{"items": [{"url": "https://example.com/a"}]}]
                }]
            })))
            .mount(&server)
            .await;

        let provider = SerpTextPaid::with_urls(
            Some("auth".into()),
            format!("{}/post", server.uri()),
            format!("{}/get", server.uri()),
        );

        let links = provider.search_text("coffee", "US").await.expect("search_text");
        assert_eq!(links, vec!["https://example.com/a".to_string()]);
    }

    #[tokio::test]
    async fn not_configured_without_basic_auth() {
        let provider = SerpTextPaid::new(None);
        assert!(!provider.is_configured());
    }
}
