//! SERP-image provider (secondary) — task-submit/task-poll protocol (§4.1,
//! §6). Shares the backoff schedule in `task_poll` with the paid text-SERP
//! provider, since both sit behind the same task-submit/task-poll backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::serp_text_paid::location_code_for;
use super::task_poll::{run_task_future, PollOutcome};
use super::{http_client_with_timeout, ImageHit, ImageSearchOptions, ImageSearchProvider};
use crate::error::ProviderError;

const TASK_POST_URL: &str = "https://api.dataforseo.com/v3/serp/google/images/task_post";
const TASK_GET_URL: &str = "https://api.dataforseo.com/v3/serp/google/images/task_get/advanced";
const POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// The type tag a task-poll result item must carry to be treated as an
/// image record (§6: "a nested structure where image records are items
/// whose type tag equals an expected sentinel").
const IMAGES_SEARCH_SENTINEL: &str = "images_search";

/// Status codes treated as "still processing" (§9 Open Question, resolved
/// here by following the provider's documented code for "task created /
/// being processed", reused across its created/queued/processing phases
/// since the source observes only one code for all three).
const STATUS_STILL_PROCESSING: &[u32] = &[20100, 20101, 20102];
/// Status code that indicates the task finished and results are ready.
const STATUS_DONE: u32 = 20000;

/// Task-submit/task-poll Google-Images SERP adapter.
pub struct SerpImagesSecondary {
    client: reqwest::Client,
    post_url: String,
    get_url: String,
    basic_auth: Option<String>,
}

impl SerpImagesSecondary {
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

    async fn submit_task(
        &self,
        auth: &str,
        query: &str,
        max: usize,
        market: &str,
    ) -> Result<String, ProviderError> {
        let payload = vec![TaskPostBody {
            keyword: query,
            location_code: location_code_for(market),
            language_code: "en",
            depth: max.min(100) as u32,
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

        let task = body
            .tasks
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("task_post response contained no tasks".into()))?;

        task.id
            .ok_or_else(|| ProviderError::Parse("task_post response contained no task id".into()))
    }

    async fn poll_once(&self, auth: &str, task_id: &str) -> Result<PollOutcome<Vec<ImageHit>>, ProviderError> {
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
            let items = task
                .result
                .into_iter()
                .next()
                .map(|r| r.items)
                .unwrap_or_default();
            let hits = items
                .into_iter()
                .filter(|item| item.item_type.as_deref() == Some(IMAGES_SEARCH_SENTINEL))
                .filter_map(|item| item.image)
                .map(|img| ImageHit {
                    url: img.url,
                    width: img.width,
                    height: img.height,
                    thumbnail: img.thumbnail,
                    license: img.license,
                    title: img.title,
                })
                .collect();
            return Ok(PollOutcome::Done(hits));
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
impl ImageSearchProvider for SerpImagesSecondary {
    fn name(&self) -> &str {
        "serp-images-secondary"
    }

    fn is_configured(&self) -> bool {
        self.basic_auth.as_deref().is_some_and(|a| !a.is_empty())
    }

    fn cost_per_thousand_estimate(&self) -> f64 {
        0.5
    }

    async fn search_images(
        &self,
        query: &str,
        options: &ImageSearchOptions,
    ) -> Result<Vec<ImageHit>, ProviderError> {
        let auth = self
            .basic_auth
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured(self.name().to_string()))?;

        let max = options.max;
        let market = options.market.clone();
        let hits = run_task_future(
            || async move { self.submit_task(auth, query, max, &market).await },
            |task_id| async move { self.poll_once(auth, &task_id).await },
        )
        .await?;

        Ok(hits.into_iter().take(options.max).collect())
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
    #[serde(rename = "type", default)]
    item_type: Option<String>,
    #[serde(default)]
    image: Option<ImagePayload>,
}

#[derive(Deserialize)]
struct ImagePayload {
    url: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_images_submits_then_polls_to_completion() {
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
                    "result": [{
                        "items": [
                            {"type": "images_search", "image": {"url": "https://img.test/a.jpg", "width": 800, "height": 600}},
                            {"type": "other", "image": {"url": "https://img.test/skip.jpg"}}
                        ]
                    }]
                }]
            })))
            .mount(&server)
            .await;

        let provider = SerpImagesSecondary::with_urls(
            Some("auth".into()),
            format!("{}/post", server.uri()),
            format!("{}/get", server.uri()),
        );

        let hits = provider
            .search_images("coffee", &ImageSearchOptions::default())
            .await
            .expect("search_images");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://img.test/a.jpg");
    }

    #[tokio::test]
    async fn not_configured_without_basic_auth() {
        let provider = SerpImagesSecondary::new(None);
        assert!(!provider.is_configured());
    }

    #[tokio::test]
    async fn task_failure_surfaces_as_task_failed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/post"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tasks": [{"id": "task-2"}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/get/task-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tasks": [{"status_code": 40501, "status_message": "invalid field"}]
            })))
            .mount(&server)
            .await;

        let provider = SerpImagesSecondary::with_urls(
            Some("auth".into()),
            format!("{}/post", server.uri()),
            format!("{}/get", server.uri()),
        );

        let err = provider
            .search_images("coffee", &ImageSearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::TaskFailed { .. }));
    }
}
