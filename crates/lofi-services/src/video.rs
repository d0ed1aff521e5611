//! Video synthesis client (RunwayML image-to-video).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lofi_jobs::{wait_for, JobError, JobResult, PollOutcome, PollPolicy};
use lofi_models::{Job, JobKind};

const API_VERSION_HEADER: &str = "X-Runway-Version";

/// Configuration for the video synthesis service.
#[derive(Debug, Clone)]
pub struct VideoConfig {
    pub api_key: String,
    pub base_url: String,
    pub api_version: String,
    pub model: String,
    pub timeout: Duration,
}

impl VideoConfig {
    pub fn from_env() -> JobResult<Self> {
        let api_key = std::env::var("RUNWAYML_API_KEY")
            .map_err(|_| JobError::submission("RUNWAYML_API_KEY not set"))?;
        Ok(Self {
            api_key,
            base_url: std::env::var("RUNWAYML_API_URL")
                .unwrap_or_else(|_| "https://api.dev.runwayml.com".to_string()),
            api_version: "2024-11-06".to_string(),
            model: std::env::var("RUNWAYML_MODEL").unwrap_or_else(|_| "gen3a_turbo".to_string()),
            timeout: Duration::from_secs(30),
        })
    }
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    #[serde(rename = "promptImage")]
    prompt_image: Vec<PromptImage<'a>>,
    #[serde(rename = "promptText")]
    prompt_text: &'a str,
    model: &'a str,
    duration: u32,
}

#[derive(Debug, Serialize)]
struct PromptImage<'a> {
    uri: &'a str,
    position: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: Option<String>,
}

/// Task status snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskInfo {
    pub status: String,
    #[serde(default)]
    pub output: Vec<String>,
}

/// Client for the video synthesis service.
pub struct VideoClient {
    http: Client,
    config: VideoConfig,
}

impl VideoClient {
    pub fn new(config: VideoConfig) -> JobResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> JobResult<Self> {
        Self::new(VideoConfig::from_env()?)
    }

    /// Submit an image-to-video task. The cover is pinned as both the
    /// first and last frame so the clip loops cleanly.
    pub async fn submit(
        &self,
        image_url: &str,
        prompt_text: &str,
        duration: u32,
    ) -> JobResult<Job> {
        let url = format!("{}/v1/image_to_video", self.config.base_url);
        debug!(url, image_url, "submitting video generation task");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header(API_VERSION_HEADER, &self.config.api_version)
            .json(&SubmitRequest {
                prompt_image: vec![
                    PromptImage {
                        uri: image_url,
                        position: "first",
                    },
                    PromptImage {
                        uri: image_url,
                        position: "last",
                    },
                ],
                prompt_text,
                model: &self.config.model,
                duration,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(JobError::submission(format!(
                "video service returned {status}: {body}"
            )));
        }

        let body: SubmitResponse = response.json().await?;
        let id = body
            .id
            .ok_or_else(|| JobError::malformed("task id missing from submit response"))?;

        info!(task_id = %id, "video task submitted");
        Ok(Job::submitted(id, JobKind::Video))
    }

    /// Query one task.
    pub async fn task(&self, task_id: &str) -> JobResult<TaskInfo> {
        let url = format!("{}/v1/tasks/{}", self.config.base_url, task_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .header(API_VERSION_HEADER, &self.config.api_version)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Poll the task to completion and resolve its first output URL.
    pub async fn wait_for_output(&self, task_id: &str, policy: &PollPolicy) -> JobResult<String> {
        wait_for(policy, "video_task", || async move {
            let task = self.task(task_id).await?;
            match task.status.as_str() {
                "SUCCEEDED" => {
                    let url = task.output.into_iter().next().ok_or_else(|| {
                        JobError::malformed("succeeded task carried no output urls")
                    })?;
                    Ok(PollOutcome::Ready(url))
                }
                "FAILED" | "CANCELLED" => Ok(PollOutcome::Failed(task.status)),
                _ => Ok(PollOutcome::Pending),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> VideoClient {
        VideoClient::new(VideoConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            api_version: "2024-11-06".to_string(),
            model: "gen3a_turbo".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn quick_policy() -> PollPolicy {
        PollPolicy::new(Duration::from_millis(1), 10)
    }

    #[tokio::test]
    async fn test_submit_returns_task_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/image_to_video"))
            .and(header(API_VERSION_HEADER, "2024-11-06"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-42"})))
            .mount(&server)
            .await;

        let job = client_for(&server)
            .submit("https://site/cover.png", "static camera", 5)
            .await
            .unwrap();
        assert_eq!(job.id, "task-42");
        assert_eq!(job.kind, JobKind::Video);
    }

    #[tokio::test]
    async fn test_submit_without_id_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/image_to_video"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "PENDING"})))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .submit("https://site/cover.png", "static camera", 5)
            .await;
        assert!(matches!(result, Err(JobError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_wait_for_output_resolves_first_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tasks/task-42"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "RUNNING"})),
            )
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/tasks/task-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"status": "SUCCEEDED", "output": ["https://cdn/clip.mp4"]}),
            ))
            .mount(&server)
            .await;

        let url = client_for(&server)
            .wait_for_output("task-42", &quick_policy())
            .await
            .unwrap();
        assert_eq!(url, "https://cdn/clip.mp4");
    }

    #[tokio::test]
    async fn test_wait_for_output_fails_on_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tasks/task-42"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "CANCELLED"})),
            )
            .mount(&server)
            .await;

        let result = client_for(&server)
            .wait_for_output("task-42", &quick_policy())
            .await;
        match result {
            Err(JobError::Failed { status }) => assert_eq!(status, "CANCELLED"),
            other => panic!("expected Failed, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_succeeded_without_output_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tasks/task-42"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "SUCCEEDED", "output": []})),
            )
            .mount(&server)
            .await;

        let result = client_for(&server)
            .wait_for_output("task-42", &quick_policy())
            .await;
        assert!(matches!(result, Err(JobError::MalformedResponse(_))));
    }
}
