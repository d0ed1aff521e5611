//! Image synthesis and outpainting client (OpenAI images API).

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lofi_jobs::{JobError, JobResult};

/// Configuration shared by the OpenAI-backed clients.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Create config from environment variables. The API key is a hard
    /// precondition: without it every request is doomed, so we refuse
    /// before any network traffic.
    pub fn from_env() -> JobResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| JobError::submission("OPENAI_API_KEY not set"))?;
        Ok(Self {
            api_key,
            base_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            timeout: Duration::from_secs(
                std::env::var("OPENAI_API_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

/// Client for image generation and edits.
pub struct ImageClient {
    http: Client,
    config: OpenAiConfig,
}

impl ImageClient {
    pub fn new(config: OpenAiConfig) -> JobResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> JobResult<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    /// Generate a 1024x1024 image; returns the artifact URL.
    pub async fn generate(&self, prompt: &str) -> JobResult<String> {
        let url = format!("{}/images/generations", self.config.base_url);
        debug!(url, "requesting cover image");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&GenerationRequest {
                prompt,
                n: 1,
                size: "1024x1024",
            })
            .send()
            .await?;

        let body = Self::check(response).await?;
        Self::first_url(body)
    }

    /// Outpaint an image. The image doubles as its own mask: its
    /// transparent region is the area to fill.
    pub async fn edit(&self, image_path: &Path, prompt: &str) -> JobResult<String> {
        // Preconditions are checked before spending any quota.
        if !image_path.is_file() {
            return Err(JobError::submission(format!(
                "edit input does not exist: {}",
                image_path.display()
            )));
        }
        if image_path
            .extension()
            .map(|e| !e.eq_ignore_ascii_case("png"))
            .unwrap_or(true)
        {
            return Err(JobError::submission(format!(
                "edit input must be a PNG: {}",
                image_path.display()
            )));
        }

        let bytes = tokio::fs::read(image_path).await?;
        let form = Form::new()
            .part(
                "image",
                Part::bytes(bytes.clone())
                    .file_name("image.png")
                    .mime_str("image/png")?,
            )
            .part(
                "mask",
                Part::bytes(bytes)
                    .file_name("mask.png")
                    .mime_str("image/png")?,
            )
            .text("prompt", prompt.to_string())
            .text("n", "1")
            .text("size", "1024x1024");

        let url = format!("{}/images/edits", self.config.base_url);
        info!(input = %image_path.display(), "submitting outpaint edit");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let body = Self::check(response).await?;
        Self::first_url(body)
    }

    async fn check(response: reqwest::Response) -> JobResult<ImagesResponse> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(JobError::submission(format!(
                "image service returned {status}: {body}"
            )));
        }
        Ok(response.json().await?)
    }

    fn first_url(body: ImagesResponse) -> JobResult<String> {
        body.data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or_else(|| JobError::malformed("image response carried no url"))
    }
}
