//! YouTube upload client.
//!
//! Auth is the OAuth refresh-token grant: a long-lived refresh token is
//! exchanged for an access token at upload time, so the pipeline never
//! needs an interactive login.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use lofi_jobs::{JobError, JobResult};
use lofi_models::VideoMetadata;

/// Configuration for the upload target.
#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub token_url: String,
    pub upload_url: String,
    pub timeout: Duration,
}

impl YoutubeConfig {
    pub fn from_env() -> JobResult<Self> {
        let client_id = std::env::var("YOUTUBE_CLIENT_ID")
            .map_err(|_| JobError::submission("YOUTUBE_CLIENT_ID not set"))?;
        let client_secret = std::env::var("YOUTUBE_CLIENT_SECRET")
            .map_err(|_| JobError::submission("YOUTUBE_CLIENT_SECRET not set"))?;
        let refresh_token = std::env::var("YOUTUBE_REFRESH_TOKEN")
            .map_err(|_| JobError::submission("YOUTUBE_REFRESH_TOKEN not set"))?;
        Ok(Self {
            client_id,
            client_secret,
            refresh_token,
            token_url: std::env::var("YOUTUBE_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
            upload_url: std::env::var("YOUTUBE_UPLOAD_URL").unwrap_or_else(|_| {
                "https://www.googleapis.com/upload/youtube/v3/videos".to_string()
            }),
            timeout: Duration::from_secs(600),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: Option<String>,
}

/// Client that publishes finished videos.
pub struct YoutubeClient {
    http: Client,
    config: YoutubeConfig,
}

impl YoutubeClient {
    pub fn new(config: YoutubeConfig) -> JobResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> JobResult<Self> {
        Self::new(YoutubeConfig::from_env()?)
    }

    /// Trade the refresh token for a short-lived access token.
    pub async fn authenticate(&self) -> JobResult<String> {
        debug!(url = %self.config.token_url, "refreshing access token");
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", self.config.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(JobError::submission(format!(
                "token refresh returned {status}: {body}"
            )));
        }

        let body: TokenResponse = response.json().await?;
        body.access_token
            .ok_or_else(|| JobError::malformed("token response carried no access_token"))
    }

    /// Upload one video with its metadata; returns the video id.
    pub async fn upload(&self, video_path: &Path, metadata: &VideoMetadata) -> JobResult<String> {
        if !video_path.is_file() {
            return Err(JobError::submission(format!(
                "upload input does not exist: {}",
                video_path.display()
            )));
        }

        let access_token = self.authenticate().await?;
        let body = json!({
            "snippet": {
                "title": metadata.title,
                "description": metadata.description,
                "tags": metadata.tags,
                "categoryId": metadata.category_id,
            },
            "status": {
                "privacyStatus": metadata.privacy,
            },
        });

        let video_bytes = tokio::fs::read(video_path).await?;
        let form = Form::new()
            .part(
                "metadata",
                Part::text(body.to_string()).mime_str("application/json")?,
            )
            .part(
                "video",
                Part::bytes(video_bytes)
                    .file_name("album.mp4")
                    .mime_str("video/mp4")?,
            );

        let url = format!(
            "{}?uploadType=multipart&part=snippet,status",
            self.config.upload_url
        );
        info!(title = %metadata.title, video = %video_path.display(), "uploading album video");

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(JobError::submission(format!(
                "video upload returned {status}: {body}"
            )));
        }

        let body: UploadResponse = response.json().await?;
        let id = body
            .id
            .ok_or_else(|| JobError::malformed("upload response carried no video id"))?;
        info!(video_id = %id, "album video published");
        Ok(id)
    }
}
