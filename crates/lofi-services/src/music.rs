//! Music synthesis client (Suno-style local API bridge).
//!
//! One generation request yields a pair of clips. Clips become
//! downloadable while still rendering ("streaming"), which is treated
//! as a success state for artifact resolution.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lofi_jobs::{wait_for, JobError, JobResult, PollOutcome, PollPolicy};
use lofi_models::{Job, JobKind};

/// Configuration for the music API bridge.
#[derive(Debug, Clone)]
pub struct MusicConfig {
    /// Base URL of the local API bridge.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl MusicConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("MUSIC_API_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            timeout: Duration::from_secs(
                std::env::var("MUSIC_API_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    make_instrumental: bool,
    wait_audio: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedClip {
    id: String,
}

/// Status snapshot of one clip.
#[derive(Debug, Clone, Deserialize)]
pub struct ClipStatus {
    pub id: String,
    pub status: String,
    pub audio_url: Option<String>,
}

/// A clip whose audio is ready to download.
#[derive(Debug, Clone)]
pub struct ClipAudio {
    pub id: String,
    pub url: String,
}

/// Client for the music synthesis bridge.
pub struct MusicClient {
    http: Client,
    config: MusicConfig,
}

impl MusicClient {
    pub fn new(config: MusicConfig) -> JobResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> JobResult<Self> {
        Self::new(MusicConfig::from_env())
    }

    /// Submit one generation request. The service answers with the clip
    /// pair it started; fewer than two ids is a contract violation.
    pub async fn generate(&self, prompt: &str, instrumental: bool) -> JobResult<Vec<Job>> {
        let url = format!("{}/api/generate", self.config.base_url);
        debug!(url, "submitting song generation");

        let response = self
            .http
            .post(&url)
            .json(&GenerateRequest {
                prompt,
                make_instrumental: instrumental,
                wait_audio: false,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(JobError::submission(format!(
                "music service returned {status}: {body}"
            )));
        }

        let clips: Vec<GeneratedClip> = response.json().await?;
        if clips.len() < 2 {
            return Err(JobError::malformed(format!(
                "expected a clip pair, got {} clip(s)",
                clips.len()
            )));
        }

        let jobs: Vec<Job> = clips
            .into_iter()
            .take(2)
            .map(|c| Job::submitted(c.id, JobKind::SongPair))
            .collect();

        info!(
            ids = %jobs.iter().map(|j| j.id.as_str()).collect::<Vec<_>>().join(","),
            "song pair submitted"
        );
        Ok(jobs)
    }

    /// Query the status of a set of clips.
    pub async fn clips(&self, ids: &[String]) -> JobResult<Vec<ClipStatus>> {
        let url = format!("{}/api/get?ids={}", self.config.base_url, ids.join(","));
        let response = self.http.get(&url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Poll until every clip of the pair has downloadable audio.
    ///
    /// A single `error` clip fails the whole pair; a pair where one side
    /// succeeded and the other failed is still a failed pair.
    pub async fn wait_for_audio(
        &self,
        ids: &[String],
        policy: &PollPolicy,
    ) -> JobResult<Vec<ClipAudio>> {
        wait_for(policy, "song_pair", || async move {
            let clips = self.clips(ids).await?;

            if let Some(bad) = clips.iter().find(|c| classify(&c.status) == Class::Failure) {
                return Ok(PollOutcome::Failed(bad.status.clone()));
            }

            if clips.is_empty() {
                return Ok(PollOutcome::Pending);
            }
            let mut audio = Vec::with_capacity(clips.len());
            for clip in clips {
                match (classify(&clip.status), clip.audio_url) {
                    (Class::Success, Some(url)) => audio.push(ClipAudio { id: clip.id, url }),
                    _ => return Ok(PollOutcome::Pending),
                }
            }
            Ok(PollOutcome::Ready(audio))
        })
        .await
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Class {
    Pending,
    Success,
    Failure,
}

/// Map the service's status vocabulary onto the shared pending /
/// success / failure set.
fn classify(status: &str) -> Class {
    match status {
        "streaming" | "complete" => Class::Success,
        "error" => Class::Failure,
        _ => Class::Pending,
    }
}
