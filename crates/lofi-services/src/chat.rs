//! Chat text service: prompt refinement, album metadata, and the
//! between-albums prompt mutation that keeps a batch from repeating
//! itself.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use lofi_jobs::{JobError, JobResult};

use crate::image::OpenAiConfig;

const MODEL: &str = "gpt-4o";

const REFINE_IMAGE_SYSTEM: &str = "You refine image prompts for AI image generation. \
    Make the user's prompt more descriptive, clear, and visually vivid: color, setting, \
    mood, style. The generated image must not contain any text. Keep it safe, avoid \
    copyrighted material, and reply with only the new prompt.";

const ALBUM_TITLE_SYSTEM: &str = "You create an album title from the user's album details. \
    The title is one specific, unique word (or very short phrase) relating to the \
    descriptions; experimental is fine, generic terms are not. Do not wrap the title in \
    quotes and reply with the title only.";

const VIDEO_DESCRIPTION_SYSTEM: &str = "You write a video description for an album. Strict \
    format: first an obscure old quote about life or philosophy, then the provided \
    timestamps one per row, each followed by a one-word song name you invent. Song names \
    relate to the album title and description and must not repeat. Reply with only the \
    quote, timestamps, and song names.";

const VARY_MUSIC_SYSTEM: &str = "You slightly edit the music description the user provides. \
    The surrounding program generates albums on repeat; alter the description so each album \
    is a little different. Keep the theme and style but swap words or topics (a country for \
    another country, jazz for bossa nova). Reply with only the new description.";

const VARY_COVER_SYSTEM: &str = "You edit the album cover description the user provides. \
    The surrounding program generates covers on repeat; make the description substantially \
    different each time. Keep the general theme and style but change objects, scenery, and \
    background. Reply with only the new cover description.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Client for chat completions.
pub struct ChatClient {
    http: Client,
    config: OpenAiConfig,
}

impl ChatClient {
    pub fn new(config: OpenAiConfig) -> JobResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> JobResult<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    /// One completion round-trip; returns the trimmed assistant text.
    pub async fn complete(&self, system: &str, user: &str) -> JobResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        debug!(url, "requesting chat completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&ChatRequest {
                model: MODEL,
                messages: vec![
                    Message {
                        role: "system",
                        content: system,
                    },
                    Message {
                        role: "user",
                        content: user,
                    },
                ],
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(JobError::submission(format!(
                "chat service returned {status}: {body}"
            )));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| JobError::malformed("chat response carried no choices"))
    }

    /// Sharpen a cover prompt before image generation. Callers fall
    /// back to the raw prompt when this fails.
    pub async fn refine_image_prompt(&self, prompt: &str) -> JobResult<String> {
        self.complete(REFINE_IMAGE_SYSTEM, prompt).await
    }

    /// Invent an album title from the two prompts.
    pub async fn album_title(&self, music_prompt: &str, cover_prompt: &str) -> JobResult<String> {
        let user = format!("'{music_prompt}', {cover_prompt}.");
        self.complete(ALBUM_TITLE_SYSTEM, &user).await
    }

    /// Write the upload description, weaving in the track timestamps.
    pub async fn video_description(
        &self,
        music_prompt: &str,
        title: &str,
        timestamps: &str,
    ) -> JobResult<String> {
        let user =
            format!("Title: '{title}'. Description: '{music_prompt}'. Timestamps: {timestamps}.");
        self.complete(VIDEO_DESCRIPTION_SYSTEM, &user).await
    }

    /// Nudge the music prompt so the next album differs from this one.
    pub async fn vary_music_prompt(&self, prompt: &str) -> JobResult<String> {
        let user = format!("Description: '{prompt}'.");
        self.complete(VARY_MUSIC_SYSTEM, &user).await
    }

    /// Rewrite the cover prompt for the next album.
    pub async fn vary_cover_prompt(&self, prompt: &str) -> JobResult<String> {
        let user = format!("Description: '{prompt}'.");
        self.complete(VARY_COVER_SYSTEM, &user).await
    }
}
