//! Production wiring: the service traits implemented over the real
//! HTTP clients, the retrying fetcher, and FFmpeg.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use lofi_jobs::{Fetcher, JobResult, PollPolicy};
use lofi_media::MediaResult;
use lofi_models::VideoMetadata;
use lofi_services::{
    AssetHost, ChatClient, ClipAudio, ImageClient, MusicClient, VideoClient, YoutubeClient,
};

use crate::traits::{
    ArtifactFetcher, AssetHosting, ImageService, MediaOps, MusicService, TextService,
    VideoPublisher, VideoService,
};

#[async_trait]
impl MusicService for MusicClient {
    async fn generate_pair(&self, prompt: &str) -> JobResult<Vec<String>> {
        let jobs = self.generate(prompt, true).await?;
        Ok(jobs.into_iter().map(|j| j.id).collect())
    }

    async fn wait_for_audio(
        &self,
        ids: &[String],
        policy: &PollPolicy,
    ) -> JobResult<Vec<ClipAudio>> {
        MusicClient::wait_for_audio(self, ids, policy).await
    }
}

#[async_trait]
impl ImageService for ImageClient {
    async fn generate(&self, prompt: &str) -> JobResult<String> {
        ImageClient::generate(self, prompt).await
    }

    async fn edit(&self, image: &Path, prompt: &str) -> JobResult<String> {
        ImageClient::edit(self, image, prompt).await
    }
}

#[async_trait]
impl TextService for ChatClient {
    async fn refine_image_prompt(&self, prompt: &str) -> JobResult<String> {
        ChatClient::refine_image_prompt(self, prompt).await
    }

    async fn album_title(&self, music_prompt: &str, cover_prompt: &str) -> JobResult<String> {
        ChatClient::album_title(self, music_prompt, cover_prompt).await
    }

    async fn video_description(
        &self,
        music_prompt: &str,
        title: &str,
        timestamps: &str,
    ) -> JobResult<String> {
        ChatClient::video_description(self, music_prompt, title, timestamps).await
    }

    async fn vary_music_prompt(&self, prompt: &str) -> JobResult<String> {
        ChatClient::vary_music_prompt(self, prompt).await
    }

    async fn vary_cover_prompt(&self, prompt: &str) -> JobResult<String> {
        ChatClient::vary_cover_prompt(self, prompt).await
    }
}

#[async_trait]
impl VideoService for VideoClient {
    async fn generate_clip(
        &self,
        image_url: &str,
        prompt: &str,
        duration: u32,
        policy: &PollPolicy,
    ) -> JobResult<String> {
        let job = self.submit(image_url, prompt, duration).await?;
        self.wait_for_output(&job.id, policy).await
    }
}

#[async_trait]
impl AssetHosting for AssetHost {
    async fn publish(&self, path: &Path, policy: &PollPolicy) -> JobResult<String> {
        AssetHost::publish(self, path, policy).await
    }
}

#[async_trait]
impl VideoPublisher for YoutubeClient {
    async fn upload(&self, video: &Path, metadata: &VideoMetadata) -> JobResult<String> {
        YoutubeClient::upload(self, video, metadata).await
    }
}

#[async_trait]
impl ArtifactFetcher for Fetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> JobResult<()> {
        Fetcher::fetch(self, url, dest).await
    }
}

/// Media assembly through the real FFmpeg/FFprobe wrappers.
pub struct FfmpegMedia;

#[async_trait]
impl MediaOps for FfmpegMedia {
    async fn duration_secs(&self, path: &Path) -> MediaResult<f64> {
        lofi_media::duration_secs(path).await
    }

    async fn concat_audio(&self, inputs: &[PathBuf], output: &Path) -> MediaResult<()> {
        lofi_media::concat_audio(inputs, output).await
    }

    async fn loop_to_duration(
        &self,
        clip: &Path,
        audio_secs: f64,
        output: &Path,
    ) -> MediaResult<()> {
        lofi_media::loop_to_duration(clip, audio_secs, output).await
    }

    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> MediaResult<()> {
        lofi_media::mux(video, audio, output).await
    }

    fn split_for_outpaint(&self, cover: &Path, out_dir: &Path) -> MediaResult<(PathBuf, PathBuf)> {
        lofi_media::split_for_outpaint(cover, out_dir)
    }

    fn compose_landscape(
        &self,
        cover: &Path,
        left: &Path,
        right: &Path,
        output: &Path,
    ) -> MediaResult<()> {
        lofi_media::compose_landscape(cover, left, right, output)
    }
}

/// The full service bundle the album builder runs against.
pub struct Services {
    pub music: Arc<dyn MusicService>,
    pub image: Arc<dyn ImageService>,
    pub text: Arc<dyn TextService>,
    pub video: Arc<dyn VideoService>,
    pub host: Arc<dyn AssetHosting>,
    pub publisher: Arc<dyn VideoPublisher>,
    pub fetcher: Arc<dyn ArtifactFetcher>,
    pub media: Arc<dyn MediaOps>,
}

impl Services {
    /// Build the production bundle from the environment.
    pub fn from_env(fetch_attempts: u32) -> JobResult<Self> {
        Ok(Self {
            music: Arc::new(MusicClient::from_env()?),
            image: Arc::new(ImageClient::from_env()?),
            text: Arc::new(ChatClient::from_env()?),
            video: Arc::new(VideoClient::from_env()?),
            host: Arc::new(AssetHost::from_env()?),
            publisher: Arc::new(YoutubeClient::from_env()?),
            fetcher: Arc::new(Fetcher::new(reqwest::Client::new(), fetch_attempts)),
            media: Arc::new(FfmpegMedia),
        })
    }
}
