//! Service seams the album builder runs against.
//!
//! Production wiring lives in [`crate::production`]; the integration
//! tests substitute in-memory fakes so a whole album can be built
//! without network access or FFmpeg.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use lofi_jobs::{JobResult, PollPolicy};
use lofi_media::MediaResult;
use lofi_models::VideoMetadata;
use lofi_services::ClipAudio;

/// Music synthesis: one submission yields a clip pair.
#[async_trait]
pub trait MusicService: Send + Sync {
    /// Submit one generation round; returns the pair's clip ids.
    async fn generate_pair(&self, prompt: &str) -> JobResult<Vec<String>>;

    /// Poll until every clip has downloadable audio.
    async fn wait_for_audio(&self, ids: &[String], policy: &PollPolicy)
        -> JobResult<Vec<ClipAudio>>;
}

/// Image synthesis and outpainting.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Generate a square cover; returns the artifact URL.
    async fn generate(&self, prompt: &str) -> JobResult<String>;

    /// Outpaint the transparent region of a PNG; returns the artifact URL.
    async fn edit(&self, image: &Path, prompt: &str) -> JobResult<String>;
}

/// Chat text: prompt refinement, metadata, prompt mutation.
#[async_trait]
pub trait TextService: Send + Sync {
    async fn refine_image_prompt(&self, prompt: &str) -> JobResult<String>;
    async fn album_title(&self, music_prompt: &str, cover_prompt: &str) -> JobResult<String>;
    async fn video_description(
        &self,
        music_prompt: &str,
        title: &str,
        timestamps: &str,
    ) -> JobResult<String>;
    async fn vary_music_prompt(&self, prompt: &str) -> JobResult<String>;
    async fn vary_cover_prompt(&self, prompt: &str) -> JobResult<String>;
}

/// Image-to-video synthesis.
#[async_trait]
pub trait VideoService: Send + Sync {
    /// Submit, poll to completion, and return the clip's artifact URL.
    async fn generate_clip(
        &self,
        image_url: &str,
        prompt: &str,
        duration: u32,
        policy: &PollPolicy,
    ) -> JobResult<String>;
}

/// Static-asset publishing for the cover image.
#[async_trait]
pub trait AssetHosting: Send + Sync {
    /// Make a local file publicly reachable; returns its public URL.
    async fn publish(&self, path: &Path, policy: &PollPolicy) -> JobResult<String>;
}

/// The upload target for finished albums.
#[async_trait]
pub trait VideoPublisher: Send + Sync {
    /// Upload one video; returns the platform's video id.
    async fn upload(&self, video: &Path, metadata: &VideoMetadata) -> JobResult<String>;
}

/// Artifact download with bounded retry.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> JobResult<()>;
}

/// Local media assembly.
#[async_trait]
pub trait MediaOps: Send + Sync {
    async fn duration_secs(&self, path: &Path) -> MediaResult<f64>;
    async fn concat_audio(&self, inputs: &[PathBuf], output: &Path) -> MediaResult<()>;
    async fn loop_to_duration(&self, clip: &Path, audio_secs: f64, output: &Path)
        -> MediaResult<()>;
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> MediaResult<()>;
    fn split_for_outpaint(&self, cover: &Path, out_dir: &Path) -> MediaResult<(PathBuf, PathBuf)>;
    fn compose_landscape(
        &self,
        cover: &Path,
        left: &Path,
        right: &Path,
        output: &Path,
    ) -> MediaResult<()>;
}
