//! End-to-end album builds against in-memory fakes.
//!
//! The fakes encode durations as the file contents of the artifacts
//! they produce, so the media fake can "probe" and "concat" with plain
//! arithmetic and the assertions can read results straight off disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use lofi_jobs::{JobError, JobResult, PollPolicy};
use lofi_media::{MediaError, MediaResult};
use lofi_models::{AlbumContext, VideoMetadata};
use lofi_pipeline::traits::{
    ArtifactFetcher, AssetHosting, ImageService, MediaOps, MusicService, TextService,
    VideoPublisher, VideoService,
};
use lofi_pipeline::{AlbumBuilder, PipelineConfig, Services};
use lofi_services::ClipAudio;

#[derive(Default)]
struct FakeMusic {
    calls: AtomicUsize,
    /// Fail the first generation round with a remote failure.
    fail_first: bool,
    /// Make the second clip of every pair too short to keep.
    short_second: bool,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl MusicService for FakeMusic {
    async fn generate_pair(&self, prompt: &str) -> JobResult<Vec<String>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_first && n == 0 {
            return Err(JobError::failed("error"));
        }
        let second = if self.short_second {
            format!("short-{n}b")
        } else {
            format!("clip-{n}b")
        };
        Ok(vec![format!("clip-{n}a"), second])
    }

    async fn wait_for_audio(
        &self,
        ids: &[String],
        _policy: &PollPolicy,
    ) -> JobResult<Vec<ClipAudio>> {
        Ok(ids
            .iter()
            .map(|id| ClipAudio {
                id: id.clone(),
                url: format!("fake://song/{id}"),
            })
            .collect())
    }
}

#[derive(Default)]
struct FakeImage {
    fail_edits: bool,
}

#[async_trait]
impl ImageService for FakeImage {
    async fn generate(&self, _prompt: &str) -> JobResult<String> {
        Ok("fake://image/cover.png".to_string())
    }

    async fn edit(&self, image: &Path, _prompt: &str) -> JobResult<String> {
        if self.fail_edits {
            return Err(JobError::failed("content policy"));
        }
        Ok(format!(
            "fake://image/edited-{}",
            image.file_name().unwrap().to_string_lossy()
        ))
    }
}

#[derive(Default)]
struct FakeText {
    vary_music_calls: AtomicUsize,
    vary_cover_calls: AtomicUsize,
}

#[async_trait]
impl TextService for FakeText {
    async fn refine_image_prompt(&self, prompt: &str) -> JobResult<String> {
        Ok(format!("refined {prompt}"))
    }

    async fn album_title(&self, _music: &str, _cover: &str) -> JobResult<String> {
        Ok("Ember".to_string())
    }

    async fn video_description(
        &self,
        _music: &str,
        _title: &str,
        timestamps: &str,
    ) -> JobResult<String> {
        Ok(format!("an old quote\n{timestamps}"))
    }

    async fn vary_music_prompt(&self, prompt: &str) -> JobResult<String> {
        self.vary_music_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{prompt} (varied)"))
    }

    async fn vary_cover_prompt(&self, prompt: &str) -> JobResult<String> {
        self.vary_cover_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{prompt} (varied)"))
    }
}

#[derive(Default)]
struct FakeVideo {
    seen_image_urls: Mutex<Vec<String>>,
}

#[async_trait]
impl VideoService for FakeVideo {
    async fn generate_clip(
        &self,
        image_url: &str,
        _prompt: &str,
        _duration: u32,
        _policy: &PollPolicy,
    ) -> JobResult<String> {
        self.seen_image_urls
            .lock()
            .unwrap()
            .push(image_url.to_string());
        Ok("fake://video/clip.mp4".to_string())
    }
}

struct FakeHost;

#[async_trait]
impl AssetHosting for FakeHost {
    async fn publish(&self, path: &Path, _policy: &PollPolicy) -> JobResult<String> {
        Ok(format!(
            "fake://host/{}",
            path.file_name().unwrap().to_string_lossy()
        ))
    }
}

#[derive(Default)]
struct FakePublisher {
    uploads: Mutex<Vec<(PathBuf, VideoMetadata)>>,
}

#[async_trait]
impl VideoPublisher for FakePublisher {
    async fn upload(&self, video: &Path, metadata: &VideoMetadata) -> JobResult<String> {
        self.uploads
            .lock()
            .unwrap()
            .push((video.to_path_buf(), metadata.clone()));
        Ok("yt-1".to_string())
    }
}

/// Writes every artifact's duration (in seconds) as its file contents.
/// Songs are 45s, except "short" clips at 10s; video clips are 5s.
struct FakeFetcher;

#[async_trait]
impl ArtifactFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> JobResult<()> {
        let body = if url.contains("short") {
            "10"
        } else if url.starts_with("fake://song/") {
            "45"
        } else if url.starts_with("fake://video/") {
            "5"
        } else {
            "0"
        };
        tokio::fs::write(dest, body).await?;
        Ok(())
    }
}

/// Media assembly by arithmetic over the duration-as-contents files.
struct FakeMedia;

fn read_secs(path: &Path) -> MediaResult<f64> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| MediaError::invalid_media(format!("unreadable fake: {}", path.display())))
}

#[async_trait]
impl MediaOps for FakeMedia {
    async fn duration_secs(&self, path: &Path) -> MediaResult<f64> {
        read_secs(path)
    }

    async fn concat_audio(&self, inputs: &[PathBuf], output: &Path) -> MediaResult<()> {
        let mut total = 0.0;
        for input in inputs {
            total += read_secs(input)?;
        }
        std::fs::write(output, format!("{total}"))?;
        Ok(())
    }

    async fn loop_to_duration(
        &self,
        _clip: &Path,
        audio_secs: f64,
        output: &Path,
    ) -> MediaResult<()> {
        std::fs::write(output, format!("{audio_secs}"))?;
        Ok(())
    }

    async fn mux(&self, video: &Path, _audio: &Path, output: &Path) -> MediaResult<()> {
        std::fs::copy(video, output)?;
        Ok(())
    }

    fn split_for_outpaint(&self, _cover: &Path, out_dir: &Path) -> MediaResult<(PathBuf, PathBuf)> {
        let left = out_dir.join("outpaint_left.png");
        let right = out_dir.join("outpaint_right.png");
        std::fs::write(&left, "0")?;
        std::fs::write(&right, "0")?;
        Ok((left, right))
    }

    fn compose_landscape(
        &self,
        _cover: &Path,
        _left: &Path,
        _right: &Path,
        output: &Path,
    ) -> MediaResult<()> {
        std::fs::write(output, "0")?;
        Ok(())
    }
}

struct Fixture {
    music: Arc<FakeMusic>,
    image: Arc<FakeImage>,
    text: Arc<FakeText>,
    video: Arc<FakeVideo>,
    publisher: Arc<FakePublisher>,
}

impl Fixture {
    fn new(music: FakeMusic, image: FakeImage) -> Self {
        Self {
            music: Arc::new(music),
            image: Arc::new(image),
            text: Arc::new(FakeText::default()),
            video: Arc::new(FakeVideo::default()),
            publisher: Arc::new(FakePublisher::default()),
        }
    }

    fn services(&self) -> Services {
        Services {
            music: self.music.clone(),
            image: self.image.clone(),
            text: self.text.clone(),
            video: self.video.clone(),
            host: Arc::new(FakeHost),
            publisher: self.publisher.clone(),
            fetcher: Arc::new(FakeFetcher),
            media: Arc::new(FakeMedia),
        }
    }
}

fn test_config(work_dir: &Path, songs_per_album: usize, albums: usize) -> PipelineConfig {
    PipelineConfig {
        music_prompt: "korean cafe jazz".to_string(),
        cover_prompt: "rainy window at dusk".to_string(),
        songs_per_album,
        albums,
        min_clip_secs: 30.0,
        song_poll: PollPolicy::new(Duration::from_millis(1), 5),
        video_poll: PollPolicy::new(Duration::from_millis(1), 5),
        propagation_poll: PollPolicy::new(Duration::from_millis(1), 5),
        fetch_attempts: 3,
        cooldown: Duration::from_millis(1),
        work_dir: work_dir.to_path_buf(),
        video_prompt: "static camera".to_string(),
        video_clip_secs: 5,
    }
}

#[tokio::test]
async fn test_single_album_end_to_end() {
    let dir = tempfile::TempDir::new().unwrap();
    let fixture = Fixture::new(FakeMusic::default(), FakeImage::default());
    let builder = AlbumBuilder::new(test_config(dir.path(), 1, 1), fixture.services());

    let mut ctx = AlbumContext::new(dir.path(), 1, "korean cafe jazz", "rainy window at dusk");
    let video_id = builder.build_album(&mut ctx).await.unwrap();
    assert_eq!(video_id, "yt-1");

    // One generation round yields a usable pair.
    assert_eq!(ctx.track_durations, vec![45.0, 45.0]);

    // Album audio is the exact sum of its tracks.
    let audio_secs = read_secs(ctx.final_audio_path.as_deref().unwrap()).unwrap();
    assert_eq!(audio_secs, 90.0);

    // The final video is trimmed to exactly the audio length.
    let video_secs = read_secs(ctx.final_video_path.as_deref().unwrap()).unwrap();
    assert_eq!(video_secs, audio_secs);

    // The upload saw the finished video and the generated title.
    let uploads = fixture.publisher.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1.title, "Ember");
    assert!(uploads[0].1.description.contains("0:00\n0:45"));
}

#[tokio::test]
async fn test_outpaint_failure_falls_back_to_square_cover() {
    let dir = tempfile::TempDir::new().unwrap();
    let fixture = Fixture::new(
        FakeMusic::default(),
        FakeImage {
            fail_edits: true,
        },
    );
    let builder = AlbumBuilder::new(test_config(dir.path(), 1, 1), fixture.services());

    let mut ctx = AlbumContext::new(dir.path(), 1, "jazz", "window");
    builder.build_album(&mut ctx).await.unwrap();

    // The video stage consumed the original square cover, not a
    // partial composite.
    let landscape = ctx.landscape_cover_path.unwrap();
    assert!(landscape.ends_with("cover.png"), "got {landscape:?}");
    let seen = fixture.video.seen_image_urls.lock().unwrap();
    assert_eq!(seen.as_slice(), ["fake://host/cover.png"]);
}

#[tokio::test]
async fn test_failed_album_continues_batch_without_mutation() {
    let dir = tempfile::TempDir::new().unwrap();
    let fixture = Fixture::new(
        FakeMusic {
            fail_first: true,
            ..FakeMusic::default()
        },
        FakeImage::default(),
    );
    let builder = AlbumBuilder::new(test_config(dir.path(), 1, 2), fixture.services());

    let published = builder.run().await;
    assert_eq!(published, 1);

    // Album 1 failed, so album 2 reused the prompt unmutated.
    let prompts = fixture.music.prompts.lock().unwrap();
    assert_eq!(prompts.as_slice(), ["korean cafe jazz", "korean cafe jazz"]);

    // Mutation ran once, after the one success.
    assert_eq!(fixture.text.vary_music_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.text.vary_cover_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_short_clips_are_filtered_not_rerequested() {
    let dir = tempfile::TempDir::new().unwrap();
    let fixture = Fixture::new(
        FakeMusic {
            short_second: true,
            ..FakeMusic::default()
        },
        FakeImage::default(),
    );
    let builder = AlbumBuilder::new(test_config(dir.path(), 2, 1), fixture.services());

    let mut ctx = AlbumContext::new(dir.path(), 1, "jazz", "window");
    builder.build_album(&mut ctx).await.unwrap();

    // Two rounds of two clips each, half of them too short.
    assert_eq!(ctx.track_durations, vec![45.0, 45.0]);
    assert_eq!(fixture.music.calls.load(Ordering::SeqCst), 2);

    let audio_secs = read_secs(ctx.final_audio_path.as_deref().unwrap()).unwrap();
    assert_eq!(audio_secs, 90.0);
}
