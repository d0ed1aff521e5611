//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use lofi_jobs::PollPolicy;

/// Pipeline configuration. The interactive entry point overrides the
/// prompt and count fields; everything else comes from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Description handed to the music service.
    pub music_prompt: String,
    /// Description handed to the image service.
    pub cover_prompt: String,
    /// Generation rounds per album; each round yields a clip pair.
    pub songs_per_album: usize,
    /// Albums to produce in this batch.
    pub albums: usize,
    /// Clips shorter than this are discarded, never re-requested.
    pub min_clip_secs: f64,
    /// Polling cadence for song generation.
    pub song_poll: PollPolicy,
    /// Polling cadence for video generation.
    pub video_poll: PollPolicy,
    /// Polling cadence for asset propagation after a site deploy.
    pub propagation_poll: PollPolicy,
    /// Download attempts per artifact.
    pub fetch_attempts: u32,
    /// Pause between albums in a batch.
    pub cooldown: Duration,
    /// Root directory for per-album work files.
    pub work_dir: PathBuf,
    /// Motion prompt for the cover video.
    pub video_prompt: String,
    /// Requested length of the generated video clip, in seconds.
    pub video_clip_secs: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            music_prompt: "Korean cafe jazz music, fast".to_string(),
            cover_prompt: "A beautiful sunset over the mountains".to_string(),
            songs_per_album: 3,
            albums: 1,
            min_clip_secs: 30.0,
            song_poll: PollPolicy::new(Duration::from_secs(5), 60),
            video_poll: PollPolicy::new(Duration::from_secs(10), 60),
            propagation_poll: PollPolicy::new(Duration::from_secs(30), 30),
            fetch_attempts: 3,
            cooldown: Duration::from_secs(60),
            work_dir: PathBuf::from("/tmp/lofi"),
            video_prompt: "Static unmoving camera, dynamic motion within the frame".to_string(),
            video_clip_secs: 5,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            music_prompt: std::env::var("LOFI_MUSIC_PROMPT").unwrap_or(defaults.music_prompt),
            cover_prompt: std::env::var("LOFI_COVER_PROMPT").unwrap_or(defaults.cover_prompt),
            songs_per_album: env_parse("LOFI_SONGS_PER_ALBUM", defaults.songs_per_album),
            albums: env_parse("LOFI_ALBUMS", defaults.albums),
            min_clip_secs: env_parse("LOFI_MIN_CLIP_SECS", defaults.min_clip_secs),
            song_poll: PollPolicy::new(
                Duration::from_secs(env_parse("LOFI_SONG_POLL_SECS", 5)),
                env_parse("LOFI_SONG_POLL_ATTEMPTS", 60),
            ),
            video_poll: PollPolicy::new(
                Duration::from_secs(env_parse("LOFI_VIDEO_POLL_SECS", 10)),
                env_parse("LOFI_VIDEO_POLL_ATTEMPTS", 60),
            ),
            propagation_poll: PollPolicy::new(
                Duration::from_secs(env_parse("LOFI_PROPAGATION_POLL_SECS", 30)),
                env_parse("LOFI_PROPAGATION_POLL_ATTEMPTS", 30),
            ),
            fetch_attempts: env_parse("LOFI_FETCH_ATTEMPTS", defaults.fetch_attempts),
            cooldown: Duration::from_secs(env_parse("LOFI_COOLDOWN_SECS", 60)),
            work_dir: std::env::var("LOFI_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            video_prompt: std::env::var("LOFI_VIDEO_PROMPT").unwrap_or(defaults.video_prompt),
            video_clip_secs: env_parse("LOFI_VIDEO_CLIP_SECS", defaults.video_clip_secs),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
