//! Per-album build context.
//!
//! The context replaces the original flow's implicit working-directory
//! folders with explicit typed paths: each stage writes its declared
//! output here and the next stage reads it back, so stages have no
//! hidden coupling to directory layout.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Raised when a stage starts before its upstream artifact exists.
#[derive(Debug, Error)]
#[error("missing upstream artifact: {0}")]
pub struct MissingArtifact(pub PathBuf);

/// Mutable state threaded through one album's production.
#[derive(Debug, Clone)]
pub struct AlbumContext {
    /// 1-based album number within the batch.
    pub index: usize,
    pub music_prompt: String,
    pub cover_prompt: String,

    pub songs_dir: PathBuf,
    pub covers_dir: PathBuf,
    pub video_dir: PathBuf,

    /// Downloaded song clips, in generation order.
    pub song_paths: Vec<PathBuf>,
    /// Durations (seconds) of the clips that survived filtering,
    /// parallel to the surviving `song_paths`.
    pub track_durations: Vec<f64>,
    /// The square generated cover.
    pub cover_path: Option<PathBuf>,
    /// The 16:9 outpainted cover, or the square cover when outpainting
    /// fell back.
    pub landscape_cover_path: Option<PathBuf>,
    /// The short generated video clip.
    pub clip_path: Option<PathBuf>,
    /// Concatenated album audio.
    pub final_audio_path: Option<PathBuf>,
    /// Looped/trimmed video with the album audio muxed in.
    pub final_video_path: Option<PathBuf>,
}

impl AlbumContext {
    /// Create a context for album `index`, deriving the stage
    /// directories under `work_dir`.
    pub fn new(
        work_dir: impl AsRef<Path>,
        index: usize,
        music_prompt: impl Into<String>,
        cover_prompt: impl Into<String>,
    ) -> Self {
        let work_dir = work_dir.as_ref();
        Self {
            index,
            music_prompt: music_prompt.into(),
            cover_prompt: cover_prompt.into(),
            songs_dir: work_dir.join("songs"),
            covers_dir: work_dir.join("covers"),
            video_dir: work_dir.join("video"),
            song_paths: Vec::new(),
            track_durations: Vec::new(),
            cover_path: None,
            landscape_cover_path: None,
            clip_path: None,
            final_audio_path: None,
            final_video_path: None,
        }
    }

    /// Assert that a declared upstream artifact exists on disk before a
    /// stage consumes it.
    pub fn require<'a>(&self, path: &'a Path) -> Result<&'a Path, MissingArtifact> {
        if path.is_file() {
            Ok(path)
        } else {
            Err(MissingArtifact(path.to_path_buf()))
        }
    }

    /// Directories every stage may write into.
    pub fn stage_dirs(&self) -> [&Path; 3] {
        [&self.songs_dir, &self.covers_dir, &self.video_dir]
    }
}
