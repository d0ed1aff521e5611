//! Pipeline error type. Every failure carries the stage it happened in
//! so the batch loop can report where an album died.

use std::fmt;

use thiserror::Error;

use lofi_jobs::JobError;
use lofi_media::MediaError;
use lofi_models::MissingArtifact;

/// The stages of one album build, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CoverImage,
    CoverOutpaint,
    CoverVideo,
    SongGeneration,
    FilterShortClips,
    AudioConcat,
    VideoLoop,
    MetadataGeneration,
    Publish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CoverImage => "cover_image",
            Stage::CoverOutpaint => "cover_outpaint",
            Stage::CoverVideo => "cover_video",
            Stage::SongGeneration => "song_generation",
            Stage::FilterShortClips => "filter_short_clips",
            Stage::AudioConcat => "audio_concat",
            Stage::VideoLoop => "video_loop",
            Stage::MetadataGeneration => "metadata_generation",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The underlying cause of a stage failure.
#[derive(Debug, Error)]
pub enum StageFailure {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Artifact(#[from] MissingArtifact),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Invariant(String),
}

/// A stage failure with its originating stage attached.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: StageFailure,
}

impl PipelineError {
    pub fn at(stage: Stage, source: impl Into<StageFailure>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    pub fn invariant(stage: Stage, msg: impl Into<String>) -> Self {
        Self {
            stage,
            source: StageFailure::Invariant(msg.into()),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
