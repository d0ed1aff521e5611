//! Album production pipeline: turns two text prompts into a published
//! lofi album video, batch after batch.

pub mod album;
pub mod config;
pub mod error;
pub mod production;
pub mod traits;

pub use album::{format_timestamps, AlbumBuilder};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult, Stage, StageFailure};
pub use production::{FfmpegMedia, Services};
