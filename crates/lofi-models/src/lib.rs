//! Shared data models for the lofi album factory.

mod album;
mod job;
mod metadata;

pub use album::{AlbumContext, MissingArtifact};
pub use job::{Job, JobKind, JobStatus};
pub use metadata::VideoMetadata;
