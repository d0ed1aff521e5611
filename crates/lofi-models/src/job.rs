//! Remote job handles and their shared status vocabulary.
//!
//! Every long-running remote operation (song synthesis, image edits,
//! video generation, deploy verification) is tracked as a [`Job`].
//! The remote services each speak their own status strings; the service
//! adapters map those onto the shared [`JobStatus`] set so the polling
//! loop only ever reasons about one vocabulary.

use serde::{Deserialize, Serialize};

/// Which remote operation a job represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// A music-synthesis request that yields two audio clips.
    SongPair,
    /// Cover image generation.
    Image,
    /// Image edit/outpaint of an existing cover.
    ImageEdit,
    /// Image-to-video synthesis.
    Video,
    /// Artifact publish / CDN propagation check.
    Deploy,
}

/// Shared job status set.
///
/// `Streaming` is the "ready-partial" state some services expose while
/// an artifact is already downloadable but the job is still rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted by the remote service, not yet terminal.
    #[default]
    Submitted,
    /// Artifact partially available while the job keeps running.
    Streaming,
    /// Job finished and artifacts can be resolved.
    Succeeded,
    /// Remote terminal failure.
    Failed,
    /// Remote cancellation.
    Cancelled,
    /// Local polling budget exhausted.
    TimedOut,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Streaming => "streaming",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::TimedOut => "timed_out",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled | JobStatus::TimedOut
        )
    }

    /// Check if the job can be considered successful for artifact
    /// resolution purposes.
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Streaming | JobStatus::Succeeded)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One outstanding remote request.
///
/// Created at submission, mutated only by the poller (status) and the
/// resolver (artifacts), and dropped once all artifacts are persisted
/// locally. There is no durable job store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Opaque handle assigned by the remote service.
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Downloadable artifact URIs, populated only on success.
    pub artifacts: Vec<String>,
}

impl Job {
    /// Create a freshly submitted job.
    pub fn submitted(id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            id: id.into(),
            kind,
            status: JobStatus::Submitted,
            artifacts: Vec::new(),
        }
    }

    /// Advance the status. Transitions are forward-only: once a job is
    /// terminal the status is frozen and `false` is returned. Callers
    /// treat a refused transition as a remote contract bug worth logging.
    pub fn transition(&mut self, next: JobStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = next;
        true
    }

    /// Attach resolved artifact URIs. Only meaningful once the job is in
    /// a success state; returns `false` (and leaves the job untouched)
    /// otherwise.
    pub fn resolve(&mut self, artifacts: Vec<String>) -> bool {
        if !self.status.is_success() {
            return false;
        }
        self.artifacts = artifacts;
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
