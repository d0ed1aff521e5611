//! Unified error taxonomy for remote job orchestration.

use std::time::Duration;

use thiserror::Error;

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    /// Bad request or failed local precondition. Raised before any
    /// network call is made; never retried.
    #[error("submission rejected: {0}")]
    Submission(String),

    /// The remote job reached a terminal failure state. A failed remote
    /// job will not recover by waiting longer; never retried.
    #[error("remote job failed with status {status}")]
    Failed { status: String },

    /// The polling budget was exhausted while the job was still
    /// non-terminal.
    #[error("job timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// The remote service violated its response contract (missing or
    /// empty artifact field). Not a transient condition; never retried.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Truncated or interrupted artifact transfer. The only error class
    /// the fetcher retries.
    #[error("transient transport fault: {0}")]
    TransientTransport(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    pub fn failed(status: impl Into<String>) -> Self {
        Self::Failed {
            status: status.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientTransport(msg.into())
    }

    /// Only truncated/partial transfers are worth retrying. Everything
    /// else in the taxonomy is either a contract violation or a terminal
    /// remote state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobError::TransientTransport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(JobError::transient("connection reset").is_retryable());
        assert!(!JobError::submission("missing file").is_retryable());
        assert!(!JobError::failed("FAILED").is_retryable());
        assert!(!JobError::malformed("no url field").is_retryable());
        assert!(!JobError::Timeout {
            elapsed: Duration::from_secs(300)
        }
        .is_retryable());
    }
}
