//! Generic fixed-interval job polling.
//!
//! Remote generation jobs take tens of seconds to minutes, so a fixed
//! interval with a bounded attempt count is the right shape: the
//! dominant cost is the remote job itself, not the status queries.
//! Each service integration supplies a poll closure that issues one
//! status query and classifies the raw remote status into a
//! [`PollOutcome`]; this module owns the budget and the sleeps.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{JobError, JobResult};

/// Polling policy: interval between status queries and the attempt
/// budget. Injectable so tests can run with millisecond intervals.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Classification of one status query.
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// Still running; poll again after the interval.
    Pending,
    /// Terminal success, carrying whatever the adapter resolved
    /// (typically artifact URIs).
    Ready(T),
    /// Terminal remote failure, carrying the raw remote status string.
    Failed(String),
}

/// Poll `poll` at fixed spacing until it reports a terminal outcome or
/// the attempt budget is exhausted.
///
/// Issues exactly one status query per attempt and never more than
/// `policy.max_attempts` queries. A `Failed` outcome aborts immediately
/// with [`JobError::Failed`] regardless of remaining budget. Exhausting
/// the budget yields [`JobError::Timeout`]. Errors from the poll closure
/// itself (transport faults on the status endpoint) propagate as-is.
pub async fn wait_for<T, F, Fut>(policy: &PollPolicy, name: &str, mut poll: F) -> JobResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = JobResult<PollOutcome<T>>>,
{
    let started = Instant::now();

    for attempt in 1..=policy.max_attempts {
        debug!(
            job = name,
            attempt,
            max_attempts = policy.max_attempts,
            "polling job status"
        );

        match poll().await? {
            PollOutcome::Ready(value) => {
                debug!(job = name, attempt, "job succeeded");
                return Ok(value);
            }
            PollOutcome::Failed(status) => {
                warn!(job = name, attempt, %status, "job reached terminal failure");
                return Err(JobError::Failed { status });
            }
            PollOutcome::Pending => {
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
    }

    let elapsed = started.elapsed();
    warn!(job = name, ?elapsed, "polling budget exhausted");
    Err(JobError::Timeout { elapsed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(1), max_attempts)
    }

    #[tokio::test]
    async fn test_never_terminal_times_out_after_exact_budget() {
        let calls = AtomicU32::new(0);

        let result: JobResult<()> = wait_for(&quick(7), "stuck", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(PollOutcome::Pending) }
        })
        .await;

        assert!(matches!(result, Err(JobError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_terminal_failure_aborts_immediately() {
        let calls = AtomicU32::new(0);

        let result: JobResult<()> = wait_for(&quick(60), "doomed", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(PollOutcome::Failed("CANCELLED".to_string())) }
        })
        .await;

        match result {
            Err(JobError::Failed { status }) => assert_eq!(status, "CANCELLED"),
            other => panic!("expected Failed, got {:?}", other.err()),
        }
        // Exactly one query, zero additional polls.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_eventual_success() {
        let calls = AtomicU32::new(0);

        let result = wait_for(&quick(10), "slow", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Ok(PollOutcome::Pending)
                } else {
                    Ok(PollOutcome::Ready("https://cdn/out.mp4".to_string()))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "https://cdn/out.mp4");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_error_propagates() {
        let result: JobResult<()> = wait_for(&quick(10), "broken", || async {
            Err(JobError::malformed("status field missing"))
        })
        .await;

        assert!(matches!(result, Err(JobError::MalformedResponse(_))));
    }
}
