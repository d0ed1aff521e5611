//! Artifact fetching with bounded retry.
//!
//! Downloads are written to a `.part` sibling and atomically renamed
//! into place on success, so a partial transfer can never be mistaken
//! for a complete artifact. Only [`JobError::TransientTransport`]
//! (truncated/interrupted transfer) is retried; authentication,
//! not-found, and server errors fail immediately.

use std::future::Future;
use std::path::Path;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{JobError, JobResult};

/// Default attempt budget for artifact downloads.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Path the in-flight transfer is written to.
fn part_path(dest: &Path) -> std::path::PathBuf {
    dest.with_extension("part")
}

async fn ensure_parent(dest: &Path) -> JobResult<()> {
    if let Some(parent) = dest.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Fetch an artifact through an arbitrary async byte source, retrying
/// transient faults up to `max_attempts` total attempts.
///
/// On success exactly one complete file exists at `dest`; on exhausted
/// retries no file (partial or otherwise) is left behind.
pub async fn fetch_with_retry<F, Fut>(dest: &Path, max_attempts: u32, source: F) -> JobResult<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = JobResult<Vec<u8>>>,
{
    ensure_parent(dest).await?;
    let part = part_path(dest);

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match source().await {
            Ok(bytes) => {
                fs::write(&part, &bytes).await?;
                fs::rename(&part, dest).await?;
                debug!(dest = %dest.display(), attempt, "artifact fetched");
                return Ok(());
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                warn!(dest = %dest.display(), attempt, error = %e, "transient fetch fault, retrying");
            }
            Err(e) => {
                let _ = fs::remove_file(&part).await;
                return Err(e);
            }
        }
    }
}

/// Streaming HTTP artifact fetcher.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    max_attempts: u32,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new(), DEFAULT_FETCH_ATTEMPTS)
    }
}

impl Fetcher {
    pub fn new(client: reqwest::Client, max_attempts: u32) -> Self {
        Self {
            client,
            max_attempts,
        }
    }

    /// Stream `url` to `dest`, creating destination directories as
    /// needed. Non-success status codes fail immediately; interrupted
    /// body transfers are retried within the attempt budget.
    pub async fn fetch(&self, url: &str, dest: &Path) -> JobResult<()> {
        ensure_parent(dest).await?;
        let part = part_path(dest);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_stream(url, &part).await {
                Ok(()) => {
                    fs::rename(&part, dest).await?;
                    debug!(url, dest = %dest.display(), attempt, "artifact downloaded");
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(url, attempt, error = %e, "transient download fault, retrying");
                }
                Err(e) => {
                    let _ = fs::remove_file(&part).await;
                    return Err(e);
                }
            }
        }
    }

    /// One streaming attempt into the part file.
    async fn try_stream(&self, url: &str, part: &Path) -> JobResult<()> {
        let response = self.client.get(url).send().await?;
        let mut response = response.error_for_status()?;
        let expected = response.content_length();

        let mut file = fs::File::create(part).await?;
        let mut written: u64 = 0;

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    file.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                Ok(None) => break,
                // A mid-body transport fault is the transient class.
                Err(e) => return Err(JobError::transient(format!("body interrupted: {e}"))),
            }
        }

        file.flush().await?;
        drop(file);

        if let Some(expected) = expected {
            if written != expected {
                return Err(JobError::transient(format!(
                    "truncated transfer: got {written} of {expected} bytes"
                )));
            }
        }

        Ok(())
    }
}
