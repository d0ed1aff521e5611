//! Remote job orchestration core.
//!
//! Everything interesting this system produces comes out of a slow,
//! unreliable remote job. This crate owns the one pattern they all
//! share: submit, poll at a fixed interval until terminal, resolve
//! artifact URIs, and stream them to disk with bounded retry. Service
//! integrations supply only a status classifier and an artifact
//! extractor on top of [`wait_for`].

mod error;
mod fetch;
mod poll;

pub use error::{JobError, JobResult};
pub use fetch::{fetch_with_retry, Fetcher, DEFAULT_FETCH_ATTEMPTS};
pub use poll::{wait_for, PollOutcome, PollPolicy};
