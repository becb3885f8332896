//! Polling loop for providers whose research runs as a background job.
//!
//! Lifecycle: a submission returns a job id, then the job is polled until it
//! reaches a terminal state (`completed` or `failed`), the attempt budget
//! runs out, or the externally supplied deadline elapses. Terminal states are
//! never left once reached.

use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::error::ProviderError;
use crate::extract::{error_message, status_text};

/// Classified state of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Submitted,
    InProgress,
    Completed,
    Failed,
}

impl PollStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PollStatus::Completed | PollStatus::Failed)
    }
}

/// Map a raw status string onto a [`PollStatus`], tolerant across the casing
/// and naming conventions the providers use. Unrecognized strings classify
/// as in-progress so a novel spelling keeps the loop alive instead of
/// failing the job.
pub fn classify(raw: &str) -> PollStatus {
    match raw.to_ascii_lowercase().as_str() {
        "completed" | "complete" | "succeeded" | "done" => PollStatus::Completed,
        "failed" | "error" | "errored" | "cancelled" | "canceled" | "expired" | "incomplete" => {
            PollStatus::Failed
        }
        "submitted" | "queued" | "pending" | "accepted" => PollStatus::Submitted,
        _ => PollStatus::InProgress,
    }
}

/// Per-provider polling constants: fixed sleep between polls and the attempt
/// ceiling. Together they bound the worst-case wall clock one job may occupy.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// Drive `poll` until the job completes, returning the terminal response for
/// extraction.
///
/// The deadline is checked before every poll and every sleep; the loop never
/// sleeps past it. Deadline expiry, a provider-reported failure, and attempt
/// exhaustion each fail with their own error kind.
pub async fn run<F, Fut>(
    provider: &str,
    config: PollConfig,
    deadline: Instant,
    mut poll: F,
) -> Result<Value, ProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Value, ProviderError>>,
{
    for attempt in 1..=config.max_attempts {
        if Instant::now() >= deadline {
            return Err(ProviderError::DeadlineElapsed);
        }

        let resp = poll(attempt).await?;
        let raw = status_text(&resp).ok_or_else(|| {
            ProviderError::ProtocolMismatch("poll response carries no status field".to_string())
        })?;

        match classify(&raw) {
            PollStatus::Completed => return Ok(resp),
            PollStatus::Failed => return Err(ProviderError::Reported(error_message(&resp))),
            PollStatus::Submitted | PollStatus::InProgress => {
                debug!(
                    target: "khoj.poll",
                    provider,
                    attempt,
                    status = %raw,
                    "job still running"
                );
                let wake = Instant::now() + config.interval;
                if wake >= deadline {
                    return Err(ProviderError::DeadlineElapsed);
                }
                sleep_until(wake).await;
            }
        }
    }

    Err(ProviderError::PollTimeout(config.max_attempts))
}
