//! Turns the fire-and-forget job API into a single awaitable call.
//!
//! ```text
//!              ┌──────────── sleep(min(interval, remaining)) ◄──────────┐
//!              ▼                                                        │
//!   Polling ── fetch_job ──┬─ completed | failed ──► Done               │
//!      │                   ├─ elapsed >= timeout ──► TimedOut           │
//!      │                   └─ otherwise ───────────► Sleeping ──────────┘
//!      └─ cancelled ─────────────────────────────► Cancelled   (also checked during sleep)
//! ```
//!
//! Fetch errors are returned as they are; the loop never retries a failed fetch.

use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::errors::PollError;
use crate::jobs::fetch::JobFetcher;
use crate::jobs::models::{DocumentJob, JobId};
use crate::time::{Clock, SystemClock};

/// Poll cadence and overall wait budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollConfig {
    /// Pause between fetches (default: 1s)
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Give up once this much time has elapsed without a terminal status (default: 30s)
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            timeout: Duration::from_millis(30_000),
        }
    }
}

impl PollConfig {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self { poll_interval, timeout }
    }

    pub fn validate(&self) -> Result<(), PollError> {
        if self.poll_interval.is_zero() {
            return Err(PollError::InvalidConfig("poll_interval must be positive".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(PollError::InvalidConfig("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

enum PollState {
    Polling { attempt: u32 },
    Sleeping { attempt: u32, pause: Duration },
    Done(DocumentJob),
    TimedOut(Duration),
    Cancelled,
}

/// Waits for a document job to reach a terminal state.
///
/// Stateless between calls; each `wait_for_completion` owns its loop and timer, so one
/// waiter can serve concurrent waits.
#[derive(Debug, Clone)]
pub struct CompletionWaiter<F, C = SystemClock> {
    fetcher: F,
    clock: C,
    config: PollConfig,
}

impl<F: JobFetcher> CompletionWaiter<F, SystemClock> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            clock: SystemClock,
            config: PollConfig::default(),
        }
    }
}

impl<F: JobFetcher, C: Clock> CompletionWaiter<F, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> CompletionWaiter<F, C2> {
        CompletionWaiter {
            fetcher: self.fetcher,
            clock,
            config: self.config,
        }
    }

    pub fn with_config(mut self, config: PollConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll `job_id` until it completes or fails.
    ///
    /// Returns the terminal job, or [`PollError::Timeout`] once the budget is spent,
    /// [`PollError::Cancelled`] if `cancel` fires (checked before each fetch and while
    /// sleeping), or the fetcher's own error.
    #[tracing::instrument(skip(self, job_id, cancel), fields(job_id = %job_id))]
    pub async fn wait_for_completion(
        &self,
        job_id: &JobId,
        cancel: &CancellationToken,
    ) -> Result<DocumentJob, PollError> {
        let result = self.run(job_id, cancel).await;

        let outcome = match &result {
            Ok(_) => "done",
            Err(PollError::Timeout { .. }) => "timeout",
            Err(PollError::Cancelled { .. }) => "cancelled",
            Err(PollError::Transport(_)) => "transport_error",
            Err(PollError::InvalidConfig(_)) => "invalid_config",
        };
        counter!("docgen_job_waits_total", "outcome" => outcome).increment(1);

        result
    }

    async fn run(&self, job_id: &JobId, cancel: &CancellationToken) -> Result<DocumentJob, PollError> {
        self.config.validate()?;

        let timeout = self.config.timeout;
        let start = self.clock.now();
        let elapsed = || self.clock.now().saturating_duration_since(start);

        let mut state = PollState::Polling { attempt: 1 };
        loop {
            state = match state {
                PollState::Polling { .. } if cancel.is_cancelled() => PollState::Cancelled,
                PollState::Polling { attempt } => {
                    counter!("docgen_job_polls_total").increment(1);
                    let job = self
                        .fetcher
                        .fetch_job(job_id)
                        .await
                        .inspect_err(|e| tracing::warn!(attempt, error = %e, "Job fetch failed"))?;
                    tracing::debug!(attempt, status = %job.status, "Polled job");

                    let elapsed = elapsed();
                    if job.is_terminal() {
                        PollState::Done(job)
                    } else if elapsed >= timeout {
                        PollState::TimedOut(elapsed)
                    } else {
                        PollState::Sleeping {
                            attempt,
                            pause: self.config.poll_interval.min(timeout - elapsed),
                        }
                    }
                }
                PollState::Sleeping { attempt, pause } => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => PollState::Cancelled,
                        _ = self.clock.sleep(pause) => {
                            let elapsed = elapsed();
                            if elapsed >= timeout {
                                PollState::TimedOut(elapsed)
                            } else {
                                PollState::Polling { attempt: attempt + 1 }
                            }
                        }
                    }
                }
                PollState::Done(job) => {
                    tracing::info!(
                        status = %job.status,
                        elapsed_ms = elapsed().as_millis() as u64,
                        "Job reached terminal state"
                    );
                    return Ok(job);
                }
                PollState::TimedOut(elapsed) => {
                    tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "Timed out waiting for job");
                    return Err(PollError::Timeout {
                        job_id: job_id.clone(),
                        elapsed,
                    });
                }
                PollState::Cancelled => {
                    tracing::info!("Wait for job cancelled");
                    return Err(PollError::Cancelled { job_id: job_id.clone() });
                }
            };
        }
    }
}

/// Wait for `job_id` using the system clock.
pub async fn wait_for_completion<F: JobFetcher>(
    job_id: &JobId,
    fetcher: F,
    config: PollConfig,
    cancel: &CancellationToken,
) -> Result<DocumentJob, PollError> {
    CompletionWaiter::new(fetcher).with_config(config).wait_for_completion(job_id, cancel).await
}
