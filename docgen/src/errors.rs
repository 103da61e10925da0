use std::time::Duration;

use thiserror::Error;

use crate::jobs::JobId;

/// Why a webhook failed verification.
///
/// Kept crate-private: callers get one error type and a message, so an invalid signature and
/// an expired timestamp cannot be told apart by matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum VerificationFailure {
    #[error("malformed signature header: {0}")]
    MalformedHeader(String),

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("timestamp {timestamp} outside tolerance of {tolerance:?} (now {now})")]
    TimestampOutOfTolerance { timestamp: u64, now: u64, tolerance: Duration },

    #[error("unparsable payload: {0}")]
    UnparsablePayload(String),
}

impl VerificationFailure {
    /// Short label used as a metrics tag.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::MalformedHeader(_) => "malformed_header",
            Self::SignatureMismatch => "signature_mismatch",
            Self::TimestampOutOfTolerance { .. } => "timestamp_out_of_tolerance",
            Self::UnparsablePayload(_) => "unparsable_payload",
        }
    }
}

/// A webhook payload could not be authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Webhook signature verification failed: {reason}")]
pub struct SignatureVerificationError {
    pub(crate) reason: VerificationFailure,
}

impl SignatureVerificationError {
    pub(crate) fn new(reason: VerificationFailure) -> Self {
        Self { reason }
    }

    /// Human-readable reason for the failure.
    pub fn message(&self) -> String {
        self.reason.to_string()
    }
}

/// Failure reported by a job fetcher. Passed through the completion waiter untouched.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level failure or timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not a valid job
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Failure from a custom fetcher implementation
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from [`crate::jobs::CompletionWaiter`].
#[derive(Debug, Error)]
pub enum PollError {
    /// Poll interval or timeout was zero
    #[error("Invalid poll configuration: {0}")]
    InvalidConfig(String),

    /// The job did not reach a terminal state within the timeout
    #[error("Job {job_id} did not complete within {}ms", .elapsed.as_millis())]
    Timeout { job_id: JobId, elapsed: Duration },

    /// The caller cancelled the wait
    #[error("Wait for job {job_id} was cancelled")]
    Cancelled { job_id: JobId },

    /// The fetcher failed; not retried
    #[error(transparent)]
    Transport(#[from] TransportError),
}
