//! # docgen: client-side core for the document generation service
//!
//! The document service renders documents asynchronously: a caller submits a job, the service
//! works on it in the background, and the result is reported either by polling the job or by a
//! signed webhook callback. This crate implements the two parts of that exchange that need more
//! than request/response glue.
//!
//! ## Webhook verification
//!
//! Every callback carries a `t=<unix-seconds>,v1=<hex-hmac-sha256>` header. The
//! [`WebhookVerifier`] recomputes the HMAC over `{t}.{payload}` with the shared secret,
//! compares in constant time, rejects timestamps outside the replay window, and only then
//! decodes the body into a [`WebhookEvent`].
//!
//! ```
//! use docgen::webhooks::{WebhookVerifier, sign_payload};
//! use docgen::time::MockClock;
//!
//! let payload = r#"{"id":"evt_1","type":"document.completed","timestamp":"2023-11-14T22:13:20Z","data":{}}"#;
//! let header = sign_payload(1_700_000_000, payload, "whsec_secret");
//!
//! let verifier = WebhookVerifier::new("whsec_secret").with_clock(MockClock::at_unix(1_700_000_000));
//! let event = verifier.verify(payload, &header).unwrap();
//! assert_eq!(event.id(), "evt_1");
//! ```
//!
//! ## Waiting for completion
//!
//! [`CompletionWaiter`] polls a [`JobFetcher`] until the job is `completed` or `failed`,
//! bounded by a timeout and cancellable through a `CancellationToken`. Fetch failures are
//! returned immediately, never retried.
//!
//! ```no_run
//! use docgen::jobs::{CompletionWaiter, HttpJobFetcher, JobId, PollConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = docgen::Config::load("docgen.yaml")?;
//! let fetcher = HttpJobFetcher::from_config(&config)?;
//! let waiter = CompletionWaiter::new(fetcher).with_config(config.polling);
//!
//! let job = waiter.wait_for_completion(&JobId::from("doc_123"), &CancellationToken::new()).await?;
//! println!("{:?}", job.download_url);
//! # Ok(())
//! # }
//! ```
//!
//! Both components take their time source through [`time::Clock`], so tests can run poll loops
//! and replay windows against a [`time::MockClock`] without real delays.

pub mod config;
pub mod errors;
pub mod jobs;
pub mod telemetry;
pub mod time;
pub mod webhooks;

pub use config::Config;
pub use errors::{PollError, SignatureVerificationError, TransportError};
pub use jobs::{CompletionWaiter, DocumentJob, JobFetcher, JobId, JobStatus, PollConfig};
pub use webhooks::{WebhookEvent, WebhookEventType, WebhookVerifier};
