//! Document job polling.
//!
//! - [`models`]: Job snapshots and lifecycle states
//! - [`fetch`]: The job fetch collaborator and its HTTP and mock implementations
//! - [`waiter`]: Bounded, cancellable wait for a terminal state

pub mod fetch;
pub mod models;
pub mod waiter;

pub use fetch::{HttpJobFetcher, JobFetcher, MockJobFetcher};
pub use models::{DocumentJob, JobId, JobStatus};
pub use waiter::{CompletionWaiter, PollConfig, wait_for_completion};
