//! Tracing initialization for the `docgen` binary.
//!
//! The library itself only emits `tracing` events and `metrics` counters; installing a
//! subscriber or recorder is left to the host application. Log levels follow `RUST_LOG`
//! (default `info`), e.g. `RUST_LOG=docgen=debug` to see each poll attempt.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize console logging.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    tracing::debug!("Telemetry initialized");
    Ok(())
}
