use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docgen::jobs::{CompletionWaiter, HttpJobFetcher, JobId};
use docgen::time::{Clock, SystemClock};
use docgen::webhooks::{WebhookVerifier, sign_payload};
use docgen::{Config, config::DEFAULT_CONFIG_PATH, telemetry};
use tokio_util::sync::CancellationToken;

/// Document service client tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "DOCGEN_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Produce the signature header the service would send for a payload
    Sign {
        /// File containing the raw payload
        payload: PathBuf,
        /// Signing secret (defaults to webhooks.secret, or DOCGEN_WEBHOOKS__SECRET)
        #[arg(long)]
        secret: Option<String>,
        /// Unix timestamp to sign with (defaults to now)
        #[arg(long)]
        timestamp: Option<u64>,
    },
    /// Verify a webhook payload and print the decoded event
    Verify {
        /// File containing the raw payload
        payload: PathBuf,
        /// Value of the signature header
        #[arg(long)]
        signature: String,
        /// Signing secret (defaults to webhooks.secret, or DOCGEN_WEBHOOKS__SECRET)
        #[arg(long)]
        secret: Option<String>,
        /// Replay window, e.g. "5m" (defaults to webhooks.tolerance from config)
        #[arg(long, value_parser = humantime::parse_duration)]
        tolerance: Option<Duration>,
    },
    /// Wait for a document job to finish and print it
    Wait {
        job_id: String,
        /// Override polling.poll_interval, e.g. "2s"
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
        /// Override polling.timeout, e.g. "2m"
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,
    },
}

fn read_payload(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read payload from {}", path.display()))
}

fn resolve_secret(flag: Option<String>, config: &Config) -> anyhow::Result<String> {
    flag.or_else(|| config.webhooks.secret.clone())
        .context("No webhook secret: pass --secret or set webhooks.secret")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    telemetry::init_telemetry()?;
    tracing::debug!(config = ?args.config, "Loaded configuration");

    match args.command {
        Command::Sign {
            payload,
            secret,
            timestamp,
        } => {
            let body = read_payload(&payload)?;
            let secret = resolve_secret(secret, &config)?;
            let timestamp = timestamp.unwrap_or_else(|| SystemClock.unix_timestamp());
            println!("{}", sign_payload(timestamp, &body, &secret));
        }
        Command::Verify {
            payload,
            signature,
            secret,
            tolerance,
        } => {
            let body = read_payload(&payload)?;
            let secret = resolve_secret(secret, &config)?;
            let verifier = WebhookVerifier::new(secret).with_tolerance(tolerance.unwrap_or(config.webhooks.tolerance));
            let event = verifier.verify(&body, &signature)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        Command::Wait {
            job_id,
            interval,
            timeout,
        } => {
            let mut polling = config.polling;
            if let Some(interval) = interval {
                polling.poll_interval = interval;
            }
            if let Some(timeout) = timeout {
                polling.timeout = timeout;
            }

            let fetcher = HttpJobFetcher::from_config(&config)?;
            let waiter = CompletionWaiter::new(fetcher).with_config(polling);

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Received Ctrl+C, cancelling wait...");
                    on_ctrl_c.cancel();
                }
            });

            let job = waiter.wait_for_completion(&JobId::from(job_id), &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
    }

    Ok(())
}
