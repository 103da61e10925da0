//! Client configuration.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file path
//! defaults to `docgen.yaml` and may be missing, in which case defaults and environment apply.
//!
//! ## Loading Priority
//!
//! 1. **Defaults** - See the `Default` impls below
//! 2. **YAML config file** - Base configuration (default: `docgen.yaml`)
//! 3. **Environment variables** - Variables prefixed with `DOCGEN_` override YAML values
//!
//! Nested values use double underscores, e.g. `DOCGEN_POLLING__TIMEOUT=2m` sets
//! `polling.timeout`.
//!
//! ## Example
//!
//! ```yaml
//! base_url: https://docs.example.com
//! api_key: sk_live_123
//! request_timeout: 10s
//! webhooks:
//!   secret: whsec_abc
//!   tolerance: 5m
//! polling:
//!   poll_interval: 1s
//!   timeout: 30s
//! ```

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::jobs::PollConfig;
use crate::webhooks::DEFAULT_TOLERANCE;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "docgen.yaml";

/// Root client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the document service API
    pub base_url: Url,
    /// API key sent as a bearer token, if set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-request HTTP timeout (default: 10s)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Inbound webhook verification
    pub webhooks: WebhookConfig,
    /// Job completion polling
    pub polling: PollConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:8080/").expect("static URL is valid"),
            api_key: None,
            request_timeout: Duration::from_secs(10),
            webhooks: WebhookConfig::default(),
            polling: PollConfig::default(),
        }
    }
}

/// Webhook verification settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookConfig {
    /// Shared signing secret
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Maximum accepted clock distance from the signed timestamp (default: 5m)
    #[serde(with = "humantime_serde")]
    pub tolerance: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(path).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Yaml::file(path.as_ref()))
            // DOCGEN_CONFIG names the file itself and is not a config key
            .merge(Env::prefixed("DOCGEN_").split("__").ignore(&["config"]))
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), crate::errors::PollError> {
        self.polling.validate()
    }
}
