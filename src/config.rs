//! Client configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Log output format for [`init_tracing`](crate::logging::init_tracing).
#[derive(Debug, Copy, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".into()
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_unmatched_limit() -> usize {
    1000
}

fn default_unmatched_ttl_seconds() -> u64 {
    30
}

fn default_sweep_interval_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_frame_bytes() -> usize {
    crate::transport::codec::MAX_FRAME_BYTES
}

/// Client configuration, usually parsed from a TOML file.
///
/// Every field has a default, so an empty document is valid.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    /// Inbound payloads buffered before `handle_message` starts dropping.
    #[serde(default = "default_queue_capacity")]
    pub inbound_queue_capacity: usize,
    /// Unmatched responses held before the cache is cleared outright.
    #[serde(default = "default_unmatched_limit")]
    pub unmatched_limit: usize,
    /// Age after which the sweeper discards an unmatched response.
    #[serde(default = "default_unmatched_ttl_seconds")]
    pub unmatched_ttl_seconds: u64,
    /// Period of the stale request sweep.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Timeout applied by [`Client::send_default`](crate::Client::send_default).
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Outbound lines buffered by the line transport writer.
    #[serde(default = "default_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Largest inbound frame accepted by the line transport.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            inbound_queue_capacity: default_queue_capacity(),
            unmatched_limit: default_unmatched_limit(),
            unmatched_ttl_seconds: default_unmatched_ttl_seconds(),
            sweep_interval_ms: default_sweep_interval_ms(),
            default_timeout_ms: default_timeout_ms(),
            outbound_queue_capacity: default_queue_capacity(),
            max_frame_bytes: default_max_frame_bytes(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the client relies on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("inbound_queue_capacity", self.inbound_queue_capacity == 0),
            ("unmatched_limit", self.unmatched_limit == 0),
            ("sweep_interval_ms", self.sweep_interval_ms == 0),
            ("default_timeout_ms", self.default_timeout_ms == 0),
            ("outbound_queue_capacity", self.outbound_queue_capacity == 0),
            ("max_frame_bytes", self.max_frame_bytes == 0),
        ];

        if let Some((field, _)) = checks.iter().find(|(_, is_zero)| *is_zero) {
            return Err(AppError::Config(format!(
                "{field} must be greater than zero"
            )));
        }

        Ok(())
    }

    /// Sweep period as a [`Duration`].
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Unmatched response lifetime as a [`Duration`].
    #[must_use]
    pub fn unmatched_ttl(&self) -> Duration {
        Duration::from_secs(self.unmatched_ttl_seconds)
    }

    /// Default request timeout as a [`Duration`].
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}
