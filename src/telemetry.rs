//! Structured logging setup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, filter::ParseError, fmt};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name, ignoring case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured level is not a valid filter directive.
    #[error("invalid log filter: {0}")]
    InvalidFilter(#[from] ParseError),
    /// A global subscriber was already installed.
    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Filter directive, such as `info` or `gropius=debug`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingSettings {
    /// Installs the global `tracing` subscriber.
    ///
    /// `RUST_LOG`, when set and valid, takes precedence over the configured
    /// level.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] when the level is invalid or a subscriber
    /// is already installed.
    pub fn init(&self) -> Result<(), TelemetryError> {
        let filter = self.env_filter(std::env::var("RUST_LOG").ok().as_deref())?;
        let builder = fmt().with_env_filter(filter);
        match self.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.try_init(),
        }
        .map_err(|err| TelemetryError::Install(err.to_string()))
    }

    fn env_filter(&self, override_directive: Option<&str>) -> Result<EnvFilter, TelemetryError> {
        if let Some(directive) = override_directive
            && let Ok(filter) = EnvFilter::try_new(directive)
        {
            return Ok(filter);
        }
        Ok(EnvFilter::try_new(&self.level)?)
    }
}
