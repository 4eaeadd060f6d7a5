//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over `logging.level` when set.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use triage_core::{LoggingConfig, TriageError};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(TriageError::Config(format!("unknown log format: {other}"))),
        }
    }
}

/// Build the event filter for `level`, letting `RUST_LOG` override it.
///
/// # Errors
///
/// Returns an error when `level` is not a valid filter directive.
pub fn env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| anyhow::anyhow!("Invalid log level {:?}: {}", level, e))
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error for an invalid level or format, or when a global
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = env_filter(&config.level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.format.parse::<LogFormat>()? {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
