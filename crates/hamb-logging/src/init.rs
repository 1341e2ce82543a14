use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::capture::LogCapture;
use crate::layer::CaptureLayer;
use crate::level::LogLevel;

/// Logging section of the application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    pub level: LogLevel,
    pub disable_colors: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            disable_colors: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install global subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the `EnvFilter` for the given options
///
/// `RUST_LOG` wins when set; otherwise the configured level applies.
pub fn env_filter(options: &LoggingOptions) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(options.level.filter_directive())?),
    }
}

/// Install the global subscriber: console output plus in-memory capture
pub fn init_logging(
    options: &LoggingOptions,
    capture: Arc<LogCapture>,
) -> Result<(), LoggingError> {
    let filter = env_filter(options)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(!options.disable_colors),
        )
        .with(CaptureLayer::new(capture))
        .try_init()?;

    Ok(())
}
