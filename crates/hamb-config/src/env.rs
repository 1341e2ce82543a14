//! Environment variable overrides

use hamb_logging::LogLevel;
use tracing::debug;

use crate::app_config::AppConfig;
use crate::error::{ConfigError, ConfigResult};

pub const ENV_LOG_LEVEL: &str = "HAMB_LOG_LEVEL";
pub const ENV_DISABLE_COLORS: &str = "HAMB_DISABLE_COLORS";
pub const ENV_STORAGE_LOCATION: &str = "HAMB_STORAGE_LOCATION";
pub const ENV_REFRESH_INTERVAL: &str = "HAMB_REFRESH_INTERVAL";

impl AppConfig {
    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (`key -> value`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = value
                .parse::<LogLevel>()
                .map_err(|e| ConfigError::invalid(ENV_LOG_LEVEL, e.to_string()))?;
            debug!("Log level overridden from environment: {}", self.logging.level);
        }

        if let Some(value) = lookup(ENV_DISABLE_COLORS) {
            self.logging.disable_colors = parse_bool(&value).ok_or_else(|| {
                ConfigError::invalid(ENV_DISABLE_COLORS, format!("not a boolean: {value}"))
            })?;
        }

        if let Some(value) = lookup(ENV_STORAGE_LOCATION) {
            self.storage.location = value;
        }

        if let Some(value) = lookup(ENV_REFRESH_INTERVAL) {
            self.bridges.refresh_interval_secs = value.trim().parse().map_err(|_| {
                ConfigError::invalid(ENV_REFRESH_INTERVAL, format!("not a number of seconds: {value}"))
            })?;
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
