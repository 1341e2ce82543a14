//! Error types for configuration loading

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Why a configuration could not be produced
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid configuration: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A value that parsed but is out of range or inconsistent
    #[error("{key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
