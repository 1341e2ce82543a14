//! Application configuration for the Matter bridge
//!
//! The configuration is a single YAML file. Every field has a default, so a
//! missing file is a valid (empty) configuration.
//!
//! ```yaml
//! logging:
//!   level: info
//!   disable_colors: false
//! storage:
//!   location: /var/lib/hamb
//! bridges:
//!   refresh_interval_secs: 300
//!   heartbeat_interval_secs: 30
//!   basic_information:
//!     vendor_name: My Bridge
//! entities:
//!   - entity_id: light.kitchen
//!     state: "on"
//! ```
//!
//! Selected values can be overridden from the environment; see [`AppConfig::apply_env`].

mod app_config;
mod env;
mod error;

pub use app_config::{AppConfig, BridgesConfig, EntitySeed, StorageConfig, DEFAULT_CONFIG_FILE};
pub use env::{
    ENV_DISABLE_COLORS, ENV_LOG_LEVEL, ENV_REFRESH_INTERVAL, ENV_STORAGE_LOCATION,
};
pub use error::{ConfigError, ConfigResult};
