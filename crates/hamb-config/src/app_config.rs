//! The application configuration file

use std::collections::HashMap;
use std::path::Path;

use hamb_core::{split_entity_id, BasicInformation, EntityMetadata, EntityState};
use hamb_logging::LoggingOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Root of the YAML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingOptions,
    pub storage: StorageConfig,
    pub bridges: BridgesConfig,
    /// Entities the local entity source starts with
    pub entities: Vec<EntitySeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the versioned storage files
    pub location: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            location: ".hamb".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgesConfig {
    /// Defaults merged into every newly created bridge
    pub basic_information: BasicInformation,
    /// Seconds between periodic reconciliation passes (0 disables them)
    pub refresh_interval_secs: u64,
    /// Seconds between status heartbeats
    pub heartbeat_interval_secs: u64,
}

impl Default for BridgesConfig {
    fn default() -> Self {
        Self {
            basic_information: BasicInformation::default(),
            refresh_interval_secs: 300,
            heartbeat_interval_secs: 30,
        }
    }
}

/// One entity seeded into the local entity source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySeed {
    pub entity_id: String,
    #[serde(default = "default_seed_state")]
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub entity_category: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub disabled: bool,
}

fn default_seed_state() -> String {
    "unknown".to_string()
}

impl EntitySeed {
    pub fn metadata(&self) -> EntityMetadata {
        EntityMetadata {
            entity_id: self.entity_id.clone(),
            platform: self.platform.clone(),
            device_id: self.device_id.clone(),
            area_id: self.area_id.clone(),
            labels: self.labels.clone(),
            entity_category: self.entity_category.clone(),
            hidden: self.hidden,
            disabled: self.disabled,
        }
    }

    pub fn state(&self) -> EntityState {
        EntityState::new(
            self.entity_id.clone(),
            self.state.clone(),
            self.attributes.clone(),
        )
    }
}

impl AppConfig {
    /// Load the configuration file, falling back to defaults when it does not exist
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_yaml_str(&content).map_err(|e| match e {
            ConfigError::ParseYaml { source, .. } => ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
            path: "<string>".into(),
            source: e,
        })
    }

    /// Check values that deserialize fine but cannot be used
    pub fn validate(&self) -> ConfigResult<()> {
        if self.storage.location.trim().is_empty() {
            return Err(ConfigError::invalid(
                "storage.location",
                "must not be empty",
            ));
        }
        if self.bridges.heartbeat_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "bridges.heartbeat_interval_secs",
                "must be positive",
            ));
        }
        for seed in &self.entities {
            split_entity_id(&seed.entity_id).map_err(|e| {
                ConfigError::invalid(format!("entities.{}", seed.entity_id), e.to_string())
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamb_logging::LogLevel;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.storage.location, ".hamb");
        assert_eq!(config.bridges.refresh_interval_secs, 300);
        assert_eq!(config.bridges.basic_information.vendor_id, 0xfff1);
        assert!(config.entities.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_from_yaml() {
        let yaml = r#"
logging:
  level: warning
  disable_colors: true
storage:
  location: /data
bridges:
  refresh_interval_secs: 0
  basic_information:
    vendor_name: Test Vendor
entities:
  - entity_id: light.kitchen
    state: "on"
    attributes:
      brightness: 128
    area_id: kitchen
  - entity_id: sensor.temp
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.logging.level, LogLevel::Warn);
        assert!(config.logging.disable_colors);
        assert_eq!(config.storage.location, "/data");
        assert_eq!(config.bridges.refresh_interval_secs, 0);
        assert_eq!(config.bridges.heartbeat_interval_secs, 30);
        assert_eq!(config.bridges.basic_information.vendor_name, "Test Vendor");
        assert_eq!(config.bridges.basic_information.vendor_id, 0xfff1);

        assert_eq!(config.entities.len(), 2);
        let kitchen = &config.entities[0];
        assert_eq!(kitchen.state().state, "on");
        assert_eq!(kitchen.state().attributes["brightness"], 128);
        assert_eq!(kitchen.metadata().area_id.as_deref(), Some("kitchen"));
        assert_eq!(config.entities[1].state, "unknown");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path().join("missing.yaml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "storage:\n  location: /srv/hamb").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.storage.location, "/srv/hamb");
    }

    #[test]
    fn test_parse_error_names_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "logging: [not, a, map").unwrap();

        let err = AppConfig::load(file.path()).unwrap_err();
        match err {
            ConfigError::ParseYaml { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.bridges.heartbeat_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "bridges.heartbeat_interval_secs"
        ));

        let mut config = AppConfig::default();
        config.storage.location = "  ".to_string();
        assert!(config.validate().is_err());

        let config = AppConfig::from_yaml_str("entities:\n  - entity_id: kitchen\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unknown_log_level_is_parse_error() {
        let err = AppConfig::from_yaml_str("logging:\n  level: loud\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseYaml { .. }));
    }
}
