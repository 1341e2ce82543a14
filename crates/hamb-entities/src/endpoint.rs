//! Endpoints mirroring entity states

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use hamb_bridges::{BridgeRegistry, EndpointError, EndpointFactory, EntityEndpoint};
use hamb_core::{EntityMetadata, EntityState, StateBatch};
use serde::Serialize;
use tracing::trace;

/// Device type an entity is exposed as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    OnOffLight,
    DimmableLight,
    ColorTemperatureLight,
    ExtendedColorLight,
    OnOffPlugInUnit,
    TemperatureSensor,
    HumiditySensor,
    LightSensor,
    ContactSensor,
    OccupancySensor,
    DoorLock,
    WindowCovering,
    Fan,
    Thermostat,
    Speaker,
}

impl DeviceType {
    /// Pick the device type for an entity
    ///
    /// Fails with [`EndpointError::InvalidDevice`] for domains and sensor
    /// classes that have no device type.
    pub fn for_entity(
        metadata: &EntityMetadata,
        state: Option<&EntityState>,
    ) -> Result<Self, EndpointError> {
        let domain = metadata.domain();
        let device_class = state
            .and_then(|s| s.attributes.get("device_class"))
            .and_then(|v| v.as_str());

        let device_type = match domain {
            "light" => light_type(state),
            "switch" | "input_boolean" => DeviceType::OnOffPlugInUnit,
            "sensor" => match device_class {
                Some("temperature") => DeviceType::TemperatureSensor,
                Some("humidity") => DeviceType::HumiditySensor,
                Some("illuminance") => DeviceType::LightSensor,
                other => {
                    return Err(EndpointError::InvalidDevice(format!(
                        "sensor device class {} is not supported",
                        other.unwrap_or("none")
                    )))
                }
            },
            "binary_sensor" => match device_class {
                Some("motion" | "occupancy" | "presence") => DeviceType::OccupancySensor,
                _ => DeviceType::ContactSensor,
            },
            "lock" => DeviceType::DoorLock,
            "cover" => DeviceType::WindowCovering,
            "fan" => DeviceType::Fan,
            "climate" => DeviceType::Thermostat,
            "media_player" => DeviceType::Speaker,
            other => {
                return Err(EndpointError::InvalidDevice(format!(
                    "domain {other} is not supported"
                )))
            }
        };
        Ok(device_type)
    }

    /// Matter device type id
    pub fn code(&self) -> u16 {
        match self {
            DeviceType::OnOffLight => 0x0100,
            DeviceType::DimmableLight => 0x0101,
            DeviceType::ColorTemperatureLight => 0x010c,
            DeviceType::ExtendedColorLight => 0x010d,
            DeviceType::OnOffPlugInUnit => 0x010a,
            DeviceType::TemperatureSensor => 0x0302,
            DeviceType::HumiditySensor => 0x0307,
            DeviceType::LightSensor => 0x0106,
            DeviceType::ContactSensor => 0x0015,
            DeviceType::OccupancySensor => 0x0107,
            DeviceType::DoorLock => 0x000a,
            DeviceType::WindowCovering => 0x0202,
            DeviceType::Fan => 0x002b,
            DeviceType::Thermostat => 0x0301,
            DeviceType::Speaker => 0x0022,
        }
    }
}

fn light_type(state: Option<&EntityState>) -> DeviceType {
    let modes: Vec<&str> = state
        .and_then(|s| s.attributes.get("supported_color_modes"))
        .and_then(|v| v.as_array())
        .map(|modes| modes.iter().filter_map(|m| m.as_str()).collect())
        .unwrap_or_default();

    let has = |wanted: &[&str]| modes.iter().any(|m| wanted.contains(m));
    if has(&["hs", "xy", "rgb", "rgbw", "rgbww"]) {
        DeviceType::ExtendedColorLight
    } else if has(&["color_temp"]) {
        DeviceType::ColorTemperatureLight
    } else if has(&["brightness", "white"]) {
        DeviceType::DimmableLight
    } else {
        DeviceType::OnOffLight
    }
}

/// Endpoint holding the last state pushed for its entity
pub struct MirroredEndpoint {
    entity_id: String,
    device_type: DeviceType,
    state: RwLock<Option<EntityState>>,
    deleted: AtomicBool,
}

impl MirroredEndpoint {
    pub fn new(
        entity_id: impl Into<String>,
        device_type: DeviceType,
        state: Option<EntityState>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            device_type,
            state: RwLock::new(state),
            deleted: AtomicBool::new(false),
        }
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn state(&self) -> Option<EntityState> {
        self.state.read().ok().and_then(|s| s.clone())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityEndpoint for MirroredEndpoint {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    async fn delete(&self) -> Result<(), EndpointError> {
        self.deleted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn update_states(&self, states: &StateBatch) {
        if self.is_deleted() {
            return;
        }
        let Some(new_state) = states.get(&self.entity_id) else {
            return;
        };
        trace!(entity_id = %self.entity_id, state = %new_state.state, "Applying state");
        if let Ok(mut state) = self.state.write() {
            *state = Some(new_state.clone());
        }
    }
}

/// Builds a [`MirroredEndpoint`] for each entity with a known device type
#[derive(Debug, Default, Clone, Copy)]
pub struct MirroredEndpointFactory;

impl MirroredEndpointFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EndpointFactory for MirroredEndpointFactory {
    async fn create(
        &self,
        registry: &dyn BridgeRegistry,
        entity_id: &str,
    ) -> Result<Arc<dyn EntityEndpoint>, EndpointError> {
        let entity = registry
            .entity(entity_id)
            .ok_or_else(|| EndpointError::Failed(format!("entity {entity_id} not found")))?;
        let device_type = DeviceType::for_entity(&entity.metadata, entity.state.as_ref())?;

        Ok(Arc::new(MirroredEndpoint::new(
            entity_id,
            device_type,
            entity.state,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityStore, FilteredRegistry};
    use hamb_core::BridgeFilter;
    use serde_json::json;
    use std::collections::HashMap;

    fn state(id: &str, attributes: serde_json::Value) -> EntityState {
        let attributes: HashMap<String, serde_json::Value> =
            serde_json::from_value(attributes).unwrap();
        EntityState::new(id, "on", attributes)
    }

    fn device_type(id: &str, attributes: serde_json::Value) -> Result<DeviceType, EndpointError> {
        DeviceType::for_entity(&EntityMetadata::new(id), Some(&state(id, attributes)))
    }

    #[test]
    fn test_light_types_follow_color_modes() {
        assert_eq!(
            device_type("light.a", json!({"supported_color_modes": ["onoff"]})).unwrap(),
            DeviceType::OnOffLight
        );
        assert_eq!(
            device_type("light.a", json!({"supported_color_modes": ["brightness"]})).unwrap(),
            DeviceType::DimmableLight
        );
        assert_eq!(
            device_type("light.a", json!({"supported_color_modes": ["color_temp"]})).unwrap(),
            DeviceType::ColorTemperatureLight
        );
        assert_eq!(
            device_type("light.a", json!({"supported_color_modes": ["color_temp", "hs"]}))
                .unwrap(),
            DeviceType::ExtendedColorLight
        );
    }

    #[test]
    fn test_sensor_needs_supported_class() {
        assert_eq!(
            device_type("sensor.t", json!({"device_class": "temperature"})).unwrap(),
            DeviceType::TemperatureSensor
        );
        assert!(matches!(
            device_type("sensor.power", json!({"device_class": "power"})),
            Err(EndpointError::InvalidDevice(_))
        ));
    }

    #[test]
    fn test_unsupported_domain_is_invalid() {
        let err = device_type("vacuum.robot", json!({})).unwrap_err();
        assert_eq!(
            err,
            EndpointError::InvalidDevice("domain vacuum is not supported".to_string())
        );
    }

    #[test]
    fn test_device_type_codes() {
        assert_eq!(DeviceType::OnOffPlugInUnit.code(), 0x010a);
        assert_eq!(DeviceType::Thermostat.code(), 0x0301);
    }

    #[tokio::test]
    async fn test_endpoint_keeps_latest_own_state() {
        let endpoint = MirroredEndpoint::new("light.a", DeviceType::OnOffLight, None);

        let mut batch = StateBatch::new();
        batch.insert("light.b".to_string(), state("light.b", json!({})));
        endpoint.update_states(&batch).await;
        assert!(endpoint.state().is_none());

        batch.insert("light.a".to_string(), state("light.a", json!({})));
        endpoint.update_states(&batch).await;
        assert_eq!(endpoint.state().unwrap().entity_id, "light.a");
    }

    #[tokio::test]
    async fn test_deleted_endpoint_ignores_updates() {
        let endpoint = MirroredEndpoint::new("light.a", DeviceType::OnOffLight, None);
        endpoint.delete().await.unwrap();

        let batch = StateBatch::from([("light.a".to_string(), state("light.a", json!({})))]);
        endpoint.update_states(&batch).await;

        assert!(endpoint.is_deleted());
        assert!(endpoint.state().is_none());
    }

    #[tokio::test]
    async fn test_factory_classifies_failures() {
        let store = Arc::new(EntityStore::new());
        store.set_state("switch.fan", "off", HashMap::new()).unwrap();
        store.set_state("vacuum.robot", "docked", HashMap::new()).unwrap();
        let registry = FilteredRegistry::new(store, &BridgeFilter::include_all());
        registry.refresh().await.unwrap();
        let factory = MirroredEndpointFactory::new();

        let endpoint = factory.create(&registry, "switch.fan").await.unwrap();
        assert_eq!(endpoint.entity_id(), "switch.fan");

        assert!(matches!(
            factory.create(&registry, "vacuum.robot").await,
            Err(EndpointError::InvalidDevice(_))
        ));
        assert!(matches!(
            factory.create(&registry, "light.missing").await,
            Err(EndpointError::Failed(_))
        ));
    }
}
