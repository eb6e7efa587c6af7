//! Home Assistant MQTT discovery payloads.
//!
//! One retained config message per measurement, published once at
//! startup, lets the platform auto-register both entities without any
//! manual setup. The availability contract points at the device's status
//! topic so stale entities gray out when the bridge goes offline.

use serde::Serialize;

use crate::core::identity::{DeviceIdentity, Measurement};

/// Retained availability payload while the bridge is running.
pub const PAYLOAD_AVAILABLE: &str = "online";
/// Availability payload published on shutdown and via the Last Will.
pub const PAYLOAD_NOT_AVAILABLE: &str = "offline";

/// The `device` block grouping both entities under one device in the UI.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

/// Discovery configuration for a single sensor entity.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryConfig {
    pub device: Device,
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    pub value_template: String,
    pub unit_of_measurement: String,
    pub device_class: String,
    pub availability_topic: String,
    pub payload_available: String,
    pub payload_not_available: String,
}

impl DiscoveryConfig {
    /// Builds the config for one measurement of the given device.
    pub fn for_measurement(identity: &DeviceIdentity, measurement: Measurement) -> Self {
        DiscoveryConfig {
            device: Device {
                identifiers: vec![identity.id.clone()],
                name: identity.name.clone(),
                manufacturer: "Aosong".to_string(),
                model: "DHT11".to_string(),
            },
            name: format!("{} {}", identity.name, measurement.display_name()),
            unique_id: identity.unique_id(measurement),
            state_topic: identity.state_topic(),
            value_template: format!("{{{{ value_json.{} }}}}", measurement.value_key()),
            unit_of_measurement: measurement.unit().to_string(),
            device_class: measurement.device_class().to_string(),
            availability_topic: identity.availability_topic(),
            payload_available: PAYLOAD_AVAILABLE.to_string(),
            payload_not_available: PAYLOAD_NOT_AVAILABLE.to_string(),
        }
    }
}
