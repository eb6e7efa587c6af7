//! Device identity and topic derivation.
//!
//! The identity is computed once at startup from the configured display
//! name and stays constant for the process lifetime. Derivation must be
//! deterministic: Home Assistant keys entity history on `unique_id`, so
//! the same name has to produce the same id across restarts.

/// Stable device identifier and topic namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Human-readable display name, as configured.
    pub name: String,
    /// Derived identifier: lower-cased, spaces replaced by underscores.
    pub id: String,
    /// Topic namespace all of this device's topics live under.
    pub topic_prefix: String,
}

/// The two measurements this device exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    Temperature,
    Humidity,
}

impl Measurement {
    /// Fixed suffix distinguishing the measurement kind in topics and
    /// unique ids.
    pub fn suffix(self) -> &'static str {
        match self {
            Measurement::Temperature => "t",
            Measurement::Humidity => "h",
        }
    }

    /// Key under which the measurement appears in the state payload.
    pub fn value_key(self) -> &'static str {
        match self {
            Measurement::Temperature => "temperature",
            Measurement::Humidity => "humidity",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Measurement::Temperature => "Temperature",
            Measurement::Humidity => "Humidity",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Measurement::Temperature => "°C",
            Measurement::Humidity => "%",
        }
    }

    /// Home Assistant device class for the entity.
    pub fn device_class(self) -> &'static str {
        self.value_key()
    }
}

impl DeviceIdentity {
    /// Derives the identity from a display name.
    ///
    /// Pure and idempotent: distinct names never collide on id, and the
    /// same name always reproduces the same id.
    pub fn derive(name: &str) -> Self {
        let id = name.to_lowercase().replace(' ', "_");
        DeviceIdentity {
            name: name.to_string(),
            topic_prefix: id.clone(),
            id,
        }
    }

    /// Topic current readings are published to each cycle.
    pub fn state_topic(&self) -> String {
        format!("{}/state", self.topic_prefix)
    }

    /// Topic signaling whether the device is online.
    pub fn availability_topic(&self) -> String {
        format!("{}/status", self.topic_prefix)
    }

    /// Retained discovery-config topic for one measurement.
    pub fn config_topic(&self, measurement: Measurement) -> String {
        format!("{}_{}/config", self.topic_prefix, measurement.suffix())
    }

    /// Unique entity id for one measurement.
    pub fn unique_id(&self, measurement: Measurement) -> String {
        format!("{}_{}", self.id, measurement.suffix())
    }
}
