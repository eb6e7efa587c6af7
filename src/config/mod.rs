//! Application configuration loading and validation.
//!
//! All settings come from environment variables, read exactly once at
//! startup into an immutable `Config`. A missing credential or an
//! out-of-range value is a startup error; the process must not start in
//! a partially configured state, so nothing here is looked up lazily.

use std::{fmt, str::FromStr};

use validator::Validate;

use self::logger::LoggerConfig;

pub mod logger;

/// Simple macros for printing timestamped messages before the tracing subscriber
/// is initialized. These are used during early configuration loading.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("INFO").green(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("WARN").yellow(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        );
    };
}

/// Errors that can occur while reading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("Configuration error: required environment variable {0} is not set")]
    MissingVar(&'static str),

    /// An environment variable is set but could not be parsed.
    #[error("Configuration error: {name} is invalid: {reason}")]
    InvalidVar { name: &'static str, reason: String },

    /// Validation failure after all variables were read.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Top-level application configuration.
///
/// Combines broker, device, sampling, and logging settings into a single
/// structure constructed once by `Config::from_env`.
#[derive(Debug, Clone, Validate)]
pub struct Config {
    /// MQTT broker connection settings.
    #[validate(nested)]
    pub mqtt: MqttConfig,

    /// Human-readable device display name; the device id and topic
    /// namespace are derived from it.
    #[validate(length(min = 1, message = "Device name must not be empty"))]
    pub device_name: String,

    /// Seconds between sampling cycles.
    #[validate(range(
        min = 1,
        max = 86400,
        message = "Sample interval must be between 1 and 86400 seconds"
    ))]
    pub sample_interval: u64,

    /// BCM pin number the DHT11 data line is connected to.
    #[validate(range(max = 27, message = "DHT pin must be a valid BCM pin number (0-27)"))]
    pub dht_pin: u8,

    /// Logging subsystem configuration.
    #[validate(nested)]
    pub logger: LoggerConfig,
}

/// Broker address and credentials.
#[derive(Clone, Validate)]
pub struct MqttConfig {
    /// Broker hostname or IP address.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Broker host must be between 1 and 255 characters"
    ))]
    pub host: String,

    /// Broker port number.
    #[validate(range(min = 1, message = "Port must not be zero"))]
    pub port: u16,

    /// Broker username.
    #[validate(length(min = 1, message = "Broker username must not be empty"))]
    pub username: String,

    /// Broker password.
    #[validate(length(min = 1, message = "Broker password must not be empty"))]
    pub password: String,
}

impl fmt::Debug for MqttConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Reads and validates the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a required variable is missing, a value
    /// fails to parse, or validation rejects the assembled configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config {
            mqtt: MqttConfig {
                host: required("MQTT_BROKER")?,
                port: parsed_or("MQTT_PORT", 1883)?,
                username: required("MQTT_USER")?,
                password: required("MQTT_PASSWORD")?,
            },
            device_name: var_or("DEVICE_NAME", "Raspberry Pi DHT11"),
            sample_interval: parsed_or("SAMPLE_INTERVAL", 60)?,
            dht_pin: parsed_or("DHT_PIN", 4)?,
            logger: LoggerConfig::from_env()?,
        };

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(config)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidVar {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
