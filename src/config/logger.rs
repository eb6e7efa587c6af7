//! Logging configuration read from the environment.
//!
//! Like the rest of the configuration this is loaded once at startup and
//! validated via the `validator` crate before the tracing subscriber is
//! initialized.

use validator::{Validate, ValidationError};

use super::ConfigError;

/// Available formats for console log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Compact
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!(
                "unknown log format '{other}' (expected compact, pretty or json)"
            )),
        }
    }
}

/// Top-level logging configuration.
#[derive(Debug, Clone, Validate)]
pub struct LoggerConfig {
    /// Global log level. Valid values: trace, debug, info, warn, error (case-insensitive).
    #[validate(custom(function = "validate_log_level"))]
    pub level: String,

    /// Console output format.
    pub format: LogFormat,

    /// Whether to also emit to systemd journald (Unix only).
    pub journald: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            level: "info".to_string(),
            format: LogFormat::default(),
            journald: false,
        }
    }
}

impl LoggerConfig {
    /// Reads the logging configuration from `ROOMSENSE_LOG_LEVEL`,
    /// `ROOMSENSE_LOG_FORMAT` and `ROOMSENSE_JOURNALD`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let level = std::env::var("ROOMSENSE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let format = match std::env::var("ROOMSENSE_LOG_FORMAT") {
            Ok(raw) => raw.parse().map_err(|reason| ConfigError::InvalidVar {
                name: "ROOMSENSE_LOG_FORMAT",
                reason,
            })?,
            Err(_) => LogFormat::default(),
        };

        let journald = matches!(
            std::env::var("ROOMSENSE_JOURNALD").as_deref(),
            Ok("1") | Ok("true") | Ok("yes")
        );

        Ok(LoggerConfig {
            level,
            format,
            journald,
        })
    }
}

/// Validates that the provided log level is one of the supported values.
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => {
            let mut err = ValidationError::new("invalid_log_level");
            err.message = Some(format!("Invalid log level: {}", level).into());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_known_values() {
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn invalid_level_fails_validation() {
        let config = LoggerConfig {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LoggerConfig::default();
        assert!(config.validate().is_ok());
    }
}
