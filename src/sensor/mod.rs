//! Sensor access seam.
//!
//! `SensorReader` is the contract between the sampling logic and whatever
//! actually produces readings: the GPIO-backed DHT11 driver on a Pi, the
//! synthetic sensor on a development host, or a scripted sensor in tests.
//!
//! Errors are split into two classes. Checksum and timing violations are
//! *transient*: the DHT's single-wire protocol is timing-sensitive and
//! misses reads regularly, so these are recovered by retrying within the
//! same sampling pass. Everything else is *fatal*: the sensor resource may
//! be in an undefined state and the process terminates.

use thiserror::Error;
use time::OffsetDateTime;

#[cfg(feature = "dht11")]
pub mod dht11;
pub mod synthetic;

/// One successful instantaneous sensor sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// When the sample was captured.
    pub captured_at: OffsetDateTime,
}

/// Errors produced by a sensor read.
#[derive(Error, Debug)]
pub enum SensorError {
    /// The 40-bit frame arrived but its checksum byte does not match.
    #[error("checksum mismatch: computed {computed:#04x}, received {received:#04x}")]
    Checksum { computed: u8, received: u8 },

    /// The line did not change level within the protocol's timing window.
    #[error("timing violation while waiting for {phase}")]
    Timing { phase: &'static str },

    /// Low-level GPIO access failed.
    #[error("GPIO access failed: {0}")]
    Gpio(String),

    /// The sensor handle was already released.
    #[error("sensor handle already released")]
    Released,
}

impl SensorError {
    /// Whether this error belongs to the expected, recoverable class.
    ///
    /// Transient errors are retried within a sampling pass; anything else
    /// propagates and terminates the process.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SensorError::Checksum { .. } | SensorError::Timing { .. }
        )
    }
}

/// A source of instantaneous (temperature, humidity) samples.
///
/// `read` is a short synchronous call; the DHT protocol is bit-banged with
/// microsecond timing and cannot yield mid-transfer. `release` drops the
/// underlying resource; it is called on fatal failure or shutdown, and any
/// `read` after it must return `SensorError::Released`.
pub trait SensorReader: Send {
    fn read(&mut self) -> Result<Reading, SensorError>;
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_and_timing_are_transient() {
        assert!(SensorError::Checksum {
            computed: 0x42,
            received: 0x41
        }
        .is_transient());
        assert!(SensorError::Timing { phase: "bit high" }.is_transient());
    }

    #[test]
    fn gpio_and_released_are_fatal() {
        assert!(!SensorError::Gpio("pin busy".into()).is_transient());
        assert!(!SensorError::Released.is_transient());
    }
}
