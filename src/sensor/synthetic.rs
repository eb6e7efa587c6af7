//! Synthetic sensor for development hosts without GPIO.
//!
//! Produces a slow sine-wave drift around room conditions and injects a
//! transient failure on every fourth read so the retry path behaves the
//! same as it does against real hardware.

use std::f64::consts::TAU;

use time::OffsetDateTime;

use super::{Reading, SensorError, SensorReader};

const BASE_TEMPERATURE: f64 = 21.0;
const BASE_HUMIDITY: f64 = 48.0;
const DRIFT_PERIOD: u64 = 60;

/// Deterministic stand-in for the DHT11.
#[derive(Debug, Default)]
pub struct SyntheticSensor {
    ticks: u64,
    released: bool,
}

impl SyntheticSensor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SensorReader for SyntheticSensor {
    fn read(&mut self) -> Result<Reading, SensorError> {
        if self.released {
            return Err(SensorError::Released);
        }

        self.ticks += 1;
        if self.ticks % 4 == 0 {
            return Err(SensorError::Timing {
                phase: "synthetic dropout",
            });
        }

        let phase = (self.ticks % DRIFT_PERIOD) as f64 / DRIFT_PERIOD as f64 * TAU;
        Ok(Reading {
            temperature: BASE_TEMPERATURE + 2.0 * phase.sin(),
            humidity: BASE_HUMIDITY + 6.0 * phase.cos(),
            captured_at: OffsetDateTime::now_utc(),
        })
    }

    fn release(&mut self) {
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fourth_read_fails_transiently() {
        let mut sensor = SyntheticSensor::new();
        let mut failures = 0;
        for i in 1..=12 {
            match sensor.read() {
                Ok(_) => assert_ne!(i % 4, 0),
                Err(e) => {
                    assert!(e.is_transient());
                    assert_eq!(i % 4, 0);
                    failures += 1;
                }
            }
        }
        assert_eq!(failures, 3);
    }

    #[test]
    fn readings_stay_in_plausible_range() {
        let mut sensor = SyntheticSensor::new();
        for _ in 0..100 {
            if let Ok(reading) = sensor.read() {
                assert!((15.0..=30.0).contains(&reading.temperature));
                assert!((30.0..=70.0).contains(&reading.humidity));
            }
        }
    }

    #[test]
    fn released_sensor_refuses_reads() {
        let mut sensor = SyntheticSensor::new();
        sensor.release();
        assert!(matches!(sensor.read(), Err(SensorError::Released)));
    }
}
