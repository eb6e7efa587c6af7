//! Resilient sampling and aggregation.
//!
//! The `Sampler` owns the sensor handle and drives it several times per
//! cycle, tolerating the transient read failures that are normal for
//! DHT-class sensors. A pass reduces the successful reads to one smoothed
//! `SamplingResult`; a pass where every attempt failed transiently is a
//! normal outcome (`success == false`), not an error. Only a fatal sensor
//! error aborts the pass, and it releases the sensor handle on the way
//! out because the hardware may be in an undefined state.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::sensor::{SensorError, SensorReader};

/// Number of reads attempted per sampling pass.
pub const SAMPLE_ATTEMPTS: usize = 5;

/// Spacing between consecutive successful reads. The DHT11 holds its last
/// conversion for about a second, so back-to-back reads within a pass may
/// return the same sample twice; that is fine for averaging.
const READ_SPACING: Duration = Duration::from_millis(500);

/// Back-off after a transient failure, giving the sensor time to settle.
const RECOVERY_DELAY: Duration = Duration::from_secs(2);

/// Smoothed output of one sampling pass. Immutable once produced.
///
/// `success == false` iff zero reads succeeded; in that case the averages
/// are meaningless and must not be published. When `success` is true,
/// `samples >= 1` and both averages derive only from attempts where
/// temperature and humidity were jointly obtainable.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingResult {
    /// Average temperature in °C, rounded to the nearest 0.5.
    pub temperature: f64,
    /// Average relative humidity in percent, rounded to the nearest integer.
    pub humidity: u8,
    /// Number of successful reads that contributed.
    pub samples: usize,
    /// Whether at least one read succeeded.
    pub success: bool,
}

impl SamplingResult {
    fn averaged(temperatures: &[f64], humidities: &[f64]) -> Self {
        SamplingResult {
            temperature: round_to_half(mean(temperatures)),
            humidity: mean(humidities).round() as u8,
            samples: temperatures.len(),
            success: true,
        }
    }

    fn empty() -> Self {
        SamplingResult {
            temperature: 0.0,
            humidity: 0,
            samples: 0,
            success: false,
        }
    }
}

/// Drives the sensor and aggregates its readings.
///
/// Owns the sensor handle exclusively for the process lifetime; the
/// handle is released only on fatal failure.
pub struct Sampler<R: SensorReader> {
    reader: R,
}

impl<R: SensorReader> Sampler<R> {
    pub fn new(reader: R) -> Self {
        Sampler { reader }
    }

    /// Runs one sampling pass of up to `attempts` reads.
    ///
    /// Transient failures are logged and retried after a recovery delay
    /// without aborting the pass. Returns `Err` only for a fatal sensor
    /// error, after releasing the sensor handle; no partial result is
    /// produced in that case.
    pub async fn sample(&mut self, attempts: usize) -> Result<SamplingResult, SensorError> {
        debug_assert!(attempts > 0);

        let mut temperatures = Vec::with_capacity(attempts);
        let mut humidities = Vec::with_capacity(attempts);

        for attempt in 1..=attempts {
            match self.reader.read() {
                Ok(reading) => {
                    debug!(
                        attempt,
                        temperature = reading.temperature,
                        humidity = reading.humidity,
                        "sensor read ok"
                    );
                    temperatures.push(reading.temperature);
                    humidities.push(reading.humidity);
                    sleep(READ_SPACING).await;
                }
                Err(e) if e.is_transient() => {
                    // Expected for this sensor class; keep going.
                    warn!(attempt, error = %e, "transient sensor failure");
                    sleep(RECOVERY_DELAY).await;
                }
                Err(e) => {
                    error!(error = %e, "unrecoverable sensor failure, releasing sensor");
                    self.reader.release();
                    return Err(e);
                }
            }
        }

        if temperatures.is_empty() {
            return Ok(SamplingResult::empty());
        }
        Ok(SamplingResult::averaged(&temperatures, &humidities))
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Rounds to the nearest 0.5, halves away from zero (`f64::round`
/// semantics). The DHT11's resolution does not support finer granularity;
/// rounding avoids publishing false precision.
fn round_to_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
    };

    use time::OffsetDateTime;

    use super::*;
    use crate::sensor::Reading;

    /// Sensor that replays a fixed script of outcomes; reads past the end
    /// of the script fail transiently.
    struct ScriptedSensor {
        script: VecDeque<Result<Reading, SensorError>>,
        released: Arc<AtomicBool>,
    }

    impl ScriptedSensor {
        fn new(script: Vec<Result<Reading, SensorError>>) -> (Self, Arc<AtomicBool>) {
            let released = Arc::new(AtomicBool::new(false));
            (
                ScriptedSensor {
                    script: script.into(),
                    released: released.clone(),
                },
                released,
            )
        }
    }

    impl SensorReader for ScriptedSensor {
        fn read(&mut self) -> Result<Reading, SensorError> {
            self.script.pop_front().unwrap_or(Err(SensorError::Timing {
                phase: "script exhausted",
            }))
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn ok(temperature: f64, humidity: f64) -> Result<Reading, SensorError> {
        Ok(Reading {
            temperature,
            humidity,
            captured_at: OffsetDateTime::UNIX_EPOCH,
        })
    }

    fn transient() -> Result<Reading, SensorError> {
        Err(SensorError::Timing { phase: "bit high" })
    }

    #[tokio::test(start_paused = true)]
    async fn averages_survive_a_transient_failure() {
        // 4 successes and 1 transient failure across 5 attempts:
        // mean temp 20.5 -> 20.5, mean humidity 50.5 -> 51 (half away
        // from zero).
        let (sensor, _) = ScriptedSensor::new(vec![
            ok(20.0, 50.0),
            transient(),
            ok(21.0, 52.0),
            ok(20.0, 49.0),
            ok(21.0, 51.0),
        ]);
        let mut sampler = Sampler::new(sensor);

        let result = sampler.sample(SAMPLE_ATTEMPTS).await.unwrap();
        assert!(result.success);
        assert_eq!(result.samples, 4);
        assert_eq!(result.temperature, 20.5);
        assert_eq!(result.humidity, 51);
    }

    #[tokio::test(start_paused = true)]
    async fn all_transient_yields_empty_result() {
        let (sensor, released) = ScriptedSensor::new(vec![
            transient(),
            transient(),
            transient(),
            transient(),
            transient(),
        ]);
        let mut sampler = Sampler::new(sensor);

        let result = sampler.sample(SAMPLE_ATTEMPTS).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.samples, 0);
        // Transient failures never release the sensor.
        assert!(!released.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_stops_the_pass_and_releases_the_sensor() {
        let (sensor, released) = ScriptedSensor::new(vec![
            ok(20.0, 50.0),
            Err(SensorError::Gpio("pin fault".into())),
            ok(21.0, 51.0),
        ]);
        let mut sampler = Sampler::new(sensor);

        let err = sampler.sample(SAMPLE_ATTEMPTS).await.unwrap_err();
        assert!(!err.is_transient());
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn single_success_is_enough() {
        let (sensor, _) = ScriptedSensor::new(vec![
            transient(),
            transient(),
            ok(19.8, 55.2),
            transient(),
            transient(),
        ]);
        let mut sampler = Sampler::new(sensor);

        let result = sampler.sample(SAMPLE_ATTEMPTS).await.unwrap();
        assert!(result.success);
        assert_eq!(result.samples, 1);
        assert_eq!(result.temperature, 20.0);
        assert_eq!(result.humidity, 55);
    }

    #[test]
    fn temperature_rounds_to_nearest_half() {
        assert_eq!(round_to_half(20.0), 20.0);
        assert_eq!(round_to_half(20.2), 20.0);
        assert_eq!(round_to_half(20.3), 20.5);
        assert_eq!(round_to_half(20.5), 20.5);
        assert_eq!(round_to_half(20.7), 20.5);
        assert_eq!(round_to_half(20.8), 21.0);
        // Halves round away from zero.
        assert_eq!(round_to_half(20.25), 20.5);
        assert_eq!(round_to_half(-20.25), -20.5);
    }

    #[test]
    fn humidity_rounds_half_away_from_zero() {
        assert_eq!((50.5f64).round() as u8, 51);
        assert_eq!((50.4f64).round() as u8, 50);
        let result = SamplingResult::averaged(&[20.0], &[50.5]);
        assert_eq!(result.humidity, 51);
    }
}
