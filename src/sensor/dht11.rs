//! GPIO-backed DHT11 driver.
//!
//! The DHT11 speaks a single-wire protocol: the host holds the data line
//! low for 18 ms, releases it, the sensor answers with an 80 µs low / 80 µs
//! high handshake and then clocks out 40 bits. Each bit starts with a
//! ~50 µs low; the length of the following high level encodes the value
//! (~27 µs for 0, ~70 µs for 1). The transfer is bit-banged with busy
//! waits, so a `read` blocks the calling thread for a few milliseconds.
//!
//! Missed edges and corrupt frames are a fact of life with this sensor and
//! are reported as transient `Timing`/`Checksum` errors; only GPIO-level
//! failures are fatal.

use std::{
    thread,
    time::{Duration, Instant},
};

use rppal::gpio::{Gpio, IoPin, Level, Mode};
use time::OffsetDateTime;
use tracing::debug;

use super::{Reading, SensorError, SensorReader};

/// Duration of the host start signal (data line held low).
const START_SIGNAL_LOW: Duration = Duration::from_millis(18);

/// Upper bound for any single level transition during handshake and data.
const EDGE_TIMEOUT_US: u64 = 200;

/// A high phase longer than this is a 1-bit, shorter is a 0-bit.
const ONE_BIT_THRESHOLD_US: u64 = 50;

/// A DHT11 sensor attached to a single GPIO data line.
///
/// The pin is acquired once at startup and owned exclusively until
/// `release` is called; further reads after release fail with
/// `SensorError::Released`.
pub struct Dht11 {
    pin: Option<IoPin>,
    bcm_pin: u8,
}

impl Dht11 {
    /// Acquires the GPIO pin for the sensor's data line.
    ///
    /// # Errors
    ///
    /// Returns `SensorError::Gpio` if the GPIO peripheral or the pin
    /// cannot be acquired (not running on a Pi, pin already in use, or
    /// insufficient permissions).
    pub fn open(bcm_pin: u8) -> Result<Self, SensorError> {
        let gpio = Gpio::new().map_err(|e| SensorError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(bcm_pin)
            .map_err(|e| SensorError::Gpio(e.to_string()))?
            .into_io(Mode::Input);

        debug!(pin = bcm_pin, "DHT11 data line acquired");
        Ok(Dht11 {
            pin: Some(pin),
            bcm_pin,
        })
    }

    /// Runs one full wire transfer and returns the raw 5-byte frame.
    fn transfer(pin: &mut IoPin) -> Result<[u8; 5], SensorError> {
        // Host start signal, then hand the line back to the sensor.
        pin.set_mode(Mode::Output);
        pin.set_low();
        thread::sleep(START_SIGNAL_LOW);
        pin.set_high();
        busy_wait(Duration::from_micros(30));
        pin.set_mode(Mode::Input);

        // Sensor handshake: ~80 us low, ~80 us high, then the first bit's
        // low phase begins.
        wait_for_level(pin, Level::Low, "response low")?;
        wait_for_level(pin, Level::High, "response high")?;
        wait_for_level(pin, Level::Low, "first bit")?;

        let mut frame = [0u8; 5];
        for bit in 0..40 {
            wait_for_level(pin, Level::High, "bit high")?;
            let high_us = wait_for_level(pin, Level::Low, "bit low")?;
            if high_us > ONE_BIT_THRESHOLD_US {
                frame[bit / 8] |= 1 << (7 - (bit % 8));
            }
        }

        Ok(frame)
    }
}

impl SensorReader for Dht11 {
    fn read(&mut self) -> Result<Reading, SensorError> {
        let pin = self.pin.as_mut().ok_or(SensorError::Released)?;
        let frame = Self::transfer(pin)?;
        let (temperature, humidity) = decode(frame)?;

        Ok(Reading {
            temperature,
            humidity,
            captured_at: OffsetDateTime::now_utc(),
        })
    }

    fn release(&mut self) {
        if self.pin.take().is_some() {
            debug!(pin = self.bcm_pin, "DHT11 data line released");
        }
    }
}

/// Verifies the frame checksum and decodes temperature and humidity.
///
/// Byte layout: humidity integral, humidity decimal, temperature integral
/// (bit 7 is the sign on DHT11-compatible parts), temperature decimal,
/// checksum (wrapping sum of the first four bytes).
fn decode(frame: [u8; 5]) -> Result<(f64, f64), SensorError> {
    let computed = frame[0]
        .wrapping_add(frame[1])
        .wrapping_add(frame[2])
        .wrapping_add(frame[3]);
    if computed != frame[4] {
        return Err(SensorError::Checksum {
            computed,
            received: frame[4],
        });
    }

    let humidity = frame[0] as f64 + frame[1] as f64 / 10.0;
    let magnitude = (frame[2] & 0x7f) as f64 + frame[3] as f64 / 10.0;
    let temperature = if frame[2] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };

    Ok((temperature, humidity))
}

/// Spins until the pin reads `level`, returning the elapsed microseconds.
fn wait_for_level(
    pin: &IoPin,
    level: Level,
    phase: &'static str,
) -> Result<u64, SensorError> {
    let start = Instant::now();
    while pin.read() != level {
        if start.elapsed() > Duration::from_micros(EDGE_TIMEOUT_US) {
            return Err(SensorError::Timing { phase });
        }
    }
    Ok(start.elapsed().as_micros() as u64)
}

/// Busy-waits for short, microsecond-scale delays where `thread::sleep`
/// is too coarse.
fn busy_wait(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_valid_frame() {
        // 48% RH, 21.0 C
        let frame = [48, 0, 21, 0, 69];
        let (temperature, humidity) = decode(frame).expect("valid frame");
        assert_eq!(temperature, 21.0);
        assert_eq!(humidity, 48.0);
    }

    #[test]
    fn decode_negative_temperature() {
        let frame = [30, 0, 0x80 | 2, 5, 30u8.wrapping_add(0x82).wrapping_add(5)];
        let (temperature, _) = decode(frame).expect("valid frame");
        assert_eq!(temperature, -2.5);
    }

    #[test]
    fn decode_rejects_bad_checksum() {
        let frame = [48, 0, 21, 0, 70];
        match decode(frame) {
            Err(SensorError::Checksum { computed, received }) => {
                assert_eq!(computed, 69);
                assert_eq!(received, 70);
            }
            other => panic!("expected checksum error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn decode_checksum_wraps() {
        let frame = [200, 0, 100, 0, 200u8.wrapping_add(100)];
        assert!(decode(frame).is_ok());
    }
}
