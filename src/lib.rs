//! roomsense — DHT11 temperature/humidity bridge for Home Assistant
//!
//! This crate samples a DHT11 single-wire sensor on a Raspberry Pi,
//! smooths the readings over several attempts (the sensor misses reads
//! regularly, which is normal for this sensor class), and publishes the
//! averaged result to an MQTT broker. The entities announce themselves
//! to Home Assistant via retained MQTT discovery messages, so no manual
//! configuration is needed on the platform side.
//!
//! ## Modules
//!
//! * `config` — Environment-driven configuration, loaded and validated
//!   once at startup (via the `validator` crate) and immutable thereafter.
//!
//! * `core` — Core runtime components:
//!   - Sampling/aggregation with transient-failure tolerance
//!   - Device identity and topic derivation
//!   - The periodic sampling loop
//!
//! * `sensor` — The sensor seam: a synchronous reader trait, the
//!   GPIO-backed DHT11 driver (behind the `dht11` feature), and a
//!   synthetic stand-in for development on non-Pi hosts.
//!
//! * `mqtt` — Broker connection lifecycle, discovery and state
//!   publishing on top of `rumqttc`.
//!
//! * `logger` — Centralized logging initialization using `tracing`,
//!   with console output in multiple formats and optional systemd
//!   journald integration.

pub mod config;
pub mod core;
pub mod logger;
pub mod mqtt;
pub mod sensor;
