//! Broker connection lifecycle and publishing.
//!
//! `MqttPublisher` owns the `rumqttc` client. Connecting spawns a
//! background task that drives the client's event loop: it completes the
//! handshake, subscribes to the broker's `$SYS/#` diagnostics tree
//! (observability only), marks the device available, and retries after
//! connection errors. Reconnection policy therefore lives entirely in
//! that task; publish calls from the sampling loop just enqueue.

use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, LastWill, MqttOptions, Packet, QoS,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    config::MqttConfig,
    core::{
        identity::{DeviceIdentity, Measurement},
        runner::StatePublisher,
        sampler::SamplingResult,
    },
    mqtt::discovery::{DiscoveryConfig, PAYLOAD_AVAILABLE, PAYLOAD_NOT_AVAILABLE},
};

pub mod discovery;
pub mod error;

pub use error::PublishError;

const KEEP_ALIVE: Duration = Duration::from_secs(60);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// The per-cycle state payload, `{"temperature": <number>, "humidity": <integer>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    pub temperature: f64,
    pub humidity: u8,
}

impl From<&SamplingResult> for StatePayload {
    fn from(result: &SamplingResult) -> Self {
        StatePayload {
            temperature: result.temperature,
            humidity: result.humidity,
        }
    }
}

/// Owns the broker connection and the device's topic contract.
pub struct MqttPublisher {
    client: AsyncClient,
    identity: DeviceIdentity,
}

impl MqttPublisher {
    /// Builds the client and spawns the event-loop task.
    ///
    /// The TCP connection is established asynchronously by the spawned
    /// task; publishes made before the handshake completes are queued by
    /// the client. A Last Will on the availability topic flips the device
    /// to `offline` if the process dies without a clean disconnect.
    pub async fn connect(
        config: &MqttConfig,
        identity: DeviceIdentity,
        cancel: CancellationToken,
    ) -> Result<Self, PublishError> {
        let client_id = format!("roomsense-{}", identity.id);
        let mut options = MqttOptions::new(client_id, &config.host, config.port);
        options.set_credentials(&config.username, &config.password);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_last_will(LastWill::new(
            identity.availability_topic(),
            PAYLOAD_NOT_AVAILABLE,
            QoS::AtLeastOnce,
            true,
        ));

        let (client, event_loop) = AsyncClient::new(options, 10);
        info!(
            "MQTT client starting (broker: {}:{})",
            config.host, config.port
        );

        tokio::spawn(run_event_loop(
            client.clone(),
            event_loop,
            identity.clone(),
            cancel,
        ));

        Ok(MqttPublisher { client, identity })
    }

    /// Publishes the two retained discovery configs. Called once at startup.
    pub async fn publish_discovery(&self) -> Result<(), PublishError> {
        for measurement in [Measurement::Temperature, Measurement::Humidity] {
            let config = DiscoveryConfig::for_measurement(&self.identity, measurement);
            let topic = self.identity.config_topic(measurement);
            let payload = serde_json::to_vec(&config)?;
            self.client
                .publish(&topic, QoS::AtLeastOnce, true, payload)
                .await?;
            debug!(topic = %topic, "published discovery config");
        }
        Ok(())
    }

    /// Publishes one cycle's averaged readings to the state topic,
    /// un-retained.
    pub async fn publish_state(&self, result: &SamplingResult) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(&StatePayload::from(result))?;
        self.client
            .publish(self.identity.state_topic(), QoS::AtMostOnce, false, payload)
            .await?;
        trace!("published state");
        Ok(())
    }
}

#[async_trait::async_trait]
impl StatePublisher for MqttPublisher {
    async fn publish_state(
        &self,
        result: &SamplingResult,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        MqttPublisher::publish_state(self, result)
            .await
            .map_err(|e| Box::new(e) as _)
    }
}

/// Drives the broker client until cancellation.
///
/// On every successful handshake (initial connect and each reconnect) it
/// renews the `$SYS/#` subscription and re-publishes the retained
/// `online` availability payload.
async fn run_event_loop(
    client: AsyncClient,
    mut event_loop: EventLoop,
    identity: DeviceIdentity,
    cancel: CancellationToken,
) {
    let availability_topic = identity.availability_topic();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                // Best effort: flip availability to offline and disconnect
                // cleanly so the Last Will does not fire.
                let _ = client
                    .publish(&availability_topic, QoS::AtLeastOnce, true, PAYLOAD_NOT_AVAILABLE)
                    .await;
                let _ = client.disconnect().await;
                let deadline = Instant::now() + Duration::from_millis(500);
                while Instant::now() < deadline {
                    if event_loop.poll().await.is_err() {
                        break;
                    }
                }
                info!("MQTT event loop stopped");
                return;
            }

            event = event_loop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(ack)))
                    if ack.code == ConnectReturnCode::Success =>
                {
                    info!("connected to broker");
                    if let Err(e) = client.subscribe("$SYS/#", QoS::AtMostOnce).await {
                        warn!(error = %e, "failed to subscribe to broker diagnostics");
                    }
                    if let Err(e) = client
                        .publish(&availability_topic, QoS::AtLeastOnce, true, PAYLOAD_AVAILABLE)
                        .await
                    {
                        warn!(error = %e, "failed to publish availability");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    trace!(topic = %publish.topic, "broker message");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        error = %e,
                        "MQTT connection error, retrying in {}s",
                        RECONNECT_DELAY.as_secs()
                    );
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}
