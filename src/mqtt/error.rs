use thiserror::Error;

/// Errors surfaced by the publish path.
///
/// Network-level failures are not represented here: reconnection is
/// handled by the event-loop task driving the broker client, and a
/// publish enqueued while disconnected is delivered after reconnect.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The broker client rejected the request (full queue, shutdown).
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// Payload serialization failed.
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
