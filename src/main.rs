use std::{process, sync::Arc, time::Duration};

use roomsense::{
    config::Config,
    core::{identity::DeviceIdentity, runner::Runner, sampler::Sampler},
    logger::LoggerManager,
    mqtt::MqttPublisher,
    print_error,
    sensor::SensorReader,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[cfg(feature = "dht11")]
fn open_sensor(config: &Config) -> impl SensorReader {
    use roomsense::sensor::dht11::Dht11;

    Dht11::open(config.dht_pin).unwrap_or_else(|e| {
        error!("failed to open DHT11 on BCM pin {}: {}", config.dht_pin, e);
        process::exit(1);
    })
}

#[cfg(not(feature = "dht11"))]
fn open_sensor(_config: &Config) -> impl SensorReader {
    use roomsense::sensor::synthetic::SyntheticSensor;

    tracing::warn!("built without DHT11 support, using the synthetic sensor");
    SyntheticSensor::new()
}

#[tokio::main]
async fn main() {
    let config = Config::from_env().unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });
    let mut logger_manager = LoggerManager::new(config.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to set up logging: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init logging: {}", e);
        process::exit(1);
    });

    info!("starting roomsense version {}...", env!("CARGO_PKG_VERSION"));
    debug!("{:#?}", config.mqtt);

    let identity = DeviceIdentity::derive(&config.device_name);
    info!(
        "device id: {} (topic prefix: {})",
        identity.id, identity.topic_prefix
    );

    let cancel = CancellationToken::new();
    let publisher = MqttPublisher::connect(&config.mqtt, identity.clone(), cancel.clone())
        .await
        .unwrap_or_else(|e| {
            error!("failed to start MQTT client: {}", e);
            process::exit(1);
        });

    if let Err(e) = publisher.publish_discovery().await {
        error!("failed to publish discovery configs: {}", e);
        process::exit(1);
    }
    info!("discovery configs published");

    let sensor = open_sensor(&config);
    let runner = Runner::new(
        Sampler::new(sensor),
        Arc::new(publisher),
        Duration::from_secs(config.sample_interval),
        cancel.clone(),
    );

    tokio::select! {
        result = runner.run() => {
            if let Err(e) = result {
                error!("fatal sensor failure: {}", e);
                cancel.cancel();
                // Give the event loop a moment to flip availability and
                // disconnect cleanly.
                tokio::time::sleep(Duration::from_millis(500)).await;
                process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down...");
            cancel.cancel();
            tokio::time::sleep(Duration::from_millis(500)).await;
            info!("shutdown complete");
        }
    }
}
