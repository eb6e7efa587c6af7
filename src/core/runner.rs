//! The periodic sampling loop.
//!
//! The `Runner` drives the sample → publish cycle on a fixed interval,
//! forever. Cycles are independent: an empty pass is logged and skipped,
//! with no backoff adjustment. The only exits are a fatal sensor error
//! (propagated to the caller, which terminates the process) and the
//! cancellation token, checked at cycle boundaries.

use std::{sync::Arc, time::Duration};

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::sampler::{Sampler, SamplingResult, SAMPLE_ATTEMPTS};
use crate::sensor::{SensorError, SensorReader};

/// Trait for publishers that can send a cycle's result to an external system.
#[async_trait::async_trait]
pub trait StatePublisher: Send + Sync {
    /// Publishes one successful sampling result.
    async fn publish_state(
        &self,
        result: &SamplingResult,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Runs the sample → aggregate → publish cycle on a fixed interval.
pub struct Runner<R: SensorReader> {
    sampler: Sampler<R>,
    publisher: Arc<dyn StatePublisher>,
    interval: Duration,
    cancel: CancellationToken,
}

impl<R: SensorReader> Runner<R> {
    pub fn new(
        sampler: Sampler<R>,
        publisher: Arc<dyn StatePublisher>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Runner {
            sampler,
            publisher,
            interval,
            cancel,
        }
    }

    /// Runs the loop until cancellation or a fatal sensor error.
    ///
    /// Publish failures are logged and do not stop the loop; reconnection
    /// is the broker client's job, not ours.
    pub async fn run(mut self) -> Result<(), SensorError> {
        info!(
            "sampling loop started (interval: {}s, {} reads per cycle)",
            self.interval.as_secs(),
            SAMPLE_ATTEMPTS
        );

        loop {
            if self.cancel.is_cancelled() {
                info!("cancellation requested, stopping sampling loop");
                return Ok(());
            }

            let start = Instant::now();
            let result = self.sampler.sample(SAMPLE_ATTEMPTS).await?;

            if result.success {
                info!(
                    "avg temp: {:.1} C, avg humidity: {}% ({} samples)",
                    result.temperature, result.humidity, result.samples
                );
                if let Err(e) = self.publisher.publish_state(&result).await {
                    error!(error = %e, "state publish failed, skipping this cycle");
                }
            } else {
                warn!("failed to get average readings, skipping publish");
            }

            let elapsed = start.elapsed();
            if elapsed < self.interval {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        info!("cancellation requested, stopping sampling loop");
                        return Ok(());
                    }
                    _ = sleep(self.interval - elapsed) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use time::OffsetDateTime;
    use tracing_test::traced_test;

    use super::*;
    use crate::sensor::Reading;

    #[derive(Default)]
    struct MockPublisher {
        published: Mutex<Vec<SamplingResult>>,
    }

    #[async_trait::async_trait]
    impl StatePublisher for MockPublisher {
        async fn publish_state(
            &self,
            result: &SamplingResult,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.published.lock().unwrap().push(result.clone());
            Ok(())
        }
    }

    impl MockPublisher {
        fn publish_count(&self) -> usize {
            self.published.lock().unwrap().len()
        }

        fn last(&self) -> Option<SamplingResult> {
            self.published.lock().unwrap().last().cloned()
        }
    }

    struct ScriptedSensor {
        script: VecDeque<Result<Reading, SensorError>>,
    }

    impl SensorReader for ScriptedSensor {
        fn read(&mut self) -> Result<Reading, SensorError> {
            self.script.pop_front().unwrap_or(Err(SensorError::Timing {
                phase: "script exhausted",
            }))
        }

        fn release(&mut self) {}
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

    fn runner_with(
        script: Vec<Result<Reading, SensorError>>,
        publisher: Arc<MockPublisher>,
        cancel: CancellationToken,
    ) -> Runner<ScriptedSensor> {
        Runner::new(
            Sampler::new(ScriptedSensor {
                script: script.into(),
            }),
            publisher,
            Duration::from_secs(60),
            cancel,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn successful_cycle_publishes_once() {
        let publisher = Arc::new(MockPublisher::default());
        let runner = runner_with(
            vec![
                ok(20.0, 50.0),
                transient(),
                ok(21.0, 52.0),
                ok(20.0, 49.0),
                ok(21.0, 51.0),
            ],
            publisher.clone(),
            CancellationToken::new(),
        );

        let handle = tokio::spawn(runner.run());
        // Two full intervals: the first cycle succeeds, later ones run on
        // an exhausted script and are all-transient.
        tokio::time::sleep(Duration::from_secs(150)).await;
        handle.abort();

        assert_eq!(publisher.publish_count(), 1);
        let published = publisher.last().unwrap();
        assert_eq!(published.temperature, 20.5);
        assert_eq!(published.humidity, 51);
        assert_eq!(published.samples, 4);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn empty_cycle_skips_publish_with_a_warning() {
        let publisher = Arc::new(MockPublisher::default());
        let runner = runner_with(vec![], publisher.clone(), CancellationToken::new());

        let handle = tokio::spawn(runner.run());
        tokio::time::sleep(Duration::from_secs(90)).await;
        handle.abort();

        assert_eq!(publisher.publish_count(), 0);
        assert!(logs_contain("failed to get average readings"));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_sensor_error_ends_the_loop() {
        let publisher = Arc::new(MockPublisher::default());
        let runner = runner_with(
            vec![ok(20.0, 50.0), Err(SensorError::Gpio("pin fault".into()))],
            publisher.clone(),
            CancellationToken::new(),
        );

        let result = runner.run().await;
        assert!(matches!(result, Err(SensorError::Gpio(_))));
        // No partial result was published for the aborted cycle.
        assert_eq!(publisher.publish_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_loop_at_the_cycle_boundary() {
        let publisher = Arc::new(MockPublisher::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let runner = runner_with(vec![ok(20.0, 50.0)], publisher.clone(), cancel);

        assert!(runner.run().await.is_ok());
        assert_eq!(publisher.publish_count(), 0);
    }
}
