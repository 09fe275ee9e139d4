//! Callback delivery worker — outbound POST with bounded retry
//!
//! One outbox job is consumed per step. The dequeued job is deleted in
//! every branch; a retry posts a fresh job with the incremented attempt
//! counter and a jittered exponential delay rather than mutating the one
//! in flight, matching queue backends that cannot update a claimed
//! message. Beyond the attempt cap the job is dropped with a warning —
//! there is no dead-letter store.

use crate::config::RetryPolicy;
use crate::error::Result;
use crate::repo::{AckToken, JobQueue};
use crate::transport::CallbackTransport;
use crate::types::DeliveryJob;
use crate::worker::{Outcome, Worker};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Arc;

/// Jittered backoff delay in whole seconds for a failed attempt
///
/// The raw delay is `min(base * 2^attempt, max_delay)`; the posted delay
/// keeps a floor of half the raw value and adds up to another half of
/// jitter: `floor(raw/2 + uniform(0, raw/2))`.
pub fn backoff_delay_secs<R: Rng + ?Sized>(
    policy: &RetryPolicy,
    attempt: u32,
    rng: &mut R,
) -> u64 {
    let raw = policy.raw_delay_secs(attempt);
    let half = raw as f64 / 2.0;
    let jitter = if half > 0.0 {
        rng.gen_range(0.0..half)
    } else {
        0.0
    };
    (half + jitter).floor() as u64
}

/// Consumes the delivery outbox and performs subscriber callbacks
pub struct DeliveryWorker {
    outbox: Arc<dyn JobQueue>,
    transport: Arc<dyn CallbackTransport>,
    retry: RetryPolicy,
    rng: Box<dyn RngCore + Send>,
}

impl DeliveryWorker {
    /// Create a delivery worker with an entropy-seeded jitter source
    pub fn new(
        outbox: Arc<dyn JobQueue>,
        transport: Arc<dyn CallbackTransport>,
        retry: RetryPolicy,
    ) -> Self {
        Self::with_rng(outbox, transport, retry, StdRng::from_entropy())
    }

    /// Create a delivery worker with an explicit jitter source
    ///
    /// Lets tests pin the backoff draw to a seeded or mock generator.
    pub fn with_rng(
        outbox: Arc<dyn JobQueue>,
        transport: Arc<dyn CallbackTransport>,
        retry: RetryPolicy,
        rng: impl RngCore + Send + 'static,
    ) -> Self {
        Self {
            outbox,
            transport,
            retry,
            rng: Box::new(rng),
        }
    }

    /// Process one delivery job, if any is available
    ///
    /// Any 2xx response is success. A non-2xx response and a transport
    /// error are the same failure class: retried with backoff while
    /// attempts remain, dropped once the cap is reached.
    pub async fn deliver_next(&mut self) -> Result<Outcome> {
        let Some(job) = self.outbox.get().await? else {
            return Ok(Outcome::Idle);
        };

        let delivery: DeliveryJob = match serde_json::from_value(job.body.clone()) {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable delivery job");
                self.outbox.delete(&job.token).await?;
                return Ok(Outcome::Processed);
            }
        };

        let attempt = delivery.attempt();
        match self
            .transport
            .deliver(&delivery.callback_url, &delivery.payload)
            .await
        {
            Ok(response) if response.is_success() => {
                self.outbox.delete(&job.token).await?;
                tracing::info!(
                    callback = %delivery.callback_url,
                    status = response.status,
                    attempt,
                    "Callback delivered"
                );
            }
            Ok(response) => {
                self.retry_or_drop(&job.token, &delivery, attempt, format!("HTTP {}", response.status))
                    .await?;
            }
            Err(e) => {
                self.retry_or_drop(&job.token, &delivery, attempt, e.to_string())
                    .await?;
            }
        }

        Ok(Outcome::Processed)
    }

    async fn retry_or_drop(
        &mut self,
        token: &AckToken,
        delivery: &DeliveryJob,
        attempt: u32,
        reason: String,
    ) -> Result<()> {
        self.outbox.delete(token).await?;

        if attempt < self.retry.max_attempts {
            let delay = backoff_delay_secs(&self.retry, attempt, &mut *self.rng);
            let next = DeliveryJob {
                retry: Some(attempt + 1),
                ..delivery.clone()
            };
            self.outbox.post(serde_json::to_value(&next)?, delay).await?;

            tracing::warn!(
                callback = %delivery.callback_url,
                attempt,
                delay_secs = delay,
                reason = %reason,
                "Callback failed, retry scheduled"
            );
        } else {
            tracing::warn!(
                callback = %delivery.callback_url,
                attempt,
                reason = %reason,
                "Callback failed permanently, dropping job"
            );
        }

        Ok(())
    }
}

#[async_trait]
impl Worker for DeliveryWorker {
    fn name(&self) -> &'static str {
        "delivery"
    }

    async fn step(&mut self) -> Result<Outcome> {
        self.deliver_next().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::memory::MemoryQueue;
    use crate::transport::RecordingTransport;
    use rand::rngs::mock::StepRng;

    fn worker_with(
        outbox: Arc<MemoryQueue>,
        transport: Arc<RecordingTransport>,
    ) -> DeliveryWorker {
        DeliveryWorker::with_rng(
            outbox,
            transport,
            RetryPolicy::default(),
            StepRng::new(0, 0),
        )
    }

    async fn post_delivery(outbox: &MemoryQueue, retry: Option<u32>) {
        let mut body = serde_json::json!({
            "callbackUrl": "http://callback.example/hook",
            "payload": {"id": 24}
        });
        if let Some(retry) = retry {
            body["retry"] = serde_json::json!(retry);
        }
        outbox.post(body, 0).await.unwrap();
    }

    #[test]
    fn test_backoff_floor_with_zero_jitter() {
        let policy = RetryPolicy::default();
        let mut rng = StepRng::new(0, 0);
        assert_eq!(backoff_delay_secs(&policy, 1, &mut rng), 8);
        assert_eq!(backoff_delay_secs(&policy, 2, &mut rng), 16);
        assert_eq!(backoff_delay_secs(&policy, 3, &mut rng), 32);
        // Raw delay capped at 100 from attempt 4 on
        assert_eq!(backoff_delay_secs(&policy, 4, &mut rng), 50);
        assert_eq!(backoff_delay_secs(&policy, 9, &mut rng), 50);
    }

    #[test]
    fn test_backoff_bounded_by_raw_delay() {
        let policy = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(300);
        for attempt in 1..=6 {
            let raw = policy.raw_delay_secs(attempt);
            let delay = backoff_delay_secs(&policy, attempt, &mut rng);
            assert!(delay >= raw / 2, "attempt {}: {} < {}", attempt, delay, raw / 2);
            assert!(delay < raw, "attempt {}: {} >= {}", attempt, delay, raw);
        }
    }

    #[test]
    fn test_backoff_deterministic_for_fixed_seed() {
        let policy = RetryPolicy::default();
        let first = backoff_delay_secs(&policy, 1, &mut StdRng::seed_from_u64(300));
        let second = backoff_delay_secs(&policy, 1, &mut StdRng::seed_from_u64(300));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_outbox_is_idle() {
        let outbox = Arc::new(MemoryQueue::default());
        let transport = Arc::new(RecordingTransport::default());
        let mut worker = worker_with(outbox, transport);

        assert!(matches!(worker.deliver_next().await.unwrap(), Outcome::Idle));
    }

    #[tokio::test]
    async fn test_success_deletes_without_reenqueue() {
        let outbox = Arc::new(MemoryQueue::default());
        let transport = Arc::new(RecordingTransport::default());
        transport.respond_with(202).await;
        post_delivery(&outbox, None).await;

        let mut worker = worker_with(outbox.clone(), transport.clone());
        worker.deliver_next().await.unwrap();

        let deliveries = transport.deliveries().await;
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].url, "http://callback.example/hook");
        assert_eq!(deliveries[0].payload, serde_json::json!({"id": 24}));
        assert!(outbox.is_empty().await);
    }

    #[tokio::test]
    async fn test_failure_reenqueues_with_incremented_retry() {
        let outbox = Arc::new(MemoryQueue::default());
        let transport = Arc::new(RecordingTransport::default());
        transport.respond_with(400).await;
        post_delivery(&outbox, None).await;

        let mut worker = worker_with(outbox.clone(), transport.clone());
        worker.deliver_next().await.unwrap();

        let jobs = outbox.snapshot().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].body["retry"], 2);
        assert_eq!(jobs[0].body["callbackUrl"], "http://callback.example/hook");
        // Zero-jitter mock: floor(min(8 * 2^1, 100) / 2) exactly
        assert_eq!(jobs[0].delay_secs, 8);
    }

    #[tokio::test]
    async fn test_transport_error_retried_like_bad_status() {
        let outbox = Arc::new(MemoryQueue::default());
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_with("connection refused").await;
        post_delivery(&outbox, None).await;

        let mut worker = worker_with(outbox.clone(), transport);
        worker.deliver_next().await.unwrap();

        let jobs = outbox.snapshot().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].body["retry"], 2);
    }

    #[tokio::test]
    async fn test_second_failure_doubles_backoff() {
        let outbox = Arc::new(MemoryQueue::default());
        let transport = Arc::new(RecordingTransport::default());
        transport.respond_with(500).await;
        post_delivery(&outbox, Some(2)).await;

        let mut worker = worker_with(outbox.clone(), transport);
        worker.deliver_next().await.unwrap();

        let jobs = outbox.snapshot().await;
        assert_eq!(jobs[0].body["retry"], 3);
        assert_eq!(jobs[0].delay_secs, 16);
    }

    #[tokio::test]
    async fn test_retry_ceiling_drops_job() {
        let outbox = Arc::new(MemoryQueue::default());
        let transport = Arc::new(RecordingTransport::default());
        transport.respond_with(400).await;
        post_delivery(&outbox, Some(3)).await;

        let mut worker = worker_with(outbox.clone(), transport.clone());
        worker.deliver_next().await.unwrap();

        assert_eq!(transport.deliveries().await.len(), 1);
        assert!(outbox.is_empty().await);
    }

    #[tokio::test]
    async fn test_undecodable_job_dropped() {
        let outbox = Arc::new(MemoryQueue::default());
        let transport = Arc::new(RecordingTransport::default());
        outbox
            .post(serde_json::json!({"payload": {"id": 1}}), 0)
            .await
            .unwrap();

        let mut worker = worker_with(outbox.clone(), transport.clone());
        worker.deliver_next().await.unwrap();

        assert!(transport.deliveries().await.is_empty());
        assert!(outbox.is_empty().await);
    }
}
