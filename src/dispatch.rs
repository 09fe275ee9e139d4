//! Fan-out dispatcher — expand one notification into per-subscriber
//! delivery jobs
//!
//! One notification is consumed per step. The notification job is deleted
//! only after every delivery job has been enqueued; a crash in between
//! redelivers the notification and duplicates some delivery jobs, which
//! the at-least-once contract permits.

use crate::error::Result;
use crate::repo::{JobQueue, SubscriptionsRepo};
use crate::types::{DeliveryJob, NotificationJob};
use crate::worker::{Outcome, Worker};
use async_trait::async_trait;
use std::sync::Arc;

/// Consumes the notification queue and fans out to the delivery outbox
pub struct Dispatcher {
    notifications: Arc<dyn JobQueue>,
    subscriptions: Arc<dyn SubscriptionsRepo>,
    outbox: Arc<dyn JobQueue>,
}

impl Dispatcher {
    /// Create a dispatcher over the given queues and subscription store
    pub fn new(
        notifications: Arc<dyn JobQueue>,
        subscriptions: Arc<dyn SubscriptionsRepo>,
        outbox: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            notifications,
            subscriptions,
            outbox,
        }
    }

    /// Process one notification job, if any is available
    ///
    /// Enqueues one delivery job per valid matching subscription, then
    /// deletes the notification. A topic with zero subscribers is not an
    /// error — the notification is simply dropped after a log line.
    pub async fn dispatch_next(&self) -> Result<Outcome> {
        let Some(job) = self.notifications.get().await? else {
            return Ok(Outcome::Idle);
        };

        let notification: NotificationJob = match serde_json::from_value(job.body.clone()) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable notification job");
                self.notifications.delete(&job.token).await?;
                return Ok(Outcome::Processed);
            }
        };

        let subscribers = self.subscriptions.matching(&notification.topic).await?;
        if subscribers.is_empty() {
            tracing::info!(topic = %notification.topic, "No subscribers for topic");
        }

        let mut enqueued = 0usize;
        for subscription in &subscribers {
            if !subscription.is_valid {
                tracing::debug!(
                    topic = %notification.topic,
                    callback = %subscription.callback_url,
                    "Skipping lapsed subscription"
                );
                continue;
            }

            let delivery = DeliveryJob {
                callback_url: subscription.callback_url.clone(),
                payload: notification.content.clone(),
                retry: None,
            };
            self.outbox.post(serde_json::to_value(&delivery)?, 0).await?;
            enqueued += 1;
        }

        self.notifications.delete(&job.token).await?;

        tracing::info!(
            topic = %notification.topic,
            deliveries = enqueued,
            "Notification dispatched"
        );
        Ok(Outcome::Processed)
    }
}

#[async_trait]
impl Worker for Dispatcher {
    fn name(&self) -> &'static str {
        "dispatch"
    }

    async fn step(&mut self) -> Result<Outcome> {
        self.dispatch_next().await
    }
}
