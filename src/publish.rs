//! Publish use cases — turn domain facts into notification jobs
//!
//! Two producers share one contract: compute a topic from the message and
//! post a `NotificationJob` onto the notification queue. Status changes
//! are published synchronously by the write path after its database
//! commit; new-message events come from the watermark poller.

use crate::error::Result;
use crate::repo::JobQueue;
use crate::types::{Message, NotificationJob};
use std::sync::Arc;

/// Publishes channel events onto the notification queue
pub struct EventPublisher {
    notifications: Arc<dyn JobQueue>,
}

impl EventPublisher {
    /// Create a publisher posting to the given notification queue
    pub fn new(notifications: Arc<dyn JobQueue>) -> Self {
        Self { notifications }
    }

    /// Publish a status-change event for a message
    ///
    /// Topic is the stringified message id, so a party watching one
    /// message subscribes to exactly that id. A failed enqueue surfaces
    /// to the caller; the already-committed status change stands either
    /// way.
    pub async fn publish_status_change(&self, message: &Message) -> Result<()> {
        self.publish(NotificationJob {
            topic: message.id.to_string(),
            content: serde_json::json!({"id": message.id}),
        })
        .await
    }

    /// Publish a new-message event for the receiving jurisdiction
    pub async fn publish_new_message(&self, message: &Message) -> Result<()> {
        self.publish(NotificationJob {
            topic: format!("jurisdiction.{}", message.receiver),
            content: serde_json::json!({"id": message.id}),
        })
        .await
    }

    async fn publish(&self, job: NotificationJob) -> Result<()> {
        let topic = job.topic.clone();
        self.notifications
            .post(serde_json::to_value(&job)?, 0)
            .await?;

        tracing::info!(topic = %topic, "Notification published");
        Ok(())
    }
}
