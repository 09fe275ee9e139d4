//! Repository traits — the pipeline's view of external storage
//!
//! Concrete backends (relational database, object store, managed queue)
//! implement these traits; the workers depend only on the abstractions.
//! The [`memory`] module provides in-process implementations for
//! development and tests.

use crate::error::Result;
use crate::pattern::Pattern;
use crate::types::{Message, Subscription};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod memory;

/// Durable mapping of (pattern, callback URL) to a subscription lease
#[async_trait]
pub trait SubscriptionsRepo: Send + Sync {
    /// Idempotent upsert keyed on `pattern.to_key(callback_url)` — an
    /// existing record for the same pair is replaced, expiry included
    async fn subscribe(
        &self,
        pattern: &Pattern,
        callback_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// All subscriptions whose pattern matches the published topic,
    /// including ones whose lease has lapsed (`is_valid == false`)
    async fn matching(&self, topic: &str) -> Result<Vec<Subscription>>;

    /// All subscriptions registered under this exact pattern
    async fn by_pattern(&self, pattern: &Pattern) -> Result<Vec<Subscription>>;

    /// Delete by composite key; deleting an absent key is a no-op
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Claim token for a dequeued job
///
/// Returned by [`JobQueue::get`] and passed back to [`JobQueue::delete`]
/// once the consumer has finished with the job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AckToken(pub String);

/// A job claimed from a queue
#[derive(Debug, Clone)]
pub struct QueuedJob {
    /// Token for deleting the job after processing
    pub token: AckToken,

    /// Raw JSON job body
    pub body: serde_json::Value,
}

/// At-least-once job queue with competing-consumer semantics
///
/// Backs both the notification queue and the delivery outbox. A job
/// claimed via [`get`](JobQueue::get) is invisible to other consumers
/// until it is deleted or the backend's visibility timeout elapses and
/// it becomes redeliverable — consumers must tolerate redelivery.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job, optionally delayed by `delay_secs`
    async fn post(&self, body: serde_json::Value, delay_secs: u64) -> Result<()>;

    /// Claim the next available job, or `None` when the queue is empty
    async fn get(&self) -> Result<Option<QueuedJob>>;

    /// Remove a claimed job permanently
    async fn delete(&self, token: &AckToken) -> Result<()>;
}

/// Read-only view of the channel's message rows
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Messages for `receiver` with `updated_at` strictly greater than
    /// `after`, in ascending `updated_at` order
    async fn updated_since(&self, receiver: &str, after: DateTime<Utc>) -> Result<Vec<Message>>;
}

/// Small key/value store for poller watermarks
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Fetch the stored value, or `None` if the key has never been written
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store or overwrite the value under `key`
    async fn put(&self, key: &str, value: &str) -> Result<()>;
}
