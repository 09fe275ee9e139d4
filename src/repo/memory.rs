//! In-memory repository implementations for development and testing
//!
//! These adapters model the semantics the workers rely on — claim-based
//! queue visibility, upsert-keyed subscriptions, strictly-greater message
//! scans — without any external service. State is lost on drop.

use super::{AckToken, JobQueue, MessageStore, QueuedJob, SubscriptionsRepo, WatermarkStore};
use crate::error::Result;
use crate::pattern::Pattern;
use crate::types::{Message, Subscription};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// In-memory subscription store
///
/// Lease validity is derived at read time: a subscription whose
/// `expires_at` has passed is returned with `is_valid == false` but is
/// never removed implicitly.
#[derive(Default)]
pub struct MemorySubscriptions {
    records: RwLock<HashMap<String, StoredSubscription>>,
}

struct StoredSubscription {
    pattern: Pattern,
    callback_url: String,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredSubscription {
    fn to_subscription(&self, now: DateTime<Utc>) -> Subscription {
        Subscription {
            pattern: self.pattern.clone(),
            callback_url: self.callback_url.clone(),
            expires_at: self.expires_at,
            is_valid: self.expires_at.map_or(true, |e| e > now),
        }
    }
}

impl MemorySubscriptions {
    /// Number of stored subscription records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True when no subscriptions are stored
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SubscriptionsRepo for MemorySubscriptions {
    async fn subscribe(
        &self,
        pattern: &Pattern,
        callback_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(
            pattern.to_key(callback_url),
            StoredSubscription {
                pattern: pattern.clone(),
                callback_url: callback_url.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn matching(&self, topic: &str) -> Result<Vec<Subscription>> {
        let now = Utc::now();
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.pattern.matches(topic))
            .map(|r| r.to_subscription(now))
            .collect())
    }

    async fn by_pattern(&self, pattern: &Pattern) -> Result<Vec<Subscription>> {
        let now = Utc::now();
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| &r.pattern == pattern)
            .map(|r| r.to_subscription(now))
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut records = self.records.write().await;
        records.remove(key);
        Ok(())
    }
}

/// In-memory job queue with claim-based visibility
///
/// A claimed job stays in the queue but is hidden from further
/// [`get`](JobQueue::get) calls until deleted, mirroring the visibility
/// window of a managed queue. Delayed jobs become visible once their
/// delay has elapsed, or immediately after [`release_delayed`].
///
/// [`release_delayed`]: MemoryQueue::release_delayed
#[derive(Default)]
pub struct MemoryQueue {
    entries: Mutex<Vec<QueueEntry>>,
}

struct QueueEntry {
    id: String,
    body: serde_json::Value,
    delay_secs: u64,
    available_at: DateTime<Utc>,
    claimed: bool,
}

/// A queue entry as seen by test assertions
#[derive(Debug, Clone)]
pub struct PostedJob {
    /// Raw job body
    pub body: serde_json::Value,

    /// Delay the job was posted with
    pub delay_secs: u64,
}

impl MemoryQueue {
    /// Number of jobs not yet deleted, claimed ones included
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// True when every posted job has been deleted
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Bodies and delays of all undeleted jobs, in post order
    pub async fn snapshot(&self) -> Vec<PostedJob> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .map(|e| PostedJob {
                body: e.body.clone(),
                delay_secs: e.delay_secs,
            })
            .collect()
    }

    /// Make every delayed job immediately visible (test hook)
    pub async fn release_delayed(&self) {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        for entry in entries.iter_mut() {
            if entry.available_at > now {
                entry.available_at = now;
            }
        }
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn post(&self, body: serde_json::Value, delay_secs: u64) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.push(QueueEntry {
            id: Uuid::new_v4().to_string(),
            body,
            delay_secs,
            available_at: Utc::now() + Duration::seconds(delay_secs as i64),
            claimed: false,
        });
        Ok(())
    }

    async fn get(&self) -> Result<Option<QueuedJob>> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        for entry in entries.iter_mut() {
            if !entry.claimed && entry.available_at <= now {
                entry.claimed = true;
                return Ok(Some(QueuedJob {
                    token: AckToken(entry.id.clone()),
                    body: entry.body.clone(),
                }));
            }
        }
        Ok(None)
    }

    async fn delete(&self, token: &AckToken) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.retain(|e| e.id != token.0);
        Ok(())
    }
}

/// In-memory message rows for poller tests
#[derive(Default)]
pub struct MemoryMessageStore {
    messages: Mutex<Vec<Message>>,
}

impl MemoryMessageStore {
    /// Append a message row
    pub async fn push(&self, message: Message) {
        self.messages.lock().await.push(message);
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn updated_since(&self, receiver: &str, after: DateTime<Utc>) -> Result<Vec<Message>> {
        let messages = self.messages.lock().await;
        let mut rows: Vec<Message> = messages
            .iter()
            .filter(|m| m.receiver == receiver && m.updated_at > after)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.updated_at);
        Ok(rows)
    }
}

/// In-memory watermark store
#[derive(Default)]
pub struct MemoryWatermarks {
    values: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl WatermarkStore for MemoryWatermarks {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
