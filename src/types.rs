//! Core types for the channel notification pipeline
//!
//! All serialized types use camelCase JSON field names for wire
//! compatibility with the channel API.

use crate::pattern::Pattern;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A trade-document message exchanged between two jurisdictions
///
/// The pipeline only reads messages — rows are written by the channel's
/// CRUD layer, which is outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Database-assigned message id
    pub id: i64,

    /// Sending jurisdiction code (e.g. "AU")
    pub sender: String,

    /// Receiving jurisdiction code (e.g. "CN")
    pub receiver: String,

    /// Document subject reference
    pub subject: String,

    /// Document object reference
    pub obj: String,

    /// Relation between subject and object
    pub predicate: String,

    /// Current processing status
    pub status: MessageStatus,

    /// Row creation time (UTC)
    pub created_at: DateTime<Utc>,

    /// Last status transition time (UTC); drives the change poller
    pub updated_at: DateTime<Utc>,
}

/// Processing status of a channel message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageStatus {
    /// Accepted by the channel, not yet confirmed by the receiver
    Received,
    /// Confirmed by the receiving jurisdiction
    Confirmed,
    /// Rejected by the receiving jurisdiction
    Rejected,
    /// Delivery to the receiving jurisdiction failed permanently
    Undeliverable,
}

/// A published-event job on the notification queue
///
/// Created by a publish use case, consumed by the fan-out dispatcher.
/// The queue may redeliver a job after a consumer crash, so consumers
/// must tolerate seeing the same job twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationJob {
    /// Routing topic (e.g. "jurisdiction.AU", "24")
    pub topic: String,

    /// Payload forwarded verbatim to subscribers
    pub content: serde_json::Value,
}

/// A pending-callback job on the delivery outbox
///
/// An absent `retry` field means first attempt. Retries post a fresh job
/// with `retry` incremented — the dequeued job itself is always deleted,
/// so attempt history lives only in the job body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryJob {
    /// Subscriber endpoint to POST to
    pub callback_url: String,

    /// JSON body of the callback
    pub payload: serde_json::Value,

    /// Attempt counter; `None` on the first attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
}

impl DeliveryJob {
    /// The attempt number this job represents (1-based)
    pub fn attempt(&self) -> u32 {
        self.retry.unwrap_or(1)
    }
}

/// A registered subscriber callback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Registered topic prefix
    pub pattern: Pattern,

    /// Endpoint notified when a matching event is published
    pub callback_url: String,

    /// Lease expiry; `None` means the subscription never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// False once the lease has lapsed; invalid subscriptions are
    /// skipped at dispatch time but not purged
    pub is_valid: bool,
}

impl Subscription {
    /// The store key for this subscription
    pub fn key(&self) -> String {
        self.pattern.to_key(&self.callback_url)
    }
}
