//! Error types for channel-notify

use thiserror::Error;

/// Errors that can occur in the notification pipeline
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Topic pattern rejected at construction
    #[error("Invalid topic pattern: {0}")]
    InvalidPattern(String),

    /// No subscription exists for the exact (pattern, callback) pair
    #[error("No subscription found for pattern '{pattern}' and callback '{callback_url}'")]
    SubscriptionNotFound {
        pattern: String,
        callback_url: String,
    },

    /// Queue backend failure (post, claim, or delete)
    #[error("Queue error: {0}")]
    Queue(String),

    /// Store backend failure (subscriptions, messages, watermarks)
    #[error("Store error: {0}")]
    Store(String),

    /// Outbound callback transport failure
    #[error("Callback delivery to '{url}' failed: {reason}")]
    Delivery {
        url: String,
        reason: String,
    },

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ChannelError>;
