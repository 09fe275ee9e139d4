//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by the channel workers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    /// Public URL of this channel's subscription hub, advertised to
    /// subscribers in the `Link` header of every callback
    pub hub_url: String,

    /// Jurisdiction code this node receives messages for (e.g. "AU")
    pub receiver: String,

    /// Outbound callback request timeout in seconds
    #[serde(default = "default_callback_timeout_secs")]
    pub callback_timeout_secs: u64,

    /// How long a worker sleeps when its queue comes up empty, in
    /// milliseconds
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,

    /// Retry behavior for failed callback deliveries
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_callback_timeout_secs() -> u64 {
    5
}

fn default_idle_delay_ms() -> u64 {
    500
}

impl ChannelConfig {
    /// Create a config with defaults for everything but the identity fields
    pub fn new(hub_url: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self {
            hub_url: hub_url.into(),
            receiver: receiver.into(),
            callback_timeout_secs: default_callback_timeout_secs(),
            idle_delay_ms: default_idle_delay_ms(),
            retry: RetryPolicy::default(),
        }
    }

    /// Callback timeout as a `Duration`
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }

    /// Idle delay as a `Duration`
    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }
}

/// Exponential backoff policy for callback retries
///
/// The raw delay doubles per attempt from `base_secs` and is capped at
/// `max_delay_secs`. The posted delay keeps a guaranteed floor of half the
/// raw value with up to half the raw value of jitter on top — see
/// [`delivery`](crate::delivery) for the draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Attempts before a job is permanently dropped
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff base in seconds
    #[serde(default = "default_base_secs")]
    pub base_secs: u64,

    /// Ceiling for the raw (pre-jitter) delay in seconds
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_secs() -> u64 {
    8
}

fn default_max_delay_secs() -> u64 {
    100
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_secs: default_base_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl RetryPolicy {
    /// Raw exponential delay for a failed attempt, before jitter:
    /// `min(base * 2^attempt, max_delay)`
    pub fn raw_delay_secs(&self, attempt: u32) -> u64 {
        let doubled = self
            .base_secs
            .saturating_mul(2u64.saturating_pow(attempt));
        doubled.min(self.max_delay_secs)
    }
}
