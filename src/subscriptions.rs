//! Subscription registration and removal
//!
//! Registration is an idempotent upsert keyed on (pattern, callback URL);
//! re-registering the same pair replaces the lease instead of duplicating
//! it. Callback reachability is not checked here — the intent
//! verification handshake happens in the subscription API, before this
//! service is invoked.

use crate::error::{ChannelError, Result};
use crate::pattern::Pattern;
use crate::repo::SubscriptionsRepo;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Registers and removes subscriber callbacks
pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionsRepo>,
}

impl SubscriptionService {
    /// Create a service over the given subscription store
    pub fn new(subscriptions: Arc<dyn SubscriptionsRepo>) -> Self {
        Self { subscriptions }
    }

    /// Register `callback_url` for events matching `topic`
    ///
    /// An existing subscription for the same (topic, url) pair is
    /// replaced, expiry included.
    pub async fn register(
        &self,
        topic: &str,
        callback_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let pattern = Pattern::new(topic)?;
        self.subscriptions
            .subscribe(&pattern, callback_url, expires_at)
            .await?;

        tracing::info!(
            pattern = %pattern,
            callback = %callback_url,
            expires_at = ?expires_at,
            "Subscription registered"
        );
        Ok(())
    }

    /// Remove the subscription for the exact (topic, url) pair
    ///
    /// Fails with [`ChannelError::SubscriptionNotFound`] when no such
    /// pair is registered.
    pub async fn deregister(&self, topic: &str, callback_url: &str) -> Result<()> {
        let pattern = Pattern::new(topic)?;
        let subscriptions = self.subscriptions.by_pattern(&pattern).await?;

        if !subscriptions.iter().any(|s| s.callback_url == callback_url) {
            return Err(ChannelError::SubscriptionNotFound {
                pattern: pattern.as_str().to_string(),
                callback_url: callback_url.to_string(),
            });
        }

        self.subscriptions
            .delete(&pattern.to_key(callback_url))
            .await?;

        tracing::info!(
            pattern = %pattern,
            callback = %callback_url,
            "Subscription removed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::memory::MemorySubscriptions;

    #[tokio::test]
    async fn test_register_deregister_round_trip() {
        let repo = Arc::new(MemorySubscriptions::default());
        let service = SubscriptionService::new(repo.clone());

        service.register("a.b", "http://x", None).await.unwrap();
        assert_eq!(repo.len().await, 1);

        service.deregister("a.b", "http://x").await.unwrap();
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_deregister_unknown_pair_fails() {
        let service = SubscriptionService::new(Arc::new(MemorySubscriptions::default()));

        let err = service.deregister("a.b", "http://x").await.unwrap_err();
        assert!(matches!(err, ChannelError::SubscriptionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_deregister_other_url_untouched() {
        let repo = Arc::new(MemorySubscriptions::default());
        let service = SubscriptionService::new(repo.clone());

        service.register("a.b", "http://x", None).await.unwrap();
        service.register("a.b", "http://y", None).await.unwrap();

        service.deregister("a.b", "http://x").await.unwrap();

        let remaining = repo
            .by_pattern(&Pattern::new("a.b").unwrap())
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].callback_url, "http://y");
    }

    #[tokio::test]
    async fn test_deregister_requires_exact_url() {
        let repo = Arc::new(MemorySubscriptions::default());
        let service = SubscriptionService::new(repo);

        service.register("a.b", "http://x", None).await.unwrap();

        let err = service.deregister("a.b", "http://x/other").await.unwrap_err();
        assert!(matches!(err, ChannelError::SubscriptionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_register_empty_topic_rejected() {
        let service = SubscriptionService::new(Arc::new(MemorySubscriptions::default()));

        let err = service.register("", "http://x", None).await.unwrap_err();
        assert!(matches!(err, ChannelError::InvalidPattern(_)));
    }
}
