//! Outbound callback transport
//!
//! The delivery worker talks to subscribers through `CallbackTransport`,
//! so the flaky network call is swappable: `HttpTransport` for real
//! deliveries, `RecordingTransport` for tests.

use crate::error::{ChannelError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;

/// Outcome of a callback attempt that produced an HTTP response
///
/// Transport-level failures (connect refused, timeout) surface as `Err`
/// from [`CallbackTransport::deliver`] instead — the delivery worker
/// treats both failure shapes identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackResponse {
    /// HTTP status code returned by the subscriber
    pub status: u16,
}

impl CallbackResponse {
    /// True for any 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport for delivering callback payloads to subscriber endpoints
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    /// POST `payload` as JSON to `url`
    async fn deliver(&self, url: &str, payload: &serde_json::Value) -> Result<CallbackResponse>;
}

/// Format the `Link` header value advertising the subscription hub
pub(crate) fn hub_link(hub_url: &str) -> String {
    format!("<{}>; rel=\"hub\"", hub_url)
}

/// HTTP callback transport backed by a shared `reqwest` client
///
/// Every request carries a `Link: <hub_url>; rel="hub"` header so
/// subscribers can discover the hub, and the configured timeout so a
/// slow subscriber cannot stall the delivery worker.
pub struct HttpTransport {
    client: reqwest::Client,
    hub_url: String,
}

impl HttpTransport {
    /// Build a transport with the given hub URL and request timeout
    pub fn new(hub_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            hub_url: hub_url.into(),
        })
    }
}

#[async_trait]
impl CallbackTransport for HttpTransport {
    async fn deliver(&self, url: &str, payload: &serde_json::Value) -> Result<CallbackResponse> {
        let response = self
            .client
            .post(url)
            .header("Link", hub_link(&self.hub_url))
            .json(payload)
            .send()
            .await
            .map_err(|e| ChannelError::Delivery {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CallbackResponse {
            status: response.status().as_u16(),
        })
    }
}

/// A delivery attempt captured by [`RecordingTransport`]
#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    /// Target URL of the attempt
    pub url: String,

    /// Payload that was posted
    pub payload: serde_json::Value,
}

/// Scripted transport for tests
///
/// Responses are consumed in order; once the script is exhausted every
/// attempt succeeds with 200. All attempts are recorded for assertions.
#[derive(Default)]
pub struct RecordingTransport {
    script: Mutex<VecDeque<std::result::Result<u16, String>>>,
    deliveries: Mutex<Vec<RecordedDelivery>>,
}

impl RecordingTransport {
    /// Queue an HTTP response status for the next attempt
    pub async fn respond_with(&self, status: u16) {
        self.script.lock().await.push_back(Ok(status));
    }

    /// Queue a transport-level failure for the next attempt
    pub async fn fail_with(&self, reason: impl Into<String>) {
        self.script.lock().await.push_back(Err(reason.into()));
    }

    /// All attempts made so far, in order
    pub async fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.lock().await.clone()
    }
}

#[async_trait]
impl CallbackTransport for RecordingTransport {
    async fn deliver(&self, url: &str, payload: &serde_json::Value) -> Result<CallbackResponse> {
        self.deliveries.lock().await.push(RecordedDelivery {
            url: url.to_string(),
            payload: payload.clone(),
        });

        match self.script.lock().await.pop_front() {
            Some(Ok(status)) => Ok(CallbackResponse { status }),
            Some(Err(reason)) => Err(ChannelError::Delivery {
                url: url.to_string(),
                reason,
            }),
            None => Ok(CallbackResponse { status: 200 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success_bounds() {
        assert!(CallbackResponse { status: 200 }.is_success());
        assert!(CallbackResponse { status: 202 }.is_success());
        assert!(CallbackResponse { status: 299 }.is_success());
        assert!(!CallbackResponse { status: 199 }.is_success());
        assert!(!CallbackResponse { status: 300 }.is_success());
        assert!(!CallbackResponse { status: 400 }.is_success());
        assert!(!CallbackResponse { status: 500 }.is_success());
    }

    #[test]
    fn test_hub_link_format() {
        assert_eq!(
            hub_link("https://channel.example/subscriptions"),
            "<https://channel.example/subscriptions>; rel=\"hub\""
        );
    }

    #[tokio::test]
    async fn test_recording_transport_script_order() {
        let transport = RecordingTransport::default();
        transport.respond_with(400).await;
        transport.fail_with("connection refused").await;

        let payload = serde_json::json!({"id": 1});

        let first = transport.deliver("http://x", &payload).await.unwrap();
        assert_eq!(first.status, 400);

        let second = transport.deliver("http://x", &payload).await;
        assert!(matches!(second, Err(ChannelError::Delivery { .. })));

        // Script exhausted — default success
        let third = transport.deliver("http://x", &payload).await.unwrap();
        assert!(third.is_success());

        assert_eq!(transport.deliveries().await.len(), 3);
    }
}
