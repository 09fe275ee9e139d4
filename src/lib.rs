//! # channel-notify
//!
//! Publish/subscribe notification pipeline for a shared trade-document
//! channel: jurisdictions exchange document event messages, and third
//! parties subscribe to be notified over HTTP when matching events occur.
//!
//! ## Overview
//!
//! Published events flow through two queues on their way to subscribers:
//!
//! ```text
//! publish → notification queue → dispatch → delivery outbox → callback POST
//! ```
//!
//! The [`Dispatcher`] expands one notification into one delivery job per
//! matching subscription; the [`DeliveryWorker`] performs the outbound
//! POST with bounded retry and jittered exponential backoff. The
//! [`MessageObserver`] produces new-message events by polling the message
//! store above a persisted watermark. Everything is at-least-once:
//! subscribers may see duplicates, never silent gaps (up to the retry
//! ceiling).
//!
//! ## Quick Start
//!
//! ```rust
//! use channel_notify::repo::memory::{MemoryQueue, MemorySubscriptions};
//! use channel_notify::{Dispatcher, SubscriptionService};
//! use std::sync::Arc;
//!
//! # async fn example() -> channel_notify::Result<()> {
//! let notifications = Arc::new(MemoryQueue::default());
//! let subscriptions = Arc::new(MemorySubscriptions::default());
//! let outbox = Arc::new(MemoryQueue::default());
//!
//! // Register a callback for every event about jurisdiction AU
//! let service = SubscriptionService::new(subscriptions.clone());
//! service
//!     .register("jurisdiction.AU", "https://subscriber.example/hook", None)
//!     .await?;
//!
//! // Fan out one queued notification to matching subscribers
//! let dispatcher = Dispatcher::new(notifications, subscriptions, outbox);
//! dispatcher.dispatch_next().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Repository traits** ([`repo`]) — queues, subscription store,
//!   message store, watermark store; swap backends without touching the
//!   workers. In-memory implementations ship for tests.
//! - **[`Pattern`]** — dot-separated topic prefix matching.
//! - **[`EventPublisher`]** — status-change and new-message producers.
//! - **Workers** — [`Dispatcher`], [`DeliveryWorker`], and
//!   [`MessageObserver`] all implement [`Worker`] and run under
//!   [`worker::run`].
//! - **[`CallbackTransport`]** — the outbound HTTP seam, with a
//!   recording double for tests.

pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod observer;
pub mod pattern;
pub mod publish;
pub mod repo;
pub mod subscriptions;
pub mod transport;
pub mod types;
pub mod worker;

// Re-export core types
pub use config::{ChannelConfig, RetryPolicy};
pub use delivery::DeliveryWorker;
pub use dispatch::Dispatcher;
pub use error::{ChannelError, Result};
pub use observer::MessageObserver;
pub use pattern::Pattern;
pub use publish::EventPublisher;
pub use subscriptions::SubscriptionService;
pub use transport::{CallbackTransport, HttpTransport};
pub use types::{DeliveryJob, Message, MessageStatus, NotificationJob, Subscription};
pub use worker::{Outcome, Worker};
