//! Topic patterns — dot-separated prefix matching for subscriptions
//!
//! A subscriber registers a `Pattern`; a published topic is routed to the
//! subscriber when the topic's segment sequence starts with the pattern's
//! full segment sequence. Matching is segment-wise, not substring-wise:
//! `jurisdiction.AU` matches `jurisdiction.AU.sydney` but not
//! `jurisdiction.AUT`.

use crate::error::{ChannelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A subscriber-registered topic prefix
///
/// Immutable value type. Segments are exact strings — matching is
/// case-sensitive and there is no wildcard syntax; characters like `*`
/// or `>` are ordinary literal segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern(String);

impl Pattern {
    /// Construct a pattern from a raw dot-delimited topic string
    ///
    /// The empty string is rejected; no other normalization is applied.
    pub fn new(topic: impl Into<String>) -> Result<Self> {
        let topic = topic.into();
        if topic.is_empty() {
            return Err(ChannelError::InvalidPattern(
                "pattern must not be empty".to_string(),
            ));
        }
        Ok(Self(topic))
    }

    /// The raw pattern string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True iff the topic's segments start with this pattern's segments
    ///
    /// A pattern with no extra segments matches only the identical topic.
    pub fn matches(&self, topic: &str) -> bool {
        let mut own = self.0.split('.');
        let mut candidate = topic.split('.');
        loop {
            match (own.next(), candidate.next()) {
                (None, _) => return true,
                (Some(p), Some(t)) if p == t => continue,
                _ => return false,
            }
        }
    }

    /// Composite subscription key for this pattern and a callback URL
    ///
    /// Used as the subscription store's primary key, so re-registering the
    /// same (pattern, url) pair replaces the existing record.
    pub fn to_key(&self, callback_url: &str) -> String {
        format!("{}|{}", self.0, callback_url)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
