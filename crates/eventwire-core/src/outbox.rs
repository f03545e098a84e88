//! Outbox port.
//!
//! The outbox stores encoded envelopes until a relay hands them to the
//! broker. Storage and relay live outside this workspace; this module only
//! defines the message shape and the trait they implement.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::OutboxError;

/// A message staged for publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
    /// Encoded envelope bytes, published as-is.
    pub payload: Vec<u8>,
    /// Destination topic.
    pub topic: String,
    /// Transport headers, duplicated from the envelope for filtering without
    /// decoding.
    pub headers: BTreeMap<String, String>,
    /// Aggregate type tag.
    pub aggregate_type: String,
    /// Aggregate identity.
    pub aggregate_id: String,
    /// Event type tag.
    pub event_type: String,
    /// When the message was staged.
    pub created_at: DateTime<Utc>,
}

impl OutboxMessage {
    /// Returns the header value for `key`, if present.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

/// Repository trait for appending outbox messages.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Append `messages` atomically: either all are stored or none are.
    async fn append(&self, messages: &[OutboxMessage]) -> Result<(), OutboxError>;
}
