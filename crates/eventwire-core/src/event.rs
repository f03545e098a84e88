//! Domain event and envelope abstractions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Type name for payload schema routing.
    pub event_type: String,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Trait that all domain events implement.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type name (used for payload schema routing).
    fn event_type(&self) -> &'static str;

    /// Returns the aggregate type tag, e.g. `"User"`.
    fn aggregate_type(&self) -> &'static str;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;
}

/// Metadata and opaque payload wrapping one domain event on the transport.
///
/// Built once at publish time and never mutated; the encoded form is what
/// the outbox stores and the broker carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique, string-formatted event identifier.
    pub event_id: String,
    /// When the event occurred. Carried with millisecond precision.
    pub timestamp: DateTime<Utc>,
    /// Name of the producing service.
    pub source: String,
    /// Aggregate type tag.
    pub aggregate_type: String,
    /// Aggregate identity, matches the payload's identity.
    pub aggregate_id: String,
    /// Tag identifying the payload schema.
    pub event_type: String,
    /// Encoded payload bytes.
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Builds an envelope for `event` around an already encoded `payload`.
    #[must_use]
    pub fn for_event(event: &dyn DomainEvent, source: &str, payload: Vec<u8>) -> Self {
        let meta = event.metadata();
        Self {
            event_id: meta.event_id.to_string(),
            timestamp: meta.occurred_at,
            source: source.to_owned(),
            aggregate_type: event.aggregate_type().to_owned(),
            aggregate_id: meta.aggregate_id.to_string(),
            event_type: event.event_type().to_owned(),
            payload,
        }
    }
}
