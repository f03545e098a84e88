//! Builds outbox messages from User events.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::SecondsFormat;
use eventwire_codec::EventCodec;
use eventwire_codec::digest;
use eventwire_core::clock::Clock;
use eventwire_core::error::CodecError;
use eventwire_core::event::{DomainEvent, Envelope};
use eventwire_core::outbox::OutboxMessage;
use uuid::Uuid;

use super::config::OutboxConfig;
use crate::domain::events::{UserEvent, UserEventKind};

/// Header names set on every User outbox message.
pub mod headers {
    /// Caller-supplied id tying together events from one request.
    pub const CORRELATION_ID: &str = "correlation_id";
    /// The event's own id.
    pub const EVENT_ID: &str = "event_id";
    /// Registered event type name, e.g. `UserCreated`.
    pub const EVENT_TYPE: &str = "event_type";
    /// Always `User` for this context.
    pub const AGGREGATE_TYPE: &str = "aggregate_type";
    /// The user id.
    pub const AGGREGATE_ID: &str = "aggregate_id";
    /// When the event occurred, RFC 3339 in UTC with milliseconds.
    pub const TIMESTAMP: &str = "timestamp";
    /// Payload schema version the message was written at.
    pub const SCHEMA_VERSION: &str = "schema_version";
    /// Hex fingerprint of the payload schema.
    pub const SCHEMA_FINGERPRINT: &str = "schema_fingerprint";
    /// Hex SHA-256 of the encoded envelope.
    pub const DEDUP_KEY: &str = "dedup_key";
}

/// Turns User events into encoded, addressed outbox messages.
#[derive(Clone)]
pub struct OutboxMessageFactory {
    codec: Arc<EventCodec<UserEventKind>>,
    config: OutboxConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for OutboxMessageFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboxMessageFactory")
            .field("codec", &self.codec)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OutboxMessageFactory {
    #[must_use]
    pub fn new(
        codec: Arc<EventCodec<UserEventKind>>,
        config: OutboxConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            codec,
            config,
            clock,
        }
    }

    #[must_use]
    pub fn codec(&self) -> &EventCodec<UserEventKind> {
        &self.codec
    }

    #[must_use]
    pub fn config(&self) -> &OutboxConfig {
        &self.config
    }

    /// Encodes `event` into an envelope and wraps it for the outbox.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encoding` if the event's metadata disagrees with
    /// its payload or cannot be encoded, and `CodecError::UnknownEventType`
    /// if its type has no schema.
    pub fn create_message(
        &self,
        event: &UserEvent,
        correlation_id: Uuid,
    ) -> Result<OutboxMessage, CodecError> {
        self.build(event, correlation_id).inspect_err(|e| {
            tracing::warn!(
                event_type = event.event_type(),
                event_id = %event.metadata.event_id,
                error = %e,
                "failed to build outbox message"
            );
        })
    }

    fn build(&self, event: &UserEvent, correlation_id: Uuid) -> Result<OutboxMessage, CodecError> {
        let meta = event.metadata();
        if meta.event_type != event.event_type() {
            return Err(CodecError::encoding(format!(
                "metadata event type {} does not match payload event type {}",
                meta.event_type,
                event.event_type()
            )));
        }
        if meta.aggregate_id != event.kind.user_id() {
            return Err(CodecError::encoding(format!(
                "aggregate id {} does not match payload user id {}",
                meta.aggregate_id,
                event.kind.user_id()
            )));
        }

        let schema = self.codec.registry().lookup(event.event_type())?;
        let payload = self.codec.encode_payload(&event.kind)?;
        let envelope = Envelope::for_event(event, &self.config.source, payload);
        let bytes = self.codec.encode_envelope(&envelope)?;

        let headers = BTreeMap::from([
            (headers::CORRELATION_ID.to_owned(), correlation_id.to_string()),
            (headers::EVENT_ID.to_owned(), envelope.event_id.clone()),
            (headers::EVENT_TYPE.to_owned(), envelope.event_type.clone()),
            (
                headers::AGGREGATE_TYPE.to_owned(),
                envelope.aggregate_type.clone(),
            ),
            (headers::AGGREGATE_ID.to_owned(), envelope.aggregate_id.clone()),
            (
                headers::TIMESTAMP.to_owned(),
                envelope
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            (
                headers::SCHEMA_VERSION.to_owned(),
                schema.version().to_string(),
            ),
            (
                headers::SCHEMA_FINGERPRINT.to_owned(),
                schema.fingerprint_hex(),
            ),
            (headers::DEDUP_KEY.to_owned(), digest::dedup_key(&bytes)),
        ]);

        tracing::debug!(
            event_type = %envelope.event_type,
            aggregate_id = %envelope.aggregate_id,
            bytes = bytes.len(),
            "outbox message built"
        );

        Ok(OutboxMessage {
            payload: bytes,
            topic: self.config.topic(),
            headers,
            aggregate_type: envelope.aggregate_type,
            aggregate_id: envelope.aggregate_id,
            event_type: envelope.event_type,
            created_at: self.clock.now_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use eventwire_codec::CodecLimits;
    use eventwire_test_support::FixedClock;

    use super::*;
    use crate::domain::events::{UserPasswordChanged, UserWithdrawn};
    use crate::domain::schemas::user_event_codec;

    fn factory() -> OutboxMessageFactory {
        OutboxMessageFactory::new(
            Arc::new(user_event_codec(CodecLimits::default()).unwrap()),
            OutboxConfig::default(),
            Arc::new(FixedClock::new_year_2024()),
        )
    }

    fn password_changed(user_id: Uuid) -> UserEvent {
        let at = Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap();
        UserEvent::new(
            Uuid::new_v4(),
            at,
            UserEventKind::PasswordChanged(UserPasswordChanged {
                user_id,
                changed_at: at,
            }),
        )
    }

    #[test]
    fn test_create_message_fills_headers_and_topic() {
        // Arrange
        let factory = factory();
        let user_id = Uuid::new_v4();
        let event = password_changed(user_id);
        let correlation_id = Uuid::new_v4();

        // Act
        let message = factory.create_message(&event, correlation_id).unwrap();

        // Assert
        assert_eq!(message.topic, "dev.user.domain-event.user.v1");
        assert_eq!(message.aggregate_type, "User");
        assert_eq!(message.aggregate_id, user_id.to_string());
        assert_eq!(message.event_type, "UserPasswordChanged");
        assert_eq!(message.created_at, FixedClock::new_year_2024().0);
        assert_eq!(
            message.header(headers::CORRELATION_ID),
            Some(correlation_id.to_string().as_str())
        );
        assert_eq!(
            message.header(headers::EVENT_ID),
            Some(event.metadata.event_id.to_string().as_str())
        );
        assert_eq!(
            message.header(headers::TIMESTAMP),
            Some("2024-02-03T04:05:06.000Z")
        );
        assert_eq!(message.header(headers::SCHEMA_VERSION), Some("1"));
        assert_eq!(
            message.header(headers::SCHEMA_FINGERPRINT).map(str::len),
            Some(16)
        );
        assert_eq!(
            message.header(headers::DEDUP_KEY),
            Some(digest::dedup_key(&message.payload).as_str())
        );
        assert_eq!(message.headers.len(), 9);
    }

    #[test]
    fn test_payload_is_a_decodable_envelope() {
        // Arrange
        let factory = factory();
        let event = password_changed(Uuid::new_v4());

        // Act
        let message = factory.create_message(&event, Uuid::new_v4()).unwrap();
        let (envelope, kind) = factory.codec().open(&message.payload).unwrap();

        // Assert
        assert_eq!(envelope.source, "user");
        assert_eq!(envelope.timestamp, event.metadata.occurred_at);
        assert_eq!(kind, event.kind);
    }

    #[test]
    fn test_mismatched_aggregate_id_is_rejected() {
        // Arrange
        let mut event = password_changed(Uuid::new_v4());
        event.metadata.aggregate_id = Uuid::new_v4();

        // Act
        let result = factory().create_message(&event, Uuid::new_v4());

        // Assert
        assert!(matches!(result, Err(CodecError::Encoding(msg)) if msg.contains("aggregate id")));
    }

    #[test]
    fn test_sub_millisecond_occurred_at_is_rejected() {
        // Arrange
        let user_id = Uuid::new_v4();
        let at = Utc.timestamp_opt(1_704_067_200, 1_500).unwrap();
        let event = UserEvent::new(
            Uuid::new_v4(),
            at,
            UserEventKind::Withdrawn(UserWithdrawn {
                user_id,
                withdrawn_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            }),
        );

        // Act
        let result = factory().create_message(&event, Uuid::new_v4());

        // Assert
        assert!(matches!(result, Err(CodecError::Encoding(msg)) if msg.contains("sub-millisecond")));
    }

    #[test]
    fn test_same_event_yields_same_dedup_key() {
        let factory = factory();
        let event = password_changed(Uuid::new_v4());

        let first = factory.create_message(&event, Uuid::new_v4()).unwrap();
        let second = factory.create_message(&event, Uuid::new_v4()).unwrap();

        assert_eq!(first.payload, second.payload);
        assert_eq!(
            first.header(headers::DEDUP_KEY),
            second.header(headers::DEDUP_KEY)
        );
        assert_ne!(
            first.header(headers::CORRELATION_ID),
            second.header(headers::CORRELATION_ID)
        );
    }
}
