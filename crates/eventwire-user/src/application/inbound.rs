//! Decodes envelopes received from the broker back into User events.

use eventwire_codec::{EventCodec, envelope};
use eventwire_core::error::CodecError;
use eventwire_core::event::EventMetadata;
use uuid::Uuid;

use crate::domain::events::{USER_AGGREGATE_TYPE, UserEvent, UserEventKind};

/// Decodes an envelope and its payload into a [`UserEvent`].
///
/// # Errors
///
/// Returns `CodecError::Decoding` if the bytes are malformed, the envelope is
/// not about a User, its ids are not UUIDs, or its aggregate id disagrees
/// with the payload. Returns `CodecError::UnknownEventType` if the event type
/// has no schema.
pub fn decode_user_event(
    codec: &EventCodec<UserEventKind>,
    bytes: &[u8],
) -> Result<UserEvent, CodecError> {
    let view = envelope::view(bytes, codec.limits())?;
    if view.aggregate_type != USER_AGGREGATE_TYPE {
        return Err(CodecError::decoding(format!(
            "expected aggregate type {USER_AGGREGATE_TYPE}, found {}",
            view.aggregate_type
        )));
    }

    let event_id = parse_uuid(view.event_id, "event_id")?;
    let aggregate_id = parse_uuid(view.aggregate_id, "aggregate_id")?;
    let kind = codec.decode_payload(view.event_type, view.payload)?;
    if kind.user_id() != aggregate_id {
        return Err(CodecError::decoding(format!(
            "envelope aggregate id {aggregate_id} does not match payload user id {}",
            kind.user_id()
        )));
    }

    Ok(UserEvent {
        metadata: EventMetadata {
            event_id,
            event_type: view.event_type.to_owned(),
            aggregate_id,
            occurred_at: view.timestamp,
        },
        kind,
    })
}

fn parse_uuid(raw: &str, name: &str) -> Result<Uuid, CodecError> {
    Uuid::parse_str(raw)
        .map_err(|e| CodecError::decoding(format!("envelope {name} is not a UUID: {e}")))
}
