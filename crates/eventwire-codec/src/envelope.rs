//! Envelope wire format.
//!
//! ```text
//! [magic: 4 bytes "EVT1"]
//! [eventId length: varint][eventId bytes]
//! [timestamp: 8-byte big-endian epoch millis, signed]
//! [source length: varint][source bytes]
//! [aggregateType length: varint][aggregateType bytes]
//! [aggregateId length: varint][aggregateId bytes]
//! [eventType length: varint][eventType bytes]
//! [payload length: varint][payload bytes]
//! ```
//!
//! Consumers depend on this layout. New fields are appended after the
//! payload, so decoders ignore any trailing bytes.

use chrono::{DateTime, Utc};
use eventwire_core::error::CodecError;
use eventwire_core::event::Envelope;

use crate::config::CodecLimits;
use crate::varint;
use crate::wire::{self, ByteReader, ByteWriter};

/// Marker identifying layout version 1.
pub const MAGIC: [u8; 4] = *b"EVT1";

/// Borrowed view of an encoded envelope.
///
/// Parsing validates the whole layout but copies nothing, which is how a
/// consumer reads `event_type` before deciding whether to touch the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeView<'a> {
    pub event_id: &'a str,
    pub timestamp: DateTime<Utc>,
    pub source: &'a str,
    pub aggregate_type: &'a str,
    pub aggregate_id: &'a str,
    pub event_type: &'a str,
    pub payload: &'a [u8],
}

impl EnvelopeView<'_> {
    /// Copies the view into an owned [`Envelope`].
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        Envelope {
            event_id: self.event_id.to_owned(),
            timestamp: self.timestamp,
            source: self.source.to_owned(),
            aggregate_type: self.aggregate_type.to_owned(),
            aggregate_id: self.aggregate_id.to_owned(),
            event_type: self.event_type.to_owned(),
            payload: self.payload.to_vec(),
        }
    }
}

/// Encodes `envelope`.
///
/// # Errors
///
/// Returns `CodecError::Encoding` if a string field is empty or over
/// `limits.max_field_bytes`, the payload exceeds `limits.max_payload_bytes`,
/// or the timestamp carries sub-millisecond precision or falls on a leap
/// second.
pub fn encode(envelope: &Envelope, limits: &CodecLimits) -> Result<Vec<u8>, CodecError> {
    let strings = [
        ("event_id", envelope.event_id.as_str()),
        ("source", envelope.source.as_str()),
        ("aggregate_type", envelope.aggregate_type.as_str()),
        ("aggregate_id", envelope.aggregate_id.as_str()),
        ("event_type", envelope.event_type.as_str()),
    ];
    for (name, value) in strings {
        if value.is_empty() {
            return Err(CodecError::encoding(format!("envelope {name} is empty")));
        }
        if value.len() > limits.max_field_bytes {
            return Err(CodecError::encoding(format!(
                "envelope {name} is {} bytes, limit is {}",
                value.len(),
                limits.max_field_bytes
            )));
        }
    }
    if envelope.payload.len() > limits.max_payload_bytes {
        return Err(CodecError::encoding(format!(
            "envelope payload is {} bytes, limit is {}",
            envelope.payload.len(),
            limits.max_payload_bytes
        )));
    }
    let millis = wire::exact_millis(envelope.timestamp)
        .map_err(|reason| CodecError::encoding(format!("envelope timestamp {reason}")))?;

    let mut writer = ByteWriter::with_capacity(encoded_len(envelope));
    writer.put_raw(&MAGIC);
    writer.put_len_prefixed(envelope.event_id.as_bytes());
    writer.put_i64_be(millis);
    writer.put_len_prefixed(envelope.source.as_bytes());
    writer.put_len_prefixed(envelope.aggregate_type.as_bytes());
    writer.put_len_prefixed(envelope.aggregate_id.as_bytes());
    writer.put_len_prefixed(envelope.event_type.as_bytes());
    writer.put_len_prefixed(&envelope.payload);
    Ok(writer.into_inner())
}

/// Decodes an envelope into an owned value.
///
/// # Errors
///
/// See [`view`].
pub fn decode(bytes: &[u8], limits: &CodecLimits) -> Result<Envelope, CodecError> {
    view(bytes, limits).map(|view| view.to_envelope())
}

/// Parses an envelope without copying.
///
/// # Errors
///
/// Returns `CodecError::Decoding` if the marker is missing or unknown, a
/// declared length runs past the buffer or a limit, a string is empty or not
/// UTF-8, or the timestamp is out of range.
pub fn view<'a>(bytes: &'a [u8], limits: &CodecLimits) -> Result<EnvelopeView<'a>, CodecError> {
    let mut reader = ByteReader::new(bytes);
    let magic = reader.take(MAGIC.len(), "envelope marker")?;
    if magic != MAGIC {
        return Err(CodecError::decoding(format!(
            "unrecognized envelope marker {magic:02x?}"
        )));
    }

    let event_id = required_str(&mut reader, "event_id", limits)?;
    let millis = reader.i64_be("timestamp")?;
    let timestamp = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        CodecError::decoding(format!("timestamp {millis} is out of range"))
    })?;
    let source = required_str(&mut reader, "source", limits)?;
    let aggregate_type = required_str(&mut reader, "aggregate_type", limits)?;
    let aggregate_id = required_str(&mut reader, "aggregate_id", limits)?;
    let event_type = required_str(&mut reader, "event_type", limits)?;
    let payload = reader.len_prefixed("payload", limits.max_payload_bytes)?;

    if !reader.is_empty() {
        tracing::debug!(
            event_type,
            trailing = reader.remaining(),
            "ignoring trailing envelope bytes"
        );
    }

    Ok(EnvelopeView {
        event_id,
        timestamp,
        source,
        aggregate_type,
        aggregate_id,
        event_type,
        payload,
    })
}

/// Reads only the event type of an encoded envelope.
///
/// # Errors
///
/// See [`view`].
pub fn peek_event_type<'a>(bytes: &'a [u8], limits: &CodecLimits) -> Result<&'a str, CodecError> {
    view(bytes, limits).map(|view| view.event_type)
}

fn required_str<'a>(
    reader: &mut ByteReader<'a>,
    name: &str,
    limits: &CodecLimits,
) -> Result<&'a str, CodecError> {
    let value = reader.utf8(name, limits.max_field_bytes)?;
    if value.is_empty() {
        return Err(CodecError::decoding(format!("envelope {name} is empty")));
    }
    Ok(value)
}

fn encoded_len(envelope: &Envelope) -> usize {
    let prefixed = |len: usize| varint::encoded_len(len as u64) + len;
    MAGIC.len()
        + 8
        + prefixed(envelope.event_id.len())
        + prefixed(envelope.source.len())
        + prefixed(envelope.aggregate_type.len())
        + prefixed(envelope.aggregate_id.len())
        + prefixed(envelope.event_type.len())
        + prefixed(envelope.payload.len())
}
