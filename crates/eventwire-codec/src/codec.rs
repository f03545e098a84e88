//! The event codec: payload and envelope encoding behind one registry.

use eventwire_core::error::CodecError;
use eventwire_core::event::Envelope;

use crate::config::CodecLimits;
use crate::registry::{SchemaRegistry, Snapshot};
use crate::value::Record;
use crate::{envelope, payload};

/// Stateless encoder/decoder for the snapshot family `S`.
///
/// Holds only the read-only schema table and limits, so a single instance
/// can be shared behind an `Arc` by any number of threads.
#[derive(Debug)]
pub struct EventCodec<S> {
    registry: SchemaRegistry<S>,
    limits: CodecLimits,
}

impl<S: Snapshot> EventCodec<S> {
    /// Creates a codec with default limits.
    #[must_use]
    pub fn new(registry: SchemaRegistry<S>) -> Self {
        Self::with_limits(registry, CodecLimits::default())
    }

    #[must_use]
    pub fn with_limits(registry: SchemaRegistry<S>, limits: CodecLimits) -> Self {
        Self { registry, limits }
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry<S> {
        &self.registry
    }

    #[must_use]
    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    /// Encodes a snapshot at its schema's current version.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownEventType` if the snapshot's event type has
    /// no schema and `CodecError::Encoding` if the snapshot does not satisfy
    /// it.
    pub fn encode_payload(&self, snapshot: &S) -> Result<Vec<u8>, CodecError> {
        let schema = self.registry.lookup(snapshot.event_type())?;
        payload::encode(schema, &snapshot.to_record(), &self.limits)
    }

    /// Decodes a payload with the schema registered for `event_type`.
    ///
    /// An empty payload is accepted only for event types whose schema has no
    /// required fields.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownEventType` if no schema is registered and
    /// `CodecError::Decoding` if the bytes do not conform to it.
    pub fn decode_payload(&self, event_type: &str, bytes: &[u8]) -> Result<S, CodecError> {
        let schema = self.registry.lookup(event_type)?;
        let record = if bytes.is_empty() {
            if schema.body().has_required_fields_at(schema.version()) {
                return Err(CodecError::decoding(format!(
                    "{event_type} payload is empty"
                )));
            }
            Record::new()
        } else {
            payload::decode(schema, bytes, &self.limits)?.1
        };
        S::from_record(event_type, &record)
    }

    /// Encodes an envelope whose event type is registered with this codec.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownEventType` for an unregistered event type
    /// and `CodecError::Encoding` for invalid metadata or an empty payload on
    /// an event type that carries data.
    pub fn encode_envelope(&self, envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
        let schema = self.registry.lookup(&envelope.event_type)?;
        if envelope.payload.is_empty() && schema.body().has_required_fields_at(schema.version())
        {
            return Err(CodecError::encoding(format!(
                "{} envelope has an empty payload",
                envelope.event_type
            )));
        }
        envelope::encode(envelope, &self.limits)
    }

    /// Decodes an envelope. The payload is left opaque.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decoding` on malformed or truncated bytes.
    pub fn decode_envelope(&self, bytes: &[u8]) -> Result<Envelope, CodecError> {
        envelope::decode(bytes, &self.limits)
    }

    /// Encodes `snapshot` and wraps it in `envelope`, whose payload is
    /// replaced. The envelope's event type must match the snapshot's.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encoding` on an event type mismatch, plus any
    /// error of [`Self::encode_payload`] or [`Self::encode_envelope`].
    pub fn seal(&self, snapshot: &S, mut envelope: Envelope) -> Result<Vec<u8>, CodecError> {
        if envelope.event_type != snapshot.event_type() {
            return Err(CodecError::encoding(format!(
                "envelope event type {} does not match snapshot event type {}",
                envelope.event_type,
                snapshot.event_type()
            )));
        }
        envelope.payload = self.encode_payload(snapshot)?;
        self.encode_envelope(&envelope)
    }

    /// Decodes an envelope and then its payload.
    ///
    /// # Errors
    ///
    /// Any error of [`Self::decode_envelope`] or [`Self::decode_payload`].
    pub fn open(&self, bytes: &[u8]) -> Result<(Envelope, S), CodecError> {
        let view = envelope::view(bytes, &self.limits)?;
        let snapshot = self.decode_payload(view.event_type, view.payload)?;
        Ok((view.to_envelope(), snapshot))
    }

    /// Reads an envelope's event type without copying anything.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decoding` on malformed or truncated bytes.
    pub fn peek_event_type<'a>(&self, bytes: &'a [u8]) -> Result<&'a str, CodecError> {
        envelope::peek_event_type(bytes, &self.limits)
    }

    /// Reads the schema version a payload was written with.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if the version prefix is missing or 0.
    pub fn payload_schema_version(&self, payload: &[u8]) -> Result<u32, CodecError> {
        payload::schema_version(payload)
    }
}
