//! Codec and outbox error types.

use thiserror::Error;

/// Errors raised while encoding or decoding events.
///
/// A codec that cannot faithfully encode or decode must return one of these;
/// it never substitutes empty or default output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// An input value is invalid or a required field is missing.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Bytes are malformed, truncated, or do not match the expected schema.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// No payload schema is registered for the event type tag.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

impl CodecError {
    /// Shorthand for [`CodecError::Encoding`].
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding(message.into())
    }

    /// Shorthand for [`CodecError::Decoding`].
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding(message.into())
    }
}

/// Errors raised while staging events into the outbox.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// The event could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The outbox store rejected or failed the write.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("configuration error: {key}: {reason}")]
pub struct ConfigError {
    /// The offending configuration key.
    pub key: &'static str,
    /// Why the value was rejected.
    pub reason: String,
}
