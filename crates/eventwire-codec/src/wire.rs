//! Byte cursors shared by the payload and envelope codecs.
//!
//! Every read is bounds-checked and names the field being read, so a short
//! buffer turns into a `CodecError::Decoding` that says what was missing.

use chrono::{DateTime, Utc};
use eventwire_core::error::CodecError;

use crate::varint;

/// Milliseconds since the epoch, if `at` is exactly representable as such.
///
/// A leap-second instant would fold into the following second, so it is
/// refused along with anything finer than a millisecond.
///
/// # Errors
///
/// Returns the reason `at` cannot be written without changing it.
pub fn exact_millis(at: DateTime<Utc>) -> Result<i64, &'static str> {
    let nanos = at.timestamp_subsec_nanos();
    if nanos >= 1_000_000_000 {
        return Err("falls on a leap second");
    }
    if nanos % 1_000_000 != 0 {
        return Err("has sub-millisecond precision");
    }
    Ok(at.timestamp_millis())
}

/// Append-only output buffer.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes a single byte.
    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Writes `bytes` as-is, with no length prefix.
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes `value` as an unsigned LEB128 varint.
    pub fn put_varint(&mut self, value: u64) {
        varint::encode_u64(value, &mut self.buf);
    }

    /// Writes `value` as eight big-endian bytes.
    pub fn put_i64_be(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes `bytes` preceded by their length as a varint.
    pub fn put_len_prefixed(&mut self, bytes: &[u8]) {
        self.put_varint(bytes.len() as u64);
        self.put_raw(bytes);
    }

    /// Consumes the writer and returns the bytes written.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked reader over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Starts reading at the first byte of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether every byte has been read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Offset of the next unread byte.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the unread tail without consuming it.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Consumes exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if fewer than `len` bytes remain.
    pub fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], CodecError> {
        if len > self.remaining() {
            return Err(CodecError::decoding(format!(
                "truncated {what}: need {len} bytes at offset {}, {} remain",
                self.pos,
                self.remaining()
            )));
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.buf[start..self.pos])
    }

    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if the buffer is exhausted.
    pub fn u8(&mut self, what: &str) -> Result<u8, CodecError> {
        Ok(self.take(1, what)?[0])
    }

    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if the varint is truncated or overflows.
    pub fn varint(&mut self, what: &str) -> Result<u64, CodecError> {
        let (value, used) = varint::decode_u64(self.rest())
            .map_err(|e| CodecError::decoding(format!("{what} at offset {}: {e}", self.pos)))?;
        self.pos += used;
        Ok(value)
    }

    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if fewer than eight bytes remain.
    pub fn i64_be(&mut self, what: &str) -> Result<i64, CodecError> {
        let bytes = self.take(8, what)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(raw))
    }

    /// Reads a varint length, then that many bytes.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if the declared length exceeds `max` or
    /// the bytes remaining in the buffer.
    pub fn len_prefixed(&mut self, what: &str, max: usize) -> Result<&'a [u8], CodecError> {
        let declared = self.varint(what)?;
        let len = usize::try_from(declared)
            .ok()
            .filter(|len| *len <= max)
            .ok_or_else(|| {
                CodecError::decoding(format!(
                    "{what} declares {declared} bytes, limit is {max}"
                ))
            })?;
        self.take(len, what)
    }

    /// Reads a length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decoding` on a bad length or invalid UTF-8.
    pub fn utf8(&mut self, what: &str, max: usize) -> Result<&'a str, CodecError> {
        let bytes = self.len_prefixed(what, max)?;
        std::str::from_utf8(bytes)
            .map_err(|e| CodecError::decoding(format!("{what} is not valid UTF-8: {e}")))
    }
}
