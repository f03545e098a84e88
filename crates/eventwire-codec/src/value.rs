//! Schema-neutral field values.
//!
//! Snapshots convert to and from a [`Record`]; the payload codec only ever
//! sees records. Field ids are numeric and stable across schema versions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use eventwire_core::error::CodecError;
use serde::Serialize;
use uuid::Uuid;

/// Kind of a field, also its tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// One byte, `0` or `1`.
    Bool,
    /// Zigzag varint.
    Int,
    /// Length-prefixed UTF-8.
    Text,
    /// Length-prefixed opaque bytes.
    Bytes,
    /// Epoch milliseconds as an i64, big-endian.
    Timestamp,
    /// Length-prefixed nested record with its own field ids.
    Record,
}

impl FieldKind {
    /// The byte written after a field id.
    #[must_use]
    pub fn wire_tag(self) -> u8 {
        match self {
            Self::Bool => 0,
            Self::Int => 1,
            Self::Text => 2,
            Self::Bytes => 3,
            Self::Timestamp => 4,
            Self::Record => 5,
        }
    }

    /// Inverse of [`FieldKind::wire_tag`]; `None` for an unknown tag.
    #[must_use]
    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Bool),
            1 => Some(Self::Int),
            2 => Some(Self::Text),
            3 => Some(Self::Bytes),
            4 => Some(Self::Timestamp),
            5 => Some(Self::Record),
            _ => None,
        }
    }

    /// Lowercase name used in schema descriptors and error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Text => "text",
            Self::Bytes => "bytes",
            Self::Timestamp => "timestamp",
            Self::Record => "record",
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A flag.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A string; UUIDs and enum names travel as text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Carried with millisecond precision.
    Timestamp(DateTime<Utc>),
    /// A nested record, such as an address.
    Record(Record),
}

impl FieldValue {
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Bool(_) => FieldKind::Bool,
            Self::Int(_) => FieldKind::Int,
            Self::Text(_) => FieldKind::Text,
            Self::Bytes(_) => FieldKind::Bytes,
            Self::Timestamp(_) => FieldKind::Timestamp,
            Self::Record(_) => FieldKind::Record,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Record> for FieldValue {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

/// Field id → value map, iterated in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<u32, FieldValue>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, id: u32, value: impl Into<FieldValue>) -> Self {
        self.insert(id, value);
        self
    }

    /// Builder-style insert that skips `None`.
    #[must_use]
    pub fn with_optional<V: Into<FieldValue>>(mut self, id: u32, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.insert(id, value);
        }
        self
    }

    /// Inserts a value, returning the one it replaced.
    pub fn insert(&mut self, id: u32, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(id, value.into())
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&FieldValue> {
        self.fields.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &FieldValue)> {
        self.fields.iter().map(|(id, value)| (*id, value))
    }

    fn required(&self, id: u32, name: &str) -> Result<&FieldValue, CodecError> {
        self.get(id)
            .ok_or_else(|| CodecError::decoding(format!("missing required field {name}")))
    }

    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if the field is absent or not text.
    pub fn text(&self, id: u32, name: &str) -> Result<String, CodecError> {
        match self.required(id, name)? {
            FieldValue::Text(value) => Ok(value.clone()),
            other => Err(kind_mismatch(name, FieldKind::Text, other)),
        }
    }

    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if the field is present but not text.
    pub fn optional_text(&self, id: u32, name: &str) -> Result<Option<String>, CodecError> {
        match self.get(id) {
            None => Ok(None),
            Some(FieldValue::Text(value)) => Ok(Some(value.clone())),
            Some(other) => Err(kind_mismatch(name, FieldKind::Text, other)),
        }
    }

    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if the field is absent, not text, or not
    /// a UUID.
    pub fn uuid(&self, id: u32, name: &str) -> Result<Uuid, CodecError> {
        let raw = self.text(id, name)?;
        Uuid::parse_str(&raw)
            .map_err(|e| CodecError::decoding(format!("field {name} is not a UUID: {e}")))
    }

    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if the field is absent or not a bool.
    pub fn bool(&self, id: u32, name: &str) -> Result<bool, CodecError> {
        match self.required(id, name)? {
            FieldValue::Bool(value) => Ok(*value),
            other => Err(kind_mismatch(name, FieldKind::Bool, other)),
        }
    }

    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if the field is absent or not an int.
    pub fn int(&self, id: u32, name: &str) -> Result<i64, CodecError> {
        match self.required(id, name)? {
            FieldValue::Int(value) => Ok(*value),
            other => Err(kind_mismatch(name, FieldKind::Int, other)),
        }
    }

    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if the field is absent or not bytes.
    pub fn bytes(&self, id: u32, name: &str) -> Result<Vec<u8>, CodecError> {
        match self.required(id, name)? {
            FieldValue::Bytes(value) => Ok(value.clone()),
            other => Err(kind_mismatch(name, FieldKind::Bytes, other)),
        }
    }

    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if the field is absent or not a
    /// timestamp.
    pub fn timestamp(&self, id: u32, name: &str) -> Result<DateTime<Utc>, CodecError> {
        match self.required(id, name)? {
            FieldValue::Timestamp(value) => Ok(*value),
            other => Err(kind_mismatch(name, FieldKind::Timestamp, other)),
        }
    }

    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if the field is absent or not a record.
    pub fn record(&self, id: u32, name: &str) -> Result<&Record, CodecError> {
        match self.required(id, name)? {
            FieldValue::Record(value) => Ok(value),
            other => Err(kind_mismatch(name, FieldKind::Record, other)),
        }
    }
}

fn kind_mismatch(name: &str, expected: FieldKind, found: &FieldValue) -> CodecError {
    CodecError::decoding(format!(
        "field {name} expected {}, found {}",
        expected.name(),
        found.kind().name()
    ))
}
