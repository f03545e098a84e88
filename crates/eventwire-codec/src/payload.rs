//! Payload wire format.
//!
//! ```text
//! [schema version: varint, >= 1]
//! repeated, ascending field id:
//!   [field id: varint, >= 1][wire kind: u8][value]
//!
//! bool       1 byte, 0 or 1
//! int        zigzag varint
//! text       varint length + UTF-8
//! bytes      varint length + bytes
//! timestamp  8-byte big-endian epoch millis
//! record     varint length + nested field list (no version prefix)
//! ```
//!
//! Fields are written in ascending id order and absent optional fields are
//! omitted, so a given record always encodes to the same bytes. Decoders
//! skip field ids their schema does not know, which is what lets an older
//! consumer read a payload from a newer producer.

use chrono::DateTime;
use eventwire_core::error::CodecError;

use crate::config::CodecLimits;
use crate::schema::{PayloadSchema, RecordSchema};
use crate::value::{FieldKind, FieldValue, Record};
use crate::varint;
use crate::wire::{self, ByteReader, ByteWriter};

/// Encodes `record` at the schema's current version.
///
/// # Errors
///
/// Returns `CodecError::Encoding` if a required field is missing, a field is
/// not part of the schema, a value has the wrong kind, a timestamp carries
/// sub-millisecond precision, or a limit is exceeded.
pub fn encode(
    schema: &PayloadSchema,
    record: &Record,
    limits: &CodecLimits,
) -> Result<Vec<u8>, CodecError> {
    let mut writer = ByteWriter::with_capacity(64);
    writer.put_varint(u64::from(schema.version()));
    write_fields(
        &mut writer,
        schema.body(),
        record,
        schema.event_type(),
        0,
        limits,
    )?;

    let bytes = writer.into_inner();
    if bytes.len() > limits.max_payload_bytes {
        return Err(CodecError::encoding(format!(
            "{} payload is {} bytes, limit is {}",
            schema.event_type(),
            bytes.len(),
            limits.max_payload_bytes
        )));
    }
    Ok(bytes)
}

/// Decodes a payload against `schema`, returning the version it was written
/// at and its fields.
///
/// # Errors
///
/// Returns `CodecError::Decoding` if the bytes are truncated, a wire kind is
/// unknown or disagrees with the schema, field ids are out of order, or a
/// required field for the payload's version is missing.
pub fn decode(
    schema: &PayloadSchema,
    bytes: &[u8],
    limits: &CodecLimits,
) -> Result<(u32, Record), CodecError> {
    if bytes.len() > limits.max_payload_bytes {
        return Err(CodecError::decoding(format!(
            "{} payload is {} bytes, limit is {}",
            schema.event_type(),
            bytes.len(),
            limits.max_payload_bytes
        )));
    }

    let mut reader = ByteReader::new(bytes);
    let version = read_version(&mut reader)?;
    if version > schema.version() {
        tracing::debug!(
            event_type = schema.event_type(),
            payload_version = version,
            schema_version = schema.version(),
            "decoding payload from a newer schema version"
        );
    }
    let record = read_fields(
        &mut reader,
        schema.body(),
        version,
        schema.event_type(),
        0,
        limits,
    )?;
    Ok((version, record))
}

/// Reads the schema version at the front of a payload without decoding any
/// field.
///
/// # Errors
///
/// Returns `CodecError::Decoding` if the version is missing, malformed or 0.
pub fn schema_version(bytes: &[u8]) -> Result<u32, CodecError> {
    read_version(&mut ByteReader::new(bytes))
}

fn read_version(reader: &mut ByteReader<'_>) -> Result<u32, CodecError> {
    let raw = reader.varint("schema version")?;
    match u32::try_from(raw) {
        Ok(0) => Err(CodecError::decoding("schema version 0 is reserved")),
        Ok(version) => Ok(version),
        Err(_) => Err(CodecError::decoding(format!(
            "schema version {raw} is out of range"
        ))),
    }
}

fn write_fields(
    writer: &mut ByteWriter,
    schema: &RecordSchema,
    record: &Record,
    path: &str,
    depth: usize,
    limits: &CodecLimits,
) -> Result<(), CodecError> {
    if depth > limits.max_depth {
        return Err(CodecError::encoding(format!(
            "{path}: nesting exceeds depth {}",
            limits.max_depth
        )));
    }
    if let Some((id, _)) = record.iter().find(|(id, _)| schema.field(*id).is_none()) {
        return Err(CodecError::encoding(format!(
            "{path}: field id {id} is not part of the schema"
        )));
    }

    for def in schema.fields() {
        let Some(value) = record.get(def.id) else {
            if def.required {
                return Err(CodecError::encoding(format!(
                    "{path}.{} is required",
                    def.name
                )));
            }
            continue;
        };
        if value.kind() != def.kind {
            return Err(CodecError::encoding(format!(
                "{path}.{} expected {}, found {}",
                def.name,
                def.kind.name(),
                value.kind().name()
            )));
        }

        writer.put_varint(u64::from(def.id));
        writer.put_u8(def.kind.wire_tag());
        let at = format!("{path}.{}", def.name);
        match value {
            FieldValue::Bool(flag) => writer.put_u8(u8::from(*flag)),
            FieldValue::Int(number) => writer.put_varint(varint::zigzag_encode(*number)),
            FieldValue::Text(text) => {
                check_field_len(&at, text.len(), limits)?;
                writer.put_len_prefixed(text.as_bytes());
            }
            FieldValue::Bytes(bytes) => {
                check_field_len(&at, bytes.len(), limits)?;
                writer.put_len_prefixed(bytes);
            }
            FieldValue::Timestamp(at_time) => {
                let millis = wire::exact_millis(*at_time)
                    .map_err(|reason| CodecError::encoding(format!("{at} {reason}")))?;
                writer.put_i64_be(millis);
            }
            FieldValue::Record(nested) => {
                let Some(nested_schema) = def.record.as_ref() else {
                    return Err(CodecError::encoding(format!("{at} has no record layout")));
                };
                let mut inner = ByteWriter::new();
                write_fields(&mut inner, nested_schema, nested, &at, depth + 1, limits)?;
                writer.put_len_prefixed(&inner.into_inner());
            }
        }
    }
    Ok(())
}

fn check_field_len(at: &str, len: usize, limits: &CodecLimits) -> Result<(), CodecError> {
    if len > limits.max_field_bytes {
        return Err(CodecError::encoding(format!(
            "{at} is {len} bytes, limit is {}",
            limits.max_field_bytes
        )));
    }
    Ok(())
}

fn read_fields(
    reader: &mut ByteReader<'_>,
    schema: &RecordSchema,
    version: u32,
    path: &str,
    depth: usize,
    limits: &CodecLimits,
) -> Result<Record, CodecError> {
    if depth > limits.max_depth {
        return Err(CodecError::decoding(format!(
            "{path}: nesting exceeds depth {}",
            limits.max_depth
        )));
    }

    let mut record = Record::new();
    let mut last_id = 0u32;
    while !reader.is_empty() {
        let raw_id = reader.varint("field id")?;
        let id = u32::try_from(raw_id)
            .ok()
            .filter(|id| *id > last_id)
            .ok_or_else(|| {
                CodecError::decoding(format!(
                    "{path}: field id {raw_id} after {last_id} is zero, duplicate or out of order"
                ))
            })?;
        last_id = id;

        let tag = reader.u8("wire kind")?;
        let kind = FieldKind::from_wire_tag(tag).ok_or_else(|| {
            CodecError::decoding(format!("{path}: field {id} has unknown wire kind {tag}"))
        })?;

        let Some(def) = schema.field(id) else {
            skip_value(reader, kind, limits)?;
            tracing::debug!(path, field_id = id, kind = kind.name(), "skipped unknown field");
            continue;
        };
        let at = format!("{path}.{}", def.name);
        if kind != def.kind {
            return Err(CodecError::decoding(format!(
                "{at} expected {}, found {}",
                def.kind.name(),
                kind.name()
            )));
        }

        let value = match kind {
            FieldKind::Bool => match reader.u8(&at)? {
                0 => FieldValue::Bool(false),
                1 => FieldValue::Bool(true),
                other => {
                    return Err(CodecError::decoding(format!(
                        "{at} has invalid bool byte {other}"
                    )));
                }
            },
            FieldKind::Int => FieldValue::Int(varint::zigzag_decode(reader.varint(&at)?)),
            FieldKind::Text => FieldValue::Text(reader.utf8(&at, limits.max_field_bytes)?.to_owned()),
            FieldKind::Bytes => {
                FieldValue::Bytes(reader.len_prefixed(&at, limits.max_field_bytes)?.to_vec())
            }
            FieldKind::Timestamp => {
                let millis = reader.i64_be(&at)?;
                let at_time = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                    CodecError::decoding(format!("{at} holds out-of-range millis {millis}"))
                })?;
                FieldValue::Timestamp(at_time)
            }
            FieldKind::Record => {
                let Some(nested_schema) = def.record.as_ref() else {
                    return Err(CodecError::decoding(format!("{at} has no record layout")));
                };
                let bytes = reader.len_prefixed(&at, limits.max_payload_bytes)?;
                let mut nested = ByteReader::new(bytes);
                FieldValue::Record(read_fields(
                    &mut nested,
                    nested_schema,
                    version,
                    &at,
                    depth + 1,
                    limits,
                )?)
            }
        };
        record.insert(id, value);
    }

    if let Some(missing) = schema
        .fields()
        .iter()
        .find(|def| def.required && def.since <= version && record.get(def.id).is_none())
    {
        return Err(CodecError::decoding(format!(
            "{path}.{} is required at version {version}",
            missing.name
        )));
    }
    Ok(record)
}

fn skip_value(
    reader: &mut ByteReader<'_>,
    kind: FieldKind,
    limits: &CodecLimits,
) -> Result<(), CodecError> {
    match kind {
        FieldKind::Bool => {
            reader.u8("unknown bool field")?;
        }
        FieldKind::Int => {
            reader.varint("unknown int field")?;
        }
        FieldKind::Timestamp => {
            reader.take(8, "unknown timestamp field")?;
        }
        FieldKind::Text | FieldKind::Bytes | FieldKind::Record => {
            reader.len_prefixed("unknown field", limits.max_payload_bytes)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::schema::FieldDef;

    fn address_layout() -> RecordSchema {
        RecordSchema::new(vec![
            FieldDef::required(1, "address_id", FieldKind::Text),
            FieldDef::required(5, "is_default", FieldKind::Bool),
        ])
    }

    fn schema() -> PayloadSchema {
        PayloadSchema::new(
            "UserAddressAdded",
            1,
            RecordSchema::new(vec![
                FieldDef::required(1, "user_id", FieldKind::Text),
                FieldDef::required_record(2, "address", address_layout()),
                FieldDef::required(3, "added_at", FieldKind::Timestamp),
                FieldDef::optional(4, "note", FieldKind::Text),
                FieldDef::optional(5, "attempt", FieldKind::Int),
                FieldDef::optional(6, "blob", FieldKind::Bytes),
            ]),
        )
        .unwrap()
    }

    fn record() -> Record {
        Record::new()
            .with(1, "u-42")
            .with(2, Record::new().with(1, "a-1").with(5, true))
            .with(3, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .with(5, -3_i64)
            .with(6, vec![0xde, 0xad])
    }

    #[test]
    fn test_encode_layout_is_version_then_tagged_fields() {
        let schema = PayloadSchema::new(
            "Ping",
            1,
            RecordSchema::new(vec![
                FieldDef::required(1, "flag", FieldKind::Bool),
                FieldDef::required(2, "name", FieldKind::Text),
            ]),
        )
        .unwrap();
        let record = Record::new().with(2, "ab").with(1, true);

        let bytes = encode(&schema, &record, &CodecLimits::default()).unwrap();

        assert_eq!(bytes, vec![0x01, 0x01, 0x00, 0x01, 0x02, 0x02, 0x02, b'a', b'b']);
    }

    #[test]
    fn test_decode_reproduces_encoded_record() {
        let limits = CodecLimits::default();
        let bytes = encode(&schema(), &record(), &limits).unwrap();

        let (version, decoded) = decode(&schema(), &bytes, &limits).unwrap();

        assert_eq!(version, 1);
        assert_eq!(decoded, record());
    }

    #[test]
    fn test_encode_is_deterministic() {
        let limits = CodecLimits::default();
        let first = encode(&schema(), &record(), &limits).unwrap();
        let second = encode(&schema(), &record().clone(), &limits).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_encode_rejects_missing_required_field() {
        let mut incomplete = Record::new().with(1, "u-42");
        incomplete.insert(3, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let err = encode(&schema(), &incomplete, &CodecLimits::default()).unwrap_err();

        assert_eq!(
            err,
            CodecError::encoding("UserAddressAdded.address is required")
        );
    }

    #[test]
    fn test_encode_rejects_unknown_field_and_wrong_kind() {
        let limits = CodecLimits::default();
        let unknown = record().with(9, "extra");
        assert!(matches!(
            encode(&schema(), &unknown, &limits),
            Err(CodecError::Encoding(_))
        ));

        let wrong_kind = record().with(1, 42_i64);
        assert_eq!(
            encode(&schema(), &wrong_kind, &limits).unwrap_err(),
            CodecError::encoding("UserAddressAdded.user_id expected text, found int")
        );
    }

    #[test]
    fn test_encode_rejects_sub_millisecond_timestamps() {
        let precise = Utc.timestamp_opt(1_704_067_200, 1_500).unwrap();
        let err = encode(&schema(), &record().with(3, precise), &CodecLimits::default())
            .unwrap_err();
        assert!(matches!(err, CodecError::Encoding(msg) if msg.contains("sub-millisecond")));
    }

    #[test]
    fn test_encode_rejects_leap_second_timestamps() {
        // Arrange
        let leap = Utc.timestamp_opt(1_483_228_799, 1_500_000_000).unwrap();

        // Act
        let err = encode(&schema(), &record().with(3, leap), &CodecLimits::default())
            .unwrap_err();

        // Assert
        assert!(matches!(err, CodecError::Encoding(msg) if msg.contains("leap second")));
    }

    #[test]
    fn test_encode_enforces_field_limit() {
        let limits = CodecLimits {
            max_field_bytes: 4,
            ..CodecLimits::default()
        };
        let err = encode(&schema(), &record().with(4, "note!"), &limits).unwrap_err();
        assert_eq!(
            err,
            CodecError::encoding("UserAddressAdded.note is 5 bytes, limit is 4")
        );
    }

    #[test]
    fn test_decode_skips_unknown_fields_of_every_kind() {
        // Arrange: a writer that knows more fields than the reader.
        let wide = PayloadSchema::new(
            "Ping",
            2,
            RecordSchema::new(vec![
                FieldDef::required(1, "name", FieldKind::Text),
                FieldDef::optional(2, "flag", FieldKind::Bool).since(2),
                FieldDef::optional(3, "count", FieldKind::Int).since(2),
                FieldDef::optional(4, "at", FieldKind::Timestamp).since(2),
                FieldDef::optional(5, "raw", FieldKind::Bytes).since(2),
                FieldDef::optional_record(
                    6,
                    "inner",
                    RecordSchema::new(vec![FieldDef::optional(1, "x", FieldKind::Int).since(2)]),
                )
                .since(2),
            ]),
        )
        .unwrap();
        let narrow = PayloadSchema::new(
            "Ping",
            1,
            RecordSchema::new(vec![FieldDef::required(1, "name", FieldKind::Text)]),
        )
        .unwrap();
        let limits = CodecLimits::default();
        let bytes = encode(
            &wide,
            &Record::new()
                .with(1, "ping")
                .with(2, true)
                .with(3, 1_000_i64)
                .with(4, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
                .with(5, vec![1, 2, 3])
                .with(6, Record::new().with(1, 7_i64)),
            &limits,
        )
        .unwrap();

        // Act
        let (version, decoded) = decode(&narrow, &bytes, &limits).unwrap();

        // Assert
        assert_eq!(version, 2);
        assert_eq!(decoded, Record::new().with(1, "ping"));
    }

    #[test]
    fn test_decode_every_strict_prefix_fails() {
        // Only required fields, so no prefix is itself a complete payload.
        let limits = CodecLimits::default();
        let required_only = Record::new()
            .with(1, "u-42")
            .with(2, Record::new().with(1, "a-1").with(5, false))
            .with(3, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let bytes = encode(&schema(), &required_only, &limits).unwrap();
        for cut in 0..bytes.len() {
            let result = decode(&schema(), &bytes[..cut], &limits);
            assert!(
                matches!(result, Err(CodecError::Decoding(_))),
                "prefix of {cut} bytes decoded to {result:?}"
            );
        }
    }

    #[test]
    fn test_decode_rejects_version_zero_and_bad_tags() {
        let limits = CodecLimits::default();
        assert_eq!(
            decode(&schema(), &[0x00], &limits).unwrap_err(),
            CodecError::decoding("schema version 0 is reserved")
        );

        let bad_kind = [0x01, 0x01, 0x09];
        assert!(matches!(
            decode(&schema(), &bad_kind, &limits),
            Err(CodecError::Decoding(msg)) if msg.contains("unknown wire kind 9")
        ));
    }

    #[test]
    fn test_decode_rejects_kind_disagreeing_with_schema() {
        // user_id (field 1) written as an int.
        let bytes = [0x01, 0x01, 0x01, 0x02];
        let err = decode(&schema(), &bytes, &CodecLimits::default()).unwrap_err();
        assert_eq!(
            err,
            CodecError::decoding("UserAddressAdded.user_id expected text, found int")
        );
    }

    #[test]
    fn test_decode_rejects_duplicate_and_out_of_order_ids() {
        let limits = CodecLimits::default();
        let duplicate = [0x01, 0x04, 0x02, 0x01, b'a', 0x04, 0x02, 0x01, b'b'];
        assert!(decode(&schema(), &duplicate, &limits).is_err());

        let descending = [0x01, 0x04, 0x02, 0x01, b'a', 0x01, 0x02, 0x01, b'u'];
        assert!(decode(&schema(), &descending, &limits).is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_bool_byte() {
        let schema = PayloadSchema::new(
            "Ping",
            1,
            RecordSchema::new(vec![FieldDef::required(1, "flag", FieldKind::Bool)]),
        )
        .unwrap();
        let err = decode(&schema, &[0x01, 0x01, 0x00, 0x02], &CodecLimits::default()).unwrap_err();
        assert_eq!(err, CodecError::decoding("Ping.flag has invalid bool byte 2"));
    }

    #[test]
    fn test_required_fields_are_checked_against_payload_version() {
        // v2 added optional `nickname`; an old v1 payload without it decodes.
        let v2 = PayloadSchema::new(
            "UserCreated",
            2,
            RecordSchema::new(vec![
                FieldDef::required(1, "user_id", FieldKind::Text),
                FieldDef::optional(2, "nickname", FieldKind::Text).since(2),
            ]),
        )
        .unwrap();
        let v1_payload = [0x01, 0x01, 0x02, 0x01, b'u'];

        let (version, record) = decode(&v2, &v1_payload, &CodecLimits::default()).unwrap();

        assert_eq!(version, 1);
        assert_eq!(record, Record::new().with(1, "u"));
    }

    #[test]
    fn test_schema_version_peeks_without_decoding_fields() {
        assert_eq!(schema_version(&[0x02, 0xff, 0xff]).unwrap(), 2);
        assert!(schema_version(&[]).is_err());
    }

    #[test]
    fn test_depth_limit_applies_to_nested_records() {
        let limits = CodecLimits {
            max_depth: 0,
            ..CodecLimits::default()
        };
        let err = encode(&schema(), &record(), &limits).unwrap_err();
        assert!(matches!(err, CodecError::Encoding(msg) if msg.contains("depth 0")));
    }
}
