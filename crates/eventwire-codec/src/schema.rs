//! Versioned payload schemas.
//!
//! A schema lists every field its event type has ever carried, the version
//! that introduced each field, and the ids of fields that were removed.
//! Evolution rules are enforced when the schema is built:
//!
//! - field ids are non-zero and unique within a record
//! - a retired id is never reused
//! - a field added after version 1 is optional
//! - `since` never exceeds the schema version

use std::collections::BTreeSet;

use eventwire_core::error::CodecError;
use serde::Serialize;

use crate::digest;
use crate::value::FieldKind;

/// One field of a record schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub id: u32,
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Schema version that introduced this field.
    pub since: u32,
    /// Nested layout, present exactly when `kind` is [`FieldKind::Record`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordSchema>,
}

impl FieldDef {
    #[must_use]
    pub fn required(id: u32, name: &'static str, kind: FieldKind) -> Self {
        Self {
            id,
            name,
            kind,
            required: true,
            since: 1,
            record: None,
        }
    }

    #[must_use]
    pub fn optional(id: u32, name: &'static str, kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(id, name, kind)
        }
    }

    #[must_use]
    pub fn required_record(id: u32, name: &'static str, schema: RecordSchema) -> Self {
        Self {
            record: Some(schema),
            ..Self::required(id, name, FieldKind::Record)
        }
    }

    #[must_use]
    pub fn optional_record(id: u32, name: &'static str, schema: RecordSchema) -> Self {
        Self {
            required: false,
            ..Self::required_record(id, name, schema)
        }
    }

    /// Marks the field as introduced in `version`.
    #[must_use]
    pub fn since(mut self, version: u32) -> Self {
        self.since = version;
        self
    }
}

/// Field layout of a record, sorted by field id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordSchema {
    fields: Vec<FieldDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    retired: Vec<u32>,
}

impl RecordSchema {
    #[must_use]
    pub fn new(mut fields: Vec<FieldDef>) -> Self {
        fields.sort_by_key(|field| field.id);
        Self {
            fields,
            retired: Vec::new(),
        }
    }

    /// Records ids of removed fields so they are never handed out again.
    #[must_use]
    pub fn with_retired(mut self, ids: &[u32]) -> Self {
        self.retired = ids.to_vec();
        self.retired.sort_unstable();
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    #[must_use]
    pub fn retired(&self) -> &[u32] {
        &self.retired
    }

    #[must_use]
    pub fn field(&self, id: u32) -> Option<&FieldDef> {
        self.fields
            .binary_search_by_key(&id, |field| field.id)
            .ok()
            .map(|index| &self.fields[index])
    }

    /// Whether a payload written at `version` must carry some field.
    #[must_use]
    pub fn has_required_fields_at(&self, version: u32) -> bool {
        self.fields
            .iter()
            .any(|field| field.required && field.since <= version)
    }

    fn validate(&self, path: &str, version: u32) -> Result<(), String> {
        let retired: BTreeSet<u32> = self.retired.iter().copied().collect();
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            let at = format!("{path}.{}", field.name);
            if field.id == 0 {
                return Err(format!("{at}: field id 0 is reserved"));
            }
            if !seen.insert(field.id) {
                return Err(format!("{at}: duplicate field id {}", field.id));
            }
            if retired.contains(&field.id) {
                return Err(format!("{at}: field id {} is retired", field.id));
            }
            if field.since == 0 || field.since > version {
                return Err(format!(
                    "{at}: since {} is outside 1..={version}",
                    field.since
                ));
            }
            if field.since > 1 && field.required {
                return Err(format!(
                    "{at}: fields added after version 1 must be optional"
                ));
            }
            match (field.kind, &field.record) {
                (FieldKind::Record, Some(nested)) => nested.validate(&at, version)?,
                (FieldKind::Record, None) => {
                    return Err(format!("{at}: record field without a layout"));
                }
                (_, Some(_)) => return Err(format!("{at}: layout on a non-record field")),
                (_, None) => {}
            }
        }
        Ok(())
    }
}

/// Schema of one event type's payload at its current version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadSchema {
    event_type: &'static str,
    version: u32,
    body: RecordSchema,
    #[serde(skip)]
    fingerprint: [u8; 8],
    #[serde(skip)]
    descriptor: serde_json::Value,
}

impl PayloadSchema {
    /// Builds and validates a schema.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encoding` if the schema breaks an evolution rule.
    pub fn new(
        event_type: &'static str,
        version: u32,
        body: RecordSchema,
    ) -> Result<Self, CodecError> {
        if event_type.is_empty() {
            return Err(CodecError::encoding("schema event type is empty"));
        }
        if version == 0 {
            return Err(CodecError::encoding(format!(
                "schema {event_type}: version 0 is reserved"
            )));
        }
        body.validate(event_type, version)
            .map_err(|reason| CodecError::encoding(format!("invalid schema {reason}")))?;

        let mut schema = Self {
            event_type,
            version,
            body,
            fingerprint: [0; 8],
            descriptor: serde_json::Value::Null,
        };
        let not_serializable = |e: serde_json::Error| {
            CodecError::encoding(format!("schema {event_type} is not serializable: {e}"))
        };
        let canonical = serde_json::to_string(&schema).map_err(not_serializable)?;
        schema.fingerprint = digest::schema_fingerprint(&canonical);

        let mut descriptor = serde_json::to_value(&schema).map_err(not_serializable)?;
        if let Some(object) = descriptor.as_object_mut() {
            object.insert(
                "fingerprint".to_owned(),
                serde_json::Value::String(schema.fingerprint_hex()),
            );
        }
        schema.descriptor = descriptor;
        Ok(schema)
    }

    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.event_type
    }

    /// The version new payloads are written at.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn body(&self) -> &RecordSchema {
        &self.body
    }

    /// First eight bytes of the SHA-256 of the schema's canonical JSON.
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 8] {
        self.fingerprint
    }

    #[must_use]
    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint)
    }

    /// JSON document describing the schema, built once by [`PayloadSchema::new`].
    #[must_use]
    pub fn descriptor(&self) -> serde_json::Value {
        self.descriptor.clone()
    }
}
