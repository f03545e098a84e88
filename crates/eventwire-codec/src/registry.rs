//! Schema version table.
//!
//! Maps each event type tag to its payload schema. Built once at startup
//! through [`SchemaRegistryBuilder`]; `build` refuses to produce a registry
//! that leaves any event type of the snapshot family without a schema, so a
//! missing schema is a startup failure rather than a silent no-op encoder.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::marker::PhantomData;

use eventwire_core::error::CodecError;

use crate::schema::PayloadSchema;
use crate::value::Record;

/// A family of aggregate snapshots, one variant per event type.
///
/// Implementations convert each snapshot to and from a [`Record`]; the codec
/// handles everything on the wire.
pub trait Snapshot: Sized + Send + Sync + Debug {
    /// Every event type tag this family can produce.
    const EVENT_TYPES: &'static [&'static str];

    /// The event type tag of this value.
    fn event_type(&self) -> &'static str;

    /// Field values of this snapshot, keyed by schema field id.
    fn to_record(&self) -> Record;

    /// Rebuilds a snapshot of `event_type` from decoded fields.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decoding` if a field is missing or malformed and
    /// `CodecError::UnknownEventType` if the family has no such event type.
    fn from_record(event_type: &str, record: &Record) -> Result<Self, CodecError>;
}

/// Read-only event type → schema table for the snapshot family `S`.
pub struct SchemaRegistry<S> {
    schemas: BTreeMap<&'static str, PayloadSchema>,
    _snapshot: PhantomData<fn() -> S>,
}

impl<S> Debug for SchemaRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("event_types", &self.schemas.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<S: Snapshot> SchemaRegistry<S> {
    #[must_use]
    pub fn builder() -> SchemaRegistryBuilder<S> {
        SchemaRegistryBuilder {
            schemas: BTreeMap::new(),
            _snapshot: PhantomData,
        }
    }

    /// Looks up the schema registered for `event_type`.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownEventType` if none is registered.
    pub fn lookup(&self, event_type: &str) -> Result<&PayloadSchema, CodecError> {
        self.schemas
            .get(event_type)
            .ok_or_else(|| CodecError::UnknownEventType(event_type.to_owned()))
    }

    #[must_use]
    pub fn contains(&self, event_type: &str) -> bool {
        self.schemas.contains_key(event_type)
    }

    /// Registered event types in ascending order.
    pub fn event_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schemas.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// JSON manifest of every registered schema, ordered by event type.
    #[must_use]
    pub fn describe(&self) -> serde_json::Value {
        serde_json::Value::Array(self.schemas.values().map(PayloadSchema::descriptor).collect())
    }
}

/// Collects schemas for [`SchemaRegistry`].
pub struct SchemaRegistryBuilder<S> {
    schemas: BTreeMap<&'static str, PayloadSchema>,
    _snapshot: PhantomData<fn() -> S>,
}

impl<S: Snapshot> SchemaRegistryBuilder<S> {
    /// Adds a schema.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encoding` if the event type is already registered
    /// or the snapshot family cannot produce it.
    pub fn register(mut self, schema: PayloadSchema) -> Result<Self, CodecError> {
        let event_type = schema.event_type();
        if !S::EVENT_TYPES.contains(&event_type) {
            return Err(CodecError::encoding(format!(
                "schema registered for {event_type}, which no snapshot produces"
            )));
        }
        if self.schemas.insert(event_type, schema).is_some() {
            return Err(CodecError::encoding(format!(
                "schema for {event_type} registered twice"
            )));
        }
        Ok(self)
    }

    /// Freezes the table.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownEventType` naming the first event type of
    /// the snapshot family that has no schema.
    pub fn build(self) -> Result<SchemaRegistry<S>, CodecError> {
        if let Some(missing) = S::EVENT_TYPES
            .iter()
            .find(|event_type| !self.schemas.contains_key(*event_type))
        {
            return Err(CodecError::UnknownEventType((*missing).to_owned()));
        }

        tracing::info!(
            event_types = self.schemas.len(),
            "payload schema registry built"
        );
        Ok(SchemaRegistry {
            schemas: self.schemas,
            _snapshot: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, RecordSchema};
    use crate::value::FieldKind;

    #[derive(Debug)]
    enum Probe {
        Opened,
        Closed,
    }

    impl Snapshot for Probe {
        const EVENT_TYPES: &'static [&'static str] = &["ProbeOpened", "ProbeClosed"];

        fn event_type(&self) -> &'static str {
            match self {
                Self::Opened => "ProbeOpened",
                Self::Closed => "ProbeClosed",
            }
        }

        fn to_record(&self) -> Record {
            Record::new()
        }

        fn from_record(event_type: &str, _record: &Record) -> Result<Self, CodecError> {
            match event_type {
                "ProbeOpened" => Ok(Self::Opened),
                "ProbeClosed" => Ok(Self::Closed),
                other => Err(CodecError::UnknownEventType(other.to_owned())),
            }
        }
    }

    fn schema(event_type: &'static str) -> PayloadSchema {
        PayloadSchema::new(
            event_type,
            1,
            RecordSchema::new(vec![FieldDef::optional(1, "note", FieldKind::Text)]),
        )
        .unwrap()
    }

    #[test]
    fn test_build_succeeds_when_every_event_type_is_registered() {
        let registry = SchemaRegistry::<Probe>::builder()
            .register(schema("ProbeOpened"))
            .unwrap()
            .register(schema("ProbeClosed"))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("ProbeOpened"));
        assert_eq!(
            registry.event_types().collect::<Vec<_>>(),
            vec!["ProbeClosed", "ProbeOpened"]
        );
        assert_eq!(registry.lookup("ProbeClosed").unwrap().version(), 1);
    }

    #[test]
    fn test_build_fails_when_a_schema_is_missing() {
        let result = SchemaRegistry::<Probe>::builder()
            .register(schema("ProbeOpened"))
            .unwrap()
            .build();

        assert_eq!(
            result.unwrap_err(),
            CodecError::UnknownEventType("ProbeClosed".into())
        );
    }

    #[test]
    fn test_register_rejects_duplicates_and_foreign_event_types() {
        let duplicate = SchemaRegistry::<Probe>::builder()
            .register(schema("ProbeOpened"))
            .unwrap()
            .register(schema("ProbeOpened"));
        assert!(matches!(duplicate, Err(CodecError::Encoding(_))));

        let foreign = SchemaRegistry::<Probe>::builder().register(schema("UserCreated"));
        assert!(matches!(foreign, Err(CodecError::Encoding(msg)) if msg.contains("UserCreated")));
    }

    #[test]
    fn test_lookup_unknown_event_type() {
        let registry = SchemaRegistry::<Probe>::builder()
            .register(schema("ProbeOpened"))
            .unwrap()
            .register(schema("ProbeClosed"))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            registry.lookup("ProbeLost").unwrap_err(),
            CodecError::UnknownEventType("ProbeLost".into())
        );
    }

    #[test]
    fn test_describe_lists_schemas_in_event_type_order() {
        let registry = SchemaRegistry::<Probe>::builder()
            .register(schema("ProbeOpened"))
            .unwrap()
            .register(schema("ProbeClosed"))
            .unwrap()
            .build()
            .unwrap();

        let manifest = registry.describe();

        assert_eq!(manifest[0]["event_type"], "ProbeClosed");
        assert_eq!(manifest[1]["event_type"], "ProbeOpened");
        assert_eq!(manifest.as_array().unwrap().len(), 2);
    }
}
