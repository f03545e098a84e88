//! eventwire Codec — binary payload and envelope encoding.
//!
//! Payloads are field-tagged records prefixed with their schema version, so
//! decoders can skip fields they do not know. Envelopes wrap a payload with
//! the metadata a consumer needs to route it, behind the `EVT1` marker.
//!
//! - [`varint`] and [`wire`]: LEB128 integers and bounds-checked cursors
//! - [`value`]: schema-neutral field values and records
//! - [`schema`]: versioned payload schemas
//! - [`registry`]: the startup-built event type → schema table
//! - [`payload`] and [`envelope`]: the two wire formats
//! - [`codec`]: the [`EventCodec`] facade tying them together

pub mod codec;
pub mod config;
pub mod digest;
pub mod envelope;
pub mod payload;
pub mod registry;
pub mod schema;
pub mod value;
pub mod varint;
pub mod wire;

pub use codec::EventCodec;
pub use config::CodecLimits;
pub use registry::{SchemaRegistry, SchemaRegistryBuilder, Snapshot};
pub use schema::{FieldDef, PayloadSchema, RecordSchema};
pub use value::{FieldKind, FieldValue, Record};
