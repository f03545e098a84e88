//! Wire schemas for User event payloads.
//!
//! Field ids are part of the wire contract: once published an id keeps its
//! meaning forever. New fields get fresh ids and must be optional.

use chrono::{DateTime, Utc};
use eventwire_codec::{
    CodecLimits, EventCodec, FieldDef, FieldKind, PayloadSchema, Record, RecordSchema,
    SchemaRegistry, Snapshot,
};
use eventwire_core::error::CodecError;
use uuid::Uuid;

use super::events::{
    AddressData, USER_ACTIVATED_EVENT_TYPE, USER_ADDRESS_ADDED_EVENT_TYPE,
    USER_ADDRESS_DELETED_EVENT_TYPE, USER_ADDRESS_UPDATED_EVENT_TYPE, USER_CREATED_EVENT_TYPE,
    USER_DEACTIVATED_EVENT_TYPE, USER_DELETED_EVENT_TYPE, USER_PASSWORD_CHANGED_EVENT_TYPE,
    USER_PROFILE_UPDATED_EVENT_TYPE, USER_WITHDRAWN_EVENT_TYPE, UserActivated, UserAddressAdded,
    UserAddressDeleted, UserAddressUpdated, UserCreated, UserDeactivated, UserDeleted,
    UserEventKind, UserPasswordChanged, UserProfileUpdated, UserType, UserWithdrawn,
};

/// Current schema version of address-carrying events.
pub const ADDRESS_SCHEMA_VERSION: u32 = 2;

mod created {
    pub const USER_ID: u32 = 1;
    pub const USERNAME: u32 = 2;
    pub const EMAIL: u32 = 3;
    pub const NAME: u32 = 4;
    pub const PHONE_NUMBER: u32 = 5;
    pub const USER_TYPE: u32 = 6;
    pub const REGISTERED_AT: u32 = 7;
}

mod profile {
    pub const USER_ID: u32 = 1;
    pub const NAME: u32 = 2;
    pub const PHONE_NUMBER: u32 = 3;
    pub const UPDATED_AT: u32 = 4;
}

/// Shared by `UserAddressAdded` and `UserAddressUpdated`.
mod address_change {
    pub const USER_ID: u32 = 1;
    pub const ADDRESS: u32 = 2;
    pub const AT: u32 = 3;
}

mod address_deleted {
    pub const USER_ID: u32 = 1;
    pub const ADDRESS_ID: u32 = 2;
    pub const DELETED_AT: u32 = 3;
}

/// Shared by every event that only records who and when.
mod lifecycle {
    pub const USER_ID: u32 = 1;
    pub const AT: u32 = 2;
}

mod address {
    pub const ADDRESS_ID: u32 = 1;
    pub const STREET_ADDRESS: u32 = 2;
    pub const DETAIL_ADDRESS: u32 = 3;
    pub const ZIP_CODE: u32 = 4;
    pub const IS_DEFAULT: u32 = 5;
    pub const NAME: u32 = 6;
    pub const CITY: u32 = 7;
    pub const STATE: u32 = 8;
    pub const COUNTRY: u32 = 9;
}

fn address_layout() -> RecordSchema {
    RecordSchema::new(vec![
        FieldDef::required(address::ADDRESS_ID, "address_id", FieldKind::Text),
        FieldDef::required(address::STREET_ADDRESS, "street_address", FieldKind::Text),
        FieldDef::optional(address::DETAIL_ADDRESS, "detail_address", FieldKind::Text),
        FieldDef::required(address::ZIP_CODE, "zip_code", FieldKind::Text),
        FieldDef::required(address::IS_DEFAULT, "is_default", FieldKind::Bool),
        FieldDef::optional(address::NAME, "name", FieldKind::Text).since(2),
        FieldDef::optional(address::CITY, "city", FieldKind::Text).since(2),
        FieldDef::optional(address::STATE, "state", FieldKind::Text).since(2),
        FieldDef::optional(address::COUNTRY, "country", FieldKind::Text).since(2),
    ])
}

fn address_change_schema(
    event_type: &'static str,
    at_name: &'static str,
) -> Result<PayloadSchema, CodecError> {
    PayloadSchema::new(
        event_type,
        ADDRESS_SCHEMA_VERSION,
        RecordSchema::new(vec![
            FieldDef::required(address_change::USER_ID, "user_id", FieldKind::Text),
            FieldDef::required_record(address_change::ADDRESS, "address", address_layout()),
            FieldDef::required(address_change::AT, at_name, FieldKind::Timestamp),
        ]),
    )
}

fn lifecycle_schema(
    event_type: &'static str,
    at_name: &'static str,
) -> Result<PayloadSchema, CodecError> {
    PayloadSchema::new(
        event_type,
        1,
        RecordSchema::new(vec![
            FieldDef::required(lifecycle::USER_ID, "user_id", FieldKind::Text),
            FieldDef::required(lifecycle::AT, at_name, FieldKind::Timestamp),
        ]),
    )
}

/// Every User payload schema at its current version.
///
/// # Errors
///
/// Returns `CodecError::Encoding` if a schema breaks an evolution rule.
pub fn user_payload_schemas() -> Result<Vec<PayloadSchema>, CodecError> {
    Ok(vec![
        PayloadSchema::new(
            USER_CREATED_EVENT_TYPE,
            1,
            RecordSchema::new(vec![
                FieldDef::required(created::USER_ID, "user_id", FieldKind::Text),
                FieldDef::required(created::USERNAME, "username", FieldKind::Text),
                FieldDef::required(created::EMAIL, "email", FieldKind::Text),
                FieldDef::required(created::NAME, "name", FieldKind::Text),
                FieldDef::optional(created::PHONE_NUMBER, "phone_number", FieldKind::Text),
                FieldDef::required(created::USER_TYPE, "user_type", FieldKind::Text),
                FieldDef::required(created::REGISTERED_AT, "registered_at", FieldKind::Timestamp),
            ]),
        )?,
        lifecycle_schema(USER_DELETED_EVENT_TYPE, "deleted_at")?,
        lifecycle_schema(USER_PASSWORD_CHANGED_EVENT_TYPE, "changed_at")?,
        PayloadSchema::new(
            USER_PROFILE_UPDATED_EVENT_TYPE,
            1,
            RecordSchema::new(vec![
                FieldDef::required(profile::USER_ID, "user_id", FieldKind::Text),
                FieldDef::required(profile::NAME, "name", FieldKind::Text),
                FieldDef::optional(profile::PHONE_NUMBER, "phone_number", FieldKind::Text),
                FieldDef::required(profile::UPDATED_AT, "updated_at", FieldKind::Timestamp),
            ]),
        )?,
        address_change_schema(USER_ADDRESS_ADDED_EVENT_TYPE, "added_at")?,
        address_change_schema(USER_ADDRESS_UPDATED_EVENT_TYPE, "updated_at")?,
        PayloadSchema::new(
            USER_ADDRESS_DELETED_EVENT_TYPE,
            1,
            RecordSchema::new(vec![
                FieldDef::required(address_deleted::USER_ID, "user_id", FieldKind::Text),
                FieldDef::required(address_deleted::ADDRESS_ID, "address_id", FieldKind::Text),
                FieldDef::required(address_deleted::DELETED_AT, "deleted_at", FieldKind::Timestamp),
            ]),
        )?,
        lifecycle_schema(USER_WITHDRAWN_EVENT_TYPE, "withdrawn_at")?,
        lifecycle_schema(USER_DEACTIVATED_EVENT_TYPE, "deactivated_at")?,
        lifecycle_schema(USER_ACTIVATED_EVENT_TYPE, "activated_at")?,
    ])
}

/// Builds the registry covering every User event type.
///
/// # Errors
///
/// Returns a `CodecError` if a schema is invalid or an event type is left
/// without one.
pub fn user_schema_registry() -> Result<SchemaRegistry<UserEventKind>, CodecError> {
    user_payload_schemas()?
        .into_iter()
        .try_fold(SchemaRegistry::<UserEventKind>::builder(), |builder, schema| {
            builder.register(schema)
        })?
        .build()
}

/// Builds a codec for User events.
///
/// # Errors
///
/// Any error of [`user_schema_registry`].
pub fn user_event_codec(limits: CodecLimits) -> Result<EventCodec<UserEventKind>, CodecError> {
    Ok(EventCodec::with_limits(user_schema_registry()?, limits))
}

fn address_to_record(data: &AddressData) -> Record {
    Record::new()
        .with(address::ADDRESS_ID, data.address_id)
        .with(address::STREET_ADDRESS, data.street_address.as_str())
        .with_optional(address::DETAIL_ADDRESS, data.detail_address.as_deref())
        .with(address::ZIP_CODE, data.zip_code.as_str())
        .with(address::IS_DEFAULT, data.is_default)
        .with_optional(address::NAME, data.name.as_deref())
        .with_optional(address::CITY, data.city.as_deref())
        .with_optional(address::STATE, data.state.as_deref())
        .with_optional(address::COUNTRY, data.country.as_deref())
}

fn address_from_record(record: &Record) -> Result<AddressData, CodecError> {
    Ok(AddressData {
        address_id: record.uuid(address::ADDRESS_ID, "address_id")?,
        street_address: record.text(address::STREET_ADDRESS, "street_address")?,
        detail_address: record.optional_text(address::DETAIL_ADDRESS, "detail_address")?,
        zip_code: record.text(address::ZIP_CODE, "zip_code")?,
        is_default: record.bool(address::IS_DEFAULT, "is_default")?,
        name: record.optional_text(address::NAME, "name")?,
        city: record.optional_text(address::CITY, "city")?,
        state: record.optional_text(address::STATE, "state")?,
        country: record.optional_text(address::COUNTRY, "country")?,
    })
}

fn parse_user_type(record: &Record) -> Result<UserType, CodecError> {
    let raw = record.text(created::USER_TYPE, "user_type")?;
    UserType::parse(&raw)
        .ok_or_else(|| CodecError::decoding(format!("unknown user_type {raw:?}")))
}

impl Snapshot for UserEventKind {
    const EVENT_TYPES: &'static [&'static str] = &[
        USER_CREATED_EVENT_TYPE,
        USER_DELETED_EVENT_TYPE,
        USER_PASSWORD_CHANGED_EVENT_TYPE,
        USER_PROFILE_UPDATED_EVENT_TYPE,
        USER_ADDRESS_ADDED_EVENT_TYPE,
        USER_ADDRESS_UPDATED_EVENT_TYPE,
        USER_ADDRESS_DELETED_EVENT_TYPE,
        USER_WITHDRAWN_EVENT_TYPE,
        USER_DEACTIVATED_EVENT_TYPE,
        USER_ACTIVATED_EVENT_TYPE,
    ];

    fn event_type(&self) -> &'static str {
        UserEventKind::event_type(self)
    }

    fn to_record(&self) -> Record {
        match self {
            Self::Created(e) => Record::new()
                .with(created::USER_ID, e.user_id)
                .with(created::USERNAME, e.username.as_str())
                .with(created::EMAIL, e.email.as_str())
                .with(created::NAME, e.name.as_str())
                .with_optional(created::PHONE_NUMBER, e.phone_number.as_deref())
                .with(created::USER_TYPE, e.user_type.as_str())
                .with(created::REGISTERED_AT, e.registered_at),
            Self::ProfileUpdated(e) => Record::new()
                .with(profile::USER_ID, e.user_id)
                .with(profile::NAME, e.name.as_str())
                .with_optional(profile::PHONE_NUMBER, e.phone_number.as_deref())
                .with(profile::UPDATED_AT, e.updated_at),
            Self::AddressAdded(e) => Record::new()
                .with(address_change::USER_ID, e.user_id)
                .with(address_change::ADDRESS, address_to_record(&e.address))
                .with(address_change::AT, e.added_at),
            Self::AddressUpdated(e) => Record::new()
                .with(address_change::USER_ID, e.user_id)
                .with(address_change::ADDRESS, address_to_record(&e.address))
                .with(address_change::AT, e.updated_at),
            Self::AddressDeleted(e) => Record::new()
                .with(address_deleted::USER_ID, e.user_id)
                .with(address_deleted::ADDRESS_ID, e.address_id)
                .with(address_deleted::DELETED_AT, e.deleted_at),
            Self::Deleted(e) => lifecycle_record(e.user_id, e.deleted_at),
            Self::PasswordChanged(e) => lifecycle_record(e.user_id, e.changed_at),
            Self::Withdrawn(e) => lifecycle_record(e.user_id, e.withdrawn_at),
            Self::Deactivated(e) => lifecycle_record(e.user_id, e.deactivated_at),
            Self::Activated(e) => lifecycle_record(e.user_id, e.activated_at),
        }
    }

    fn from_record(event_type: &str, record: &Record) -> Result<Self, CodecError> {
        let lifecycle_user = || record.uuid(lifecycle::USER_ID, "user_id");
        let lifecycle_at = |name: &str| record.timestamp(lifecycle::AT, name);

        match event_type {
            USER_CREATED_EVENT_TYPE => Ok(Self::Created(UserCreated {
                user_id: record.uuid(created::USER_ID, "user_id")?,
                username: record.text(created::USERNAME, "username")?,
                email: record.text(created::EMAIL, "email")?,
                name: record.text(created::NAME, "name")?,
                phone_number: record.optional_text(created::PHONE_NUMBER, "phone_number")?,
                user_type: parse_user_type(record)?,
                registered_at: record.timestamp(created::REGISTERED_AT, "registered_at")?,
            })),
            USER_PROFILE_UPDATED_EVENT_TYPE => Ok(Self::ProfileUpdated(UserProfileUpdated {
                user_id: record.uuid(profile::USER_ID, "user_id")?,
                name: record.text(profile::NAME, "name")?,
                phone_number: record.optional_text(profile::PHONE_NUMBER, "phone_number")?,
                updated_at: record.timestamp(profile::UPDATED_AT, "updated_at")?,
            })),
            USER_ADDRESS_ADDED_EVENT_TYPE => Ok(Self::AddressAdded(UserAddressAdded {
                user_id: record.uuid(address_change::USER_ID, "user_id")?,
                address: address_from_record(
                    record.record(address_change::ADDRESS, "address")?,
                )?,
                added_at: record.timestamp(address_change::AT, "added_at")?,
            })),
            USER_ADDRESS_UPDATED_EVENT_TYPE => Ok(Self::AddressUpdated(UserAddressUpdated {
                user_id: record.uuid(address_change::USER_ID, "user_id")?,
                address: address_from_record(
                    record.record(address_change::ADDRESS, "address")?,
                )?,
                updated_at: record.timestamp(address_change::AT, "updated_at")?,
            })),
            USER_ADDRESS_DELETED_EVENT_TYPE => Ok(Self::AddressDeleted(UserAddressDeleted {
                user_id: record.uuid(address_deleted::USER_ID, "user_id")?,
                address_id: record.uuid(address_deleted::ADDRESS_ID, "address_id")?,
                deleted_at: record.timestamp(address_deleted::DELETED_AT, "deleted_at")?,
            })),
            USER_DELETED_EVENT_TYPE => Ok(Self::Deleted(UserDeleted {
                user_id: lifecycle_user()?,
                deleted_at: lifecycle_at("deleted_at")?,
            })),
            USER_PASSWORD_CHANGED_EVENT_TYPE => Ok(Self::PasswordChanged(UserPasswordChanged {
                user_id: lifecycle_user()?,
                changed_at: lifecycle_at("changed_at")?,
            })),
            USER_WITHDRAWN_EVENT_TYPE => Ok(Self::Withdrawn(UserWithdrawn {
                user_id: lifecycle_user()?,
                withdrawn_at: lifecycle_at("withdrawn_at")?,
            })),
            USER_DEACTIVATED_EVENT_TYPE => Ok(Self::Deactivated(UserDeactivated {
                user_id: lifecycle_user()?,
                deactivated_at: lifecycle_at("deactivated_at")?,
            })),
            USER_ACTIVATED_EVENT_TYPE => Ok(Self::Activated(UserActivated {
                user_id: lifecycle_user()?,
                activated_at: lifecycle_at("activated_at")?,
            })),
            other => Err(CodecError::UnknownEventType(other.to_owned())),
        }
    }
}

fn lifecycle_record(user_id: Uuid, at: DateTime<Utc>) -> Record {
    Record::new()
        .with(lifecycle::USER_ID, user_id)
        .with(lifecycle::AT, at)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use eventwire_codec::payload;

    use super::*;

    fn sample_address() -> AddressData {
        AddressData {
            address_id: Uuid::new_v4(),
            street_address: "1 Main St".into(),
            detail_address: Some("Apt 4".into()),
            zip_code: "04524".into(),
            is_default: true,
            name: Some("Home".into()),
            city: Some("Seoul".into()),
            state: None,
            country: Some("KR".into()),
        }
    }

    #[test]
    fn test_registry_covers_every_user_event_type() {
        // Act
        let registry = user_schema_registry().unwrap();

        // Assert
        assert_eq!(registry.len(), UserEventKind::EVENT_TYPES.len());
        for event_type in UserEventKind::EVENT_TYPES {
            assert!(registry.contains(event_type), "missing {event_type}");
        }
        assert_eq!(
            registry
                .lookup(USER_ADDRESS_ADDED_EVENT_TYPE)
                .unwrap()
                .version(),
            2
        );
    }

    #[test]
    fn test_created_round_trip() {
        // Arrange
        let codec = user_event_codec(CodecLimits::default()).unwrap();
        let kind = UserEventKind::Created(UserCreated {
            user_id: Uuid::new_v4(),
            username: "ana".into(),
            email: "ana@example.com".into(),
            name: "Ana".into(),
            phone_number: None,
            user_type: UserType::Customer,
            registered_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap(),
        });

        // Act
        let bytes = codec.encode_payload(&kind).unwrap();
        let decoded = codec
            .decode_payload(USER_CREATED_EVENT_TYPE, &bytes)
            .unwrap();

        // Assert
        assert_eq!(decoded, kind);
    }

    #[test]
    fn test_address_round_trip_keeps_v2_fields() {
        // Arrange
        let codec = user_event_codec(CodecLimits::default()).unwrap();
        let kind = UserEventKind::AddressUpdated(UserAddressUpdated {
            user_id: Uuid::new_v4(),
            address: sample_address(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
        });

        // Act
        let bytes = codec.encode_payload(&kind).unwrap();

        // Assert
        assert_eq!(payload::schema_version(&bytes).unwrap(), 2);
        assert_eq!(
            codec
                .decode_payload(USER_ADDRESS_UPDATED_EVENT_TYPE, &bytes)
                .unwrap(),
            kind
        );
    }

    #[test]
    fn test_v1_address_payload_decodes_without_v2_fields() {
        // Arrange: a producer still on the v1 address layout.
        let v1_schema = PayloadSchema::new(
            USER_ADDRESS_ADDED_EVENT_TYPE,
            1,
            RecordSchema::new(vec![
                FieldDef::required(1, "user_id", FieldKind::Text),
                FieldDef::required_record(
                    2,
                    "address",
                    RecordSchema::new(vec![
                        FieldDef::required(1, "address_id", FieldKind::Text),
                        FieldDef::required(2, "street_address", FieldKind::Text),
                        FieldDef::optional(3, "detail_address", FieldKind::Text),
                        FieldDef::required(4, "zip_code", FieldKind::Text),
                        FieldDef::required(5, "is_default", FieldKind::Bool),
                    ]),
                ),
                FieldDef::required(3, "added_at", FieldKind::Timestamp),
            ]),
        )
        .unwrap();
        let user_id = Uuid::new_v4();
        let address_id = Uuid::new_v4();
        let added_at = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        let record = Record::new()
            .with(1, user_id)
            .with(
                2,
                Record::new()
                    .with(1, address_id)
                    .with(2, "1 Main St")
                    .with(4, "04524")
                    .with(5, false),
            )
            .with(3, added_at);
        let limits = CodecLimits::default();
        let bytes = payload::encode(&v1_schema, &record, &limits).unwrap();
        let codec = user_event_codec(limits).unwrap();

        // Act
        let decoded = codec
            .decode_payload(USER_ADDRESS_ADDED_EVENT_TYPE, &bytes)
            .unwrap();

        // Assert
        let UserEventKind::AddressAdded(event) = decoded else {
            panic!("expected AddressAdded, got {decoded:?}");
        };
        assert_eq!(event.user_id, user_id);
        assert_eq!(event.added_at, added_at);
        assert_eq!(event.address.address_id, address_id);
        assert_eq!(event.address.detail_address, None);
        assert!(!event.address.is_default);
        assert_eq!(event.address.name, None);
        assert_eq!(event.address.city, None);
        assert_eq!(event.address.state, None);
        assert_eq!(event.address.country, None);
    }

    #[test]
    fn test_unknown_user_type_is_a_decoding_error() {
        // Arrange
        let schemas = user_payload_schemas().unwrap();
        let created_schema = schemas
            .iter()
            .find(|s| s.event_type() == USER_CREATED_EVENT_TYPE)
            .unwrap();
        let record = Record::new()
            .with(1, Uuid::new_v4())
            .with(2, "ana")
            .with(3, "ana@example.com")
            .with(4, "Ana")
            .with(6, "SUPERUSER")
            .with(7, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let limits = CodecLimits::default();
        let bytes = payload::encode(created_schema, &record, &limits).unwrap();

        // Act
        let result = user_event_codec(limits)
            .unwrap()
            .decode_payload(USER_CREATED_EVENT_TYPE, &bytes);

        // Assert
        assert!(matches!(result, Err(CodecError::Decoding(msg)) if msg.contains("SUPERUSER")));
    }

    #[test]
    fn test_lifecycle_events_share_field_layout() {
        let codec = user_event_codec(CodecLimits::default()).unwrap();
        let user_id = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2024, 5, 5, 5, 5, 5).unwrap();

        let withdrawn = codec
            .encode_payload(&UserEventKind::Withdrawn(UserWithdrawn {
                user_id,
                withdrawn_at: at,
            }))
            .unwrap();
        let activated = codec
            .encode_payload(&UserEventKind::Activated(UserActivated {
                user_id,
                activated_at: at,
            }))
            .unwrap();

        assert_eq!(withdrawn, activated);
        assert!(matches!(
            codec.decode_payload(USER_DEACTIVATED_EVENT_TYPE, &withdrawn),
            Ok(UserEventKind::Deactivated(UserDeactivated { user_id: id, .. })) if id == user_id
        ));
    }

    #[test]
    fn test_from_record_rejects_foreign_event_type() {
        assert_eq!(
            UserEventKind::from_record("OrderPlaced", &Record::new()).unwrap_err(),
            CodecError::UnknownEventType("OrderPlaced".into())
        );
    }
}
