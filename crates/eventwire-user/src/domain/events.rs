//! Domain events for the User aggregate.

use chrono::{DateTime, Utc};
use eventwire_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate type tag carried by every User envelope.
pub const USER_AGGREGATE_TYPE: &str = "User";

/// Event type identifier for [`UserCreated`].
pub const USER_CREATED_EVENT_TYPE: &str = "UserCreated";

/// Event type identifier for [`UserDeleted`].
pub const USER_DELETED_EVENT_TYPE: &str = "UserDeleted";

/// Event type identifier for [`UserPasswordChanged`].
pub const USER_PASSWORD_CHANGED_EVENT_TYPE: &str = "UserPasswordChanged";

/// Event type identifier for [`UserProfileUpdated`].
pub const USER_PROFILE_UPDATED_EVENT_TYPE: &str = "UserProfileUpdated";

/// Event type identifier for [`UserAddressAdded`].
pub const USER_ADDRESS_ADDED_EVENT_TYPE: &str = "UserAddressAdded";

/// Event type identifier for [`UserAddressUpdated`].
pub const USER_ADDRESS_UPDATED_EVENT_TYPE: &str = "UserAddressUpdated";

/// Event type identifier for [`UserAddressDeleted`].
pub const USER_ADDRESS_DELETED_EVENT_TYPE: &str = "UserAddressDeleted";

/// Event type identifier for [`UserWithdrawn`].
pub const USER_WITHDRAWN_EVENT_TYPE: &str = "UserWithdrawn";

/// Event type identifier for [`UserDeactivated`].
pub const USER_DEACTIVATED_EVENT_TYPE: &str = "UserDeactivated";

/// Event type identifier for [`UserActivated`].
pub const USER_ACTIVATED_EVENT_TYPE: &str = "UserActivated";

/// Kind of account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Customer,
    Admin,
}

impl UserType {
    /// Wire spelling of the type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Admin => "ADMIN",
        }
    }

    /// Parses the wire spelling.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CUSTOMER" => Some(Self::Customer),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Address as carried by address events.
///
/// `name`, `city`, `state` and `country` arrived with schema version 2;
/// payloads from version 1 producers decode with them as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressData {
    /// The address identifier.
    pub address_id: Uuid,
    /// Street line.
    pub street_address: String,
    /// Apartment, floor, etc.
    pub detail_address: Option<String>,
    /// Postal code.
    pub zip_code: String,
    /// Whether this is the user's default address.
    pub is_default: bool,
    /// Label such as "Home".
    pub name: Option<String>,
    /// City. Absent from schema version 1 payloads.
    pub city: Option<String>,
    /// State or province. Absent from schema version 1 payloads.
    pub state: Option<String>,
    /// Country. Absent from schema version 1 payloads.
    pub country: Option<String>,
}

/// Emitted when a user registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreated {
    /// The user identifier.
    pub user_id: Uuid,
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Contact phone number, if given.
    pub phone_number: Option<String>,
    /// Account kind.
    pub user_type: UserType,
    /// When registration completed.
    pub registered_at: DateTime<Utc>,
}

/// Emitted when a user record is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeleted {
    /// The user identifier.
    pub user_id: Uuid,
    /// When the user was deleted.
    pub deleted_at: DateTime<Utc>,
}

/// Emitted when a user changes their password. The password itself is never
/// part of the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPasswordChanged {
    /// The user identifier.
    pub user_id: Uuid,
    /// When the password was changed.
    pub changed_at: DateTime<Utc>,
}

/// Emitted when a user updates their profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfileUpdated {
    /// The user identifier.
    pub user_id: Uuid,
    /// New display name.
    pub name: String,
    /// New phone number; `None` clears it.
    pub phone_number: Option<String>,
    /// When the profile was updated.
    pub updated_at: DateTime<Utc>,
}

/// Emitted when a user adds an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAddressAdded {
    /// The user identifier.
    pub user_id: Uuid,
    /// The added address.
    pub address: AddressData,
    /// When the address was added.
    pub added_at: DateTime<Utc>,
}

/// Emitted when a user edits an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAddressUpdated {
    /// The user identifier.
    pub user_id: Uuid,
    /// The address after the edit.
    pub address: AddressData,
    /// When the address was updated.
    pub updated_at: DateTime<Utc>,
}

/// Emitted when a user removes an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAddressDeleted {
    /// The user identifier.
    pub user_id: Uuid,
    /// The removed address.
    pub address_id: Uuid,
    /// When the address was removed.
    pub deleted_at: DateTime<Utc>,
}

/// Emitted when a user closes their account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWithdrawn {
    /// The user identifier.
    pub user_id: Uuid,
    /// When the user withdrew.
    pub withdrawn_at: DateTime<Utc>,
}

/// Emitted when an account is suspended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeactivated {
    /// The user identifier.
    pub user_id: Uuid,
    /// When the account was deactivated.
    pub deactivated_at: DateTime<Utc>,
}

/// Emitted when a suspended account is restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivated {
    /// The user identifier.
    pub user_id: Uuid,
    /// When the account was activated.
    pub activated_at: DateTime<Utc>,
}

/// Event payload variants for the User aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEventKind {
    Created(UserCreated),
    Deleted(UserDeleted),
    PasswordChanged(UserPasswordChanged),
    ProfileUpdated(UserProfileUpdated),
    AddressAdded(UserAddressAdded),
    AddressUpdated(UserAddressUpdated),
    AddressDeleted(UserAddressDeleted),
    Withdrawn(UserWithdrawn),
    Deactivated(UserDeactivated),
    Activated(UserActivated),
}

impl UserEventKind {
    /// The event type tag of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => USER_CREATED_EVENT_TYPE,
            Self::Deleted(_) => USER_DELETED_EVENT_TYPE,
            Self::PasswordChanged(_) => USER_PASSWORD_CHANGED_EVENT_TYPE,
            Self::ProfileUpdated(_) => USER_PROFILE_UPDATED_EVENT_TYPE,
            Self::AddressAdded(_) => USER_ADDRESS_ADDED_EVENT_TYPE,
            Self::AddressUpdated(_) => USER_ADDRESS_UPDATED_EVENT_TYPE,
            Self::AddressDeleted(_) => USER_ADDRESS_DELETED_EVENT_TYPE,
            Self::Withdrawn(_) => USER_WITHDRAWN_EVENT_TYPE,
            Self::Deactivated(_) => USER_DEACTIVATED_EVENT_TYPE,
            Self::Activated(_) => USER_ACTIVATED_EVENT_TYPE,
        }
    }

    /// The user this payload is about.
    #[must_use]
    pub fn user_id(&self) -> Uuid {
        match self {
            Self::Created(e) => e.user_id,
            Self::Deleted(e) => e.user_id,
            Self::PasswordChanged(e) => e.user_id,
            Self::ProfileUpdated(e) => e.user_id,
            Self::AddressAdded(e) => e.user_id,
            Self::AddressUpdated(e) => e.user_id,
            Self::AddressDeleted(e) => e.user_id,
            Self::Withdrawn(e) => e.user_id,
            Self::Deactivated(e) => e.user_id,
            Self::Activated(e) => e.user_id,
        }
    }
}

/// Domain event envelope for the User aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: UserEventKind,
}

impl UserEvent {
    /// Wraps `kind` with metadata derived from it.
    #[must_use]
    pub fn new(event_id: Uuid, occurred_at: DateTime<Utc>, kind: UserEventKind) -> Self {
        Self {
            metadata: EventMetadata {
                event_id,
                event_type: kind.event_type().to_owned(),
                aggregate_id: kind.user_id(),
                occurred_at,
            },
            kind,
        }
    }
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn aggregate_type(&self) -> &'static str {
        USER_AGGREGATE_TYPE
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_new_derives_metadata_from_payload() {
        // Arrange
        let user_id = Uuid::new_v4();
        let event_id = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        // Act
        let event = UserEvent::new(
            event_id,
            at,
            UserEventKind::Withdrawn(UserWithdrawn {
                user_id,
                withdrawn_at: at,
            }),
        );

        // Assert
        assert_eq!(event.event_type(), USER_WITHDRAWN_EVENT_TYPE);
        assert_eq!(event.aggregate_type(), "User");
        let meta = event.metadata();
        assert_eq!(meta.event_id, event_id);
        assert_eq!(meta.event_type, USER_WITHDRAWN_EVENT_TYPE);
        assert_eq!(meta.aggregate_id, user_id);
        assert_eq!(meta.occurred_at, at);
    }

    #[test]
    fn test_user_type_wire_spelling() {
        for user_type in [UserType::Customer, UserType::Admin] {
            assert_eq!(UserType::parse(user_type.as_str()), Some(user_type));
        }
        assert_eq!(UserType::parse("customer"), None);
        assert_eq!(
            serde_json::to_value(UserType::Admin).unwrap(),
            serde_json::json!("ADMIN")
        );
    }
}
