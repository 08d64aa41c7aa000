//! Chat room identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{CustomerId, Timestamp, ValidationError};

const CUSTOMER_ROOM_PREFIX: &str = "chat_";

/// Identifies a conversation channel.
///
/// Customer rooms are derived deterministically from the customer id
/// (`chat_<customer>`); the admin broadcast room is a plain name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a RoomId from a raw room name, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("room_id"));
        }
        Ok(Self(id))
    }

    /// The conversation room for a customer.
    pub fn for_customer(customer: &CustomerId) -> Self {
        Self(format!("{}{}", CUSTOMER_ROOM_PREFIX, customer.as_str()))
    }

    /// The customer this room belongs to, if it is a customer room.
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.0
            .strip_prefix(CUSTOMER_ROOM_PREFIX)
            .and_then(|rest| CustomerId::new(rest).ok())
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A joined room as shown in the room list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room: RoomId,
    pub joined_at: Timestamp,
    pub last_activity: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_room_is_derived_from_customer_id() {
        let customer = CustomerId::new("user42").unwrap();
        let room = RoomId::for_customer(&customer);
        assert_eq!(room.as_str(), "chat_user42");
        assert_eq!(room.customer_id(), Some(customer));
    }

    #[test]
    fn non_customer_room_has_no_customer() {
        let room = RoomId::new("admin_room").unwrap();
        assert_eq!(room.customer_id(), None);
    }

    #[test]
    fn empty_room_id_is_rejected() {
        assert!(RoomId::new("").is_err());
    }
}
