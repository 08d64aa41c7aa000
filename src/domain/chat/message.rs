//! Chat message value objects.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::domain::foundation::{MessageId, OrderId, Timestamp};

use super::room::RoomId;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Customer,
    Admin,
    System,
}

/// An order attached to a chat message ("I have a question about this order").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReference {
    pub order_id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
}

/// A unit of chat. Created server-side, never mutated client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub room: RoomId,
    pub sender_role: SenderRole,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_ref: Option<OrderReference>,
    pub timestamp: Timestamp,
}

impl ChatMessage {
    /// Total order within a room: timestamp, ties broken by id.
    pub fn chronological_cmp(&self, other: &ChatMessage) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Returns true if the admin side wrote this message.
    pub fn is_from_admin(&self) -> bool {
        self.sender_role == SenderRole::Admin
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Message in `room` at `10:MM:SS` on a fixed day.
    pub fn message_at(room: &str, id: &str, hh_mm_ss: &str) -> ChatMessage {
        ChatMessage {
            id: MessageId::new(id).unwrap(),
            room: RoomId::new(room).unwrap(),
            sender_role: SenderRole::Customer,
            body: format!("message {}", id),
            order_ref: None,
            timestamp: Timestamp::parse_rfc3339(&format!("2025-01-10T{}Z", hh_mm_ss)).unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::message_at;
    use super::*;

    #[test]
    fn orders_by_timestamp_then_id() {
        let a = message_at("chat_user42", "m-2", "10:00:00");
        let b = message_at("chat_user42", "m-1", "10:01:00");
        let c = message_at("chat_user42", "m-3", "10:01:00");

        assert_eq!(a.chronological_cmp(&b), Ordering::Less);
        assert_eq!(b.chronological_cmp(&c), Ordering::Less);
        assert_eq!(c.chronological_cmp(&c), Ordering::Equal);
    }

    #[test]
    fn deserializes_wire_shape() {
        let json = r#"{
            "id": "m-1",
            "room": "chat_user42",
            "senderRole": "customer",
            "body": "Where is my parcel?",
            "orderRef": {"orderId": "ord-9"},
            "timestamp": "2025-01-10T10:00:00Z"
        }"#;

        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.sender_role, SenderRole::Customer);
        assert_eq!(msg.order_ref.unwrap().order_id.as_str(), "ord-9");
    }

    #[test]
    fn is_from_admin_checks_role() {
        let mut msg = message_at("chat_user42", "m-1", "10:00:00");
        assert!(!msg.is_from_admin());
        msg.sender_role = SenderRole::Admin;
        assert!(msg.is_from_admin());
    }
}
