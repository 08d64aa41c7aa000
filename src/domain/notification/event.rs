//! Notifications surfaced to the admin UI.

use serde::Serialize;
use std::fmt;

use crate::domain::foundation::{NotificationId, Timestamp};

/// Kind of logical occurrence a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    OrderStatusUpdate,
    OrderCancelled,
    CancellationRequested,
    CancellationApproved,
    ReturnRequested,
    ReturnApproved,
    NewChatRoom,
    ChatMessage,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewOrder => "new_order",
            NotificationKind::OrderStatusUpdate => "order_status_update",
            NotificationKind::OrderCancelled => "order_cancelled",
            NotificationKind::CancellationRequested => "cancellation_requested",
            NotificationKind::CancellationApproved => "cancellation_approved",
            NotificationKind::ReturnRequested => "return_requested",
            NotificationKind::ReturnApproved => "return_approved",
            NotificationKind::NewChatRoom => "new_chat_room",
            NotificationKind::ChatMessage => "chat_message",
        }
    }

    /// Returns true for order-lifecycle kinds.
    pub fn is_order_event(&self) -> bool {
        !matches!(
            self,
            NotificationKind::NewChatRoom | NotificationKind::ChatMessage
        )
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A delivered notification.
///
/// Identified logically by `(kind, entity_id)`; `id` only distinguishes
/// separate deliveries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    /// Order id for order events, room id for chat events.
    pub entity_id: String,
    pub title: String,
    pub body: String,
    pub received_at: Timestamp,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        entity_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            kind,
            entity_id: entity_id.into(),
            title: title.into(),
            body: body.into(),
            received_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_kinds_are_not_order_events() {
        assert!(NotificationKind::NewOrder.is_order_event());
        assert!(NotificationKind::ReturnApproved.is_order_event());
        assert!(!NotificationKind::ChatMessage.is_order_event());
        assert!(!NotificationKind::NewChatRoom.is_order_event());
    }

    #[test]
    fn serializes_kind_in_snake_case() {
        let n = Notification::new(NotificationKind::NewOrder, "ord-1", "New order", "2 items");
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "new_order");
        assert_eq!(json["entityId"], "ord-1");
    }
}
