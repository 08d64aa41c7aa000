//! Wire protocol between the admin client and the messaging backend.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`
//! with camelCase event names and payload fields:
//! - Server → Client: order lifecycle events, room membership pushes, chat traffic
//! - Client → Server: room membership requests, chat sends, history requests

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::chat::{ChatMessage, RoomId};
use crate::domain::foundation::{CustomerId, OrderId, Timestamp};
use crate::domain::order::OrderStatus;

// ============================================
// Server → Client Events
// ============================================

/// All events the backend pushes to the admin client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum InboundEvent {
    NewOrder(NewOrderData),
    OrderStatusUpdate(OrderStatusUpdateData),
    OrderCancelled(OrderReasonData),
    CancellationRequested(OrderReasonData),
    CancellationApproved(OrderNoticeData),
    ReturnRequested(ReturnRequestedData),
    ReturnApproved(OrderNoticeData),

    /// Snapshot of rooms the admin should be in; sent once after (re)connect.
    ActiveChatRooms(ActiveChatRoomsData),
    NewChatRoom(NewChatRoomData),
    ChatRoomClosed(RoomData),

    /// Initial history page sent after joining a room.
    RoomMessages(RoomMessagesData),
    /// Response to `getOlderMessages`.
    OlderMessages(RoomMessagesData),
    /// Live chat push.
    Message(ChatMessage),
}

impl InboundEvent {
    /// Parse a text frame.
    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn event_type(&self) -> InboundEventType {
        match self {
            InboundEvent::NewOrder(_) => InboundEventType::NewOrder,
            InboundEvent::OrderStatusUpdate(_) => InboundEventType::OrderStatusUpdate,
            InboundEvent::OrderCancelled(_) => InboundEventType::OrderCancelled,
            InboundEvent::CancellationRequested(_) => InboundEventType::CancellationRequested,
            InboundEvent::CancellationApproved(_) => InboundEventType::CancellationApproved,
            InboundEvent::ReturnRequested(_) => InboundEventType::ReturnRequested,
            InboundEvent::ReturnApproved(_) => InboundEventType::ReturnApproved,
            InboundEvent::ActiveChatRooms(_) => InboundEventType::ActiveChatRooms,
            InboundEvent::NewChatRoom(_) => InboundEventType::NewChatRoom,
            InboundEvent::ChatRoomClosed(_) => InboundEventType::ChatRoomClosed,
            InboundEvent::RoomMessages(_) => InboundEventType::RoomMessages,
            InboundEvent::OlderMessages(_) => InboundEventType::OlderMessages,
            InboundEvent::Message(_) => InboundEventType::Message,
        }
    }
}

/// Discriminant of [`InboundEvent`], used as the handler registration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundEventType {
    NewOrder,
    OrderStatusUpdate,
    OrderCancelled,
    CancellationRequested,
    CancellationApproved,
    ReturnRequested,
    ReturnApproved,
    ActiveChatRooms,
    NewChatRoom,
    ChatRoomClosed,
    RoomMessages,
    OlderMessages,
    Message,
}

impl InboundEventType {
    pub const ALL: [InboundEventType; 13] = [
        InboundEventType::NewOrder,
        InboundEventType::OrderStatusUpdate,
        InboundEventType::OrderCancelled,
        InboundEventType::CancellationRequested,
        InboundEventType::CancellationApproved,
        InboundEventType::ReturnRequested,
        InboundEventType::ReturnApproved,
        InboundEventType::ActiveChatRooms,
        InboundEventType::NewChatRoom,
        InboundEventType::ChatRoomClosed,
        InboundEventType::RoomMessages,
        InboundEventType::OlderMessages,
        InboundEventType::Message,
    ];

    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            InboundEventType::NewOrder => "newOrder",
            InboundEventType::OrderStatusUpdate => "orderStatusUpdate",
            InboundEventType::OrderCancelled => "orderCancelled",
            InboundEventType::CancellationRequested => "cancellationRequested",
            InboundEventType::CancellationApproved => "cancellationApproved",
            InboundEventType::ReturnRequested => "returnRequested",
            InboundEventType::ReturnApproved => "returnApproved",
            InboundEventType::ActiveChatRooms => "activeChatRooms",
            InboundEventType::NewChatRoom => "newChatRoom",
            InboundEventType::ChatRoomClosed => "chatRoomClosed",
            InboundEventType::RoomMessages => "roomMessages",
            InboundEventType::OlderMessages => "olderMessages",
            InboundEventType::Message => "message",
        }
    }
}

impl fmt::Display for InboundEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderData {
    pub order_id: OrderId,
    pub order_line_count: u32,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdateData {
    pub order_id: OrderId,
    pub message: String,
    /// New detailed status, when the backend includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

/// Payload of `orderCancelled` and `cancellationRequested`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReasonData {
    pub order_id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Payload of `cancellationApproved` and `returnApproved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNoticeData {
    pub order_id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequestedData {
    pub order_id: OrderId,
    pub order_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveChatRoomsData {
    pub rooms: Vec<RoomId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatRoomData {
    pub room: RoomId,
    pub user_id: CustomerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomData {
    pub room: RoomId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMessagesData {
    pub room: RoomId,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

// ============================================
// Client → Server Commands
// ============================================

/// All commands the admin client sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum OutboundCommand {
    JoinRoom { room: RoomId },
    LeaveRoom { room: RoomId },
    SendMessage { room: RoomId, body: String },
    GetActiveRooms,
    /// Up to one page of messages strictly older than `before`.
    GetOlderMessages { room: RoomId, before: Timestamp },
}

impl OutboundCommand {
    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a text frame.
    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }

    /// Wire name of the command.
    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundCommand::JoinRoom { .. } => "joinRoom",
            OutboundCommand::LeaveRoom { .. } => "leaveRoom",
            OutboundCommand::SendMessage { .. } => "sendMessage",
            OutboundCommand::GetActiveRooms => "getActiveRooms",
            OutboundCommand::GetOlderMessages { .. } => "getOlderMessages",
        }
    }
}
