//! WebSocket adapter for the messaging backend.
//!
//! - `connector` - tokio-tungstenite implementation of the transport ports
//! - `messages` - JSON wire protocol (inbound events, outbound commands)

mod connector;
mod messages;

pub use connector::{WebSocketConnector, WebSocketTransport};
pub use messages::{
    ActiveChatRoomsData, InboundEvent, InboundEventType, NewChatRoomData, NewOrderData,
    OrderNoticeData, OrderReasonData, OrderStatusUpdateData, OutboundCommand, ReturnRequestedData,
    RoomData, RoomMessagesData,
};
