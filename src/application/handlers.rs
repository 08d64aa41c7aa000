//! Inbound event handlers.
//!
//! One handler per concern, all sharing the hub's [`HubContext`]. Handlers
//! never hold two context locks at once.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::adapters::websocket::{InboundEvent, InboundEventType};
use crate::domain::chat::{ChatMessage, RoomId};
use crate::domain::foundation::OrderId;
use crate::domain::notification::NotificationKind;
use crate::domain::order::OrderStatus;

use super::dispatcher::{EventDispatcher, InboundHandler};
use super::error::HubError;
use super::hub::HubContext;

/// Bind every handler to `dispatcher`, replacing whatever was bound before.
pub(crate) async fn register_all(dispatcher: &EventDispatcher, ctx: &Arc<HubContext>) {
    let orders: Arc<dyn InboundHandler> = Arc::new(OrderEventHandler::new(Arc::clone(ctx)));
    for event_type in [
        InboundEventType::NewOrder,
        InboundEventType::OrderStatusUpdate,
        InboundEventType::OrderCancelled,
        InboundEventType::CancellationRequested,
        InboundEventType::CancellationApproved,
        InboundEventType::ReturnRequested,
        InboundEventType::ReturnApproved,
    ] {
        dispatcher.on(event_type, Arc::clone(&orders)).await;
    }

    dispatcher
        .on(
            InboundEventType::ActiveChatRooms,
            Arc::new(ActiveRoomsHandler::new(Arc::clone(ctx))),
        )
        .await;
    dispatcher
        .on(
            InboundEventType::NewChatRoom,
            Arc::new(NewChatRoomHandler::new(Arc::clone(ctx))),
        )
        .await;
    dispatcher
        .on(
            InboundEventType::ChatRoomClosed,
            Arc::new(RoomClosedHandler::new(Arc::clone(ctx))),
        )
        .await;
    dispatcher
        .on(
            InboundEventType::RoomMessages,
            Arc::new(RoomMessagesHandler::new(Arc::clone(ctx))),
        )
        .await;
    dispatcher
        .on(
            InboundEventType::OlderMessages,
            Arc::new(OlderMessagesHandler::new(Arc::clone(ctx))),
        )
        .await;
    dispatcher
        .on(
            InboundEventType::Message,
            Arc::new(LiveMessageHandler::new(Arc::clone(ctx))),
        )
        .await;

    dispatcher.mark_registered();
}

fn unexpected(handler: &'static str, event: &InboundEvent) -> HubError {
    HubError::Protocol(format!("{} cannot handle {}", handler, event.event_type()))
}

// ════════════════════════════════════════════════════════════════════════════
// Orders
// ════════════════════════════════════════════════════════════════════════════

/// Known effect of an order event on the order's detailed status.
enum StatusEffect {
    Set(OrderStatus),
    Invalidate,
}

/// Turns order lifecycle pushes into notifications and keeps the transition
/// engine's status cache current.
pub(crate) struct OrderEventHandler {
    ctx: Arc<HubContext>,
}

impl OrderEventHandler {
    pub(crate) fn new(ctx: Arc<HubContext>) -> Self {
        Self { ctx }
    }

    async fn apply_status(&self, order: &OrderId, effect: StatusEffect) {
        let Some(engine) = self.ctx.orders.get() else {
            return;
        };
        match effect {
            StatusEffect::Set(status) => engine.record_status(order, status).await,
            StatusEffect::Invalidate => engine.forget(order).await,
        }
    }
}

#[async_trait]
impl InboundHandler for OrderEventHandler {
    async fn handle(&self, event: InboundEvent) -> Result<(), HubError> {
        let (kind, order, title, body, effect) = match &event {
            InboundEvent::NewOrder(data) => (
                NotificationKind::NewOrder,
                data.order_id.clone(),
                "New order".to_string(),
                format!("{} item(s), total {:.2}", data.order_line_count, data.total_amount),
                StatusEffect::Set(OrderStatus::New),
            ),
            InboundEvent::OrderStatusUpdate(data) => (
                NotificationKind::OrderStatusUpdate,
                data.order_id.clone(),
                "Order status updated".to_string(),
                data.message.clone(),
                data.status
                    .map(StatusEffect::Set)
                    .unwrap_or(StatusEffect::Invalidate),
            ),
            InboundEvent::OrderCancelled(data) => (
                NotificationKind::OrderCancelled,
                data.order_id.clone(),
                "Order cancelled".to_string(),
                data.reason.clone().unwrap_or_default(),
                StatusEffect::Set(OrderStatus::Cancelled),
            ),
            InboundEvent::CancellationRequested(data) => (
                NotificationKind::CancellationRequested,
                data.order_id.clone(),
                "Cancellation requested".to_string(),
                data.reason.clone().unwrap_or_default(),
                StatusEffect::Set(OrderStatus::CancellationRequested),
            ),
            InboundEvent::CancellationApproved(data) => (
                NotificationKind::CancellationApproved,
                data.order_id.clone(),
                "Cancellation approved".to_string(),
                data.message.clone().unwrap_or_default(),
                StatusEffect::Set(OrderStatus::Cancelled),
            ),
            InboundEvent::ReturnRequested(data) => (
                NotificationKind::ReturnRequested,
                data.order_id.clone(),
                "Return requested".to_string(),
                format!("Order amount {:.2}", data.order_amount),
                StatusEffect::Set(OrderStatus::ReturnRequested),
            ),
            InboundEvent::ReturnApproved(data) => (
                NotificationKind::ReturnApproved,
                data.order_id.clone(),
                "Return approved".to_string(),
                data.message.clone().unwrap_or_default(),
                StatusEffect::Invalidate,
            ),
            other => return Err(unexpected(self.name(), other)),
        };

        self.apply_status(&order, effect).await;
        self.ctx
            .notifier
            .notify(kind, order.as_str(), title, body)
            .await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "OrderEventHandler"
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Rooms
// ════════════════════════════════════════════════════════════════════════════

/// Joins every room of the snapshot pushed after (re)connecting.
pub(crate) struct ActiveRoomsHandler {
    ctx: Arc<HubContext>,
}

impl ActiveRoomsHandler {
    pub(crate) fn new(ctx: Arc<HubContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl InboundHandler for ActiveRoomsHandler {
    async fn handle(&self, event: InboundEvent) -> Result<(), HubError> {
        let data = match event {
            InboundEvent::ActiveChatRooms(data) => data,
            other => return Err(unexpected(self.name(), &other)),
        };
        let joined = self
            .ctx
            .registry
            .lock()
            .await
            .apply_active_snapshot(&data.rooms)
            .await;
        debug!(snapshot = data.rooms.len(), joined = joined.len(), "Active rooms applied");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ActiveRoomsHandler"
    }
}

/// Joins a newly created room, then tells the admin about it.
pub(crate) struct NewChatRoomHandler {
    ctx: Arc<HubContext>,
}

impl NewChatRoomHandler {
    pub(crate) fn new(ctx: Arc<HubContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl InboundHandler for NewChatRoomHandler {
    async fn handle(&self, event: InboundEvent) -> Result<(), HubError> {
        let data = match event {
            InboundEvent::NewChatRoom(data) => data,
            other => return Err(unexpected(self.name(), &other)),
        };

        // Join first so nothing sent to the room right after is missed.
        let joined = self.ctx.registry.lock().await.on_room_created(&data.room).await;
        if let Err(e) = &joined {
            warn!(room = %data.room, error = %e, "Auto-join of new room failed");
        }

        self.ctx
            .notifier
            .notify(
                NotificationKind::NewChatRoom,
                data.room.as_str(),
                "New chat",
                format!("Customer {} started a conversation", data.user_id),
            )
            .await;

        joined.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "NewChatRoomHandler"
    }
}

/// Forgets a room the server closed, including its unread counter.
pub(crate) struct RoomClosedHandler {
    ctx: Arc<HubContext>,
}

impl RoomClosedHandler {
    pub(crate) fn new(ctx: Arc<HubContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl InboundHandler for RoomClosedHandler {
    async fn handle(&self, event: InboundEvent) -> Result<(), HubError> {
        let data = match event {
            InboundEvent::ChatRoomClosed(data) => data,
            other => return Err(unexpected(self.name(), &other)),
        };
        self.ctx.registry.lock().await.on_room_closed(&data.room);
        self.ctx.older_pages.cancel(&data.room).await;
        self.ctx.store.lock().await.remove_room(&data.room).await
    }

    fn name(&self) -> &'static str {
        "RoomClosedHandler"
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Messages
// ════════════════════════════════════════════════════════════════════════════

/// Merges the initial page sent after joining a room.
pub(crate) struct RoomMessagesHandler {
    ctx: Arc<HubContext>,
}

impl RoomMessagesHandler {
    pub(crate) fn new(ctx: Arc<HubContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl InboundHandler for RoomMessagesHandler {
    async fn handle(&self, event: InboundEvent) -> Result<(), HubError> {
        let data = match event {
            InboundEvent::RoomMessages(data) => data,
            other => return Err(unexpected(self.name(), &other)),
        };
        let latest = data.messages.iter().map(|m| m.timestamp).max();

        self.ctx
            .store
            .lock()
            .await
            .apply_initial(&data.room, data.messages);
        if let Some(at) = latest {
            self.ctx.registry.lock().await.touch(&data.room, at);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "RoomMessagesHandler"
    }
}

/// Hands an `olderMessages` response to the `load_older` call waiting for it.
pub(crate) struct OlderMessagesHandler {
    ctx: Arc<HubContext>,
}

impl OlderMessagesHandler {
    pub(crate) fn new(ctx: Arc<HubContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl InboundHandler for OlderMessagesHandler {
    async fn handle(&self, event: InboundEvent) -> Result<(), HubError> {
        let data = match event {
            InboundEvent::OlderMessages(data) => data,
            other => return Err(unexpected(self.name(), &other)),
        };
        if !self.ctx.older_pages.complete(&data.room, data.messages).await {
            debug!(room = %data.room, "Unsolicited older page discarded");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "OlderMessagesHandler"
    }
}

/// Appends live messages, counts them as unread and notifies.
pub(crate) struct LiveMessageHandler {
    ctx: Arc<HubContext>,
}

impl LiveMessageHandler {
    pub(crate) fn new(ctx: Arc<HubContext>) -> Self {
        Self { ctx }
    }

    async fn notify_arrival(&self, room: &RoomId, message: &ChatMessage) {
        self.ctx
            .notifier
            .notify(
                NotificationKind::ChatMessage,
                room.as_str(),
                format!("New message in {}", room),
                message.body.clone(),
            )
            .await;
    }
}

#[async_trait]
impl InboundHandler for LiveMessageHandler {
    async fn handle(&self, event: InboundEvent) -> Result<(), HubError> {
        let message = match event {
            InboundEvent::Message(message) => message,
            other => return Err(unexpected(self.name(), &other)),
        };
        let room = message.room.clone();

        if self.ctx.registry.lock().await.is_closed(&room) {
            debug!(room = %room, message_id = %message.id, "Message for closed room dropped");
            return Ok(());
        }

        let unread = {
            let mut store = self.ctx.store.lock().await;
            let outcome = store.append_live(message.clone());
            if !outcome.appended {
                debug!(room = %room, message_id = %message.id, "Duplicate live message ignored");
                return Ok(());
            }
            store.record_arrival(&message).await?
        };

        self.ctx.registry.lock().await.touch(&room, message.timestamp);
        if unread.is_some() {
            self.notify_arrival(&room, &message).await;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LiveMessageHandler"
    }
}
