//! Admin hub - one real-time session of the back office.
//!
//! `AdminHub` owns the transport connection, the dispatcher and all session
//! state. Inbound frames are processed one at a time by a single event pump
//! task; everything the UI layer needs is exposed as methods and broadcast
//! subscriptions.
//!
//! # Lifecycle
//!
//! ```ignore
//! let hub = AdminHub::start(config.hub, connector, unread_store).await?
//!     .with_order_engine(engine);
//! let mut notifications = hub.on_notification();
//!
//! hub.connect(&config.auth.identity_token).await?;
//! // ...
//! hub.shutdown().await;
//! ```

use once_cell::sync::OnceCell;
use secrecy::Secret;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::adapters::websocket::{InboundEvent, OutboundCommand};
use crate::config::HubConfig;
use crate::domain::chat::{ChatMessage, RoomId, RoomSummary, ScrollAction, ScrollPosition};
use crate::domain::foundation::ValidationError;
use crate::domain::notification::Notification;
use crate::ports::{TransportConnector, UnreadCountStore};

use super::connection::{ConnectionState, LinkEvent, TransportConnection};
use super::dispatcher::EventDispatcher;
use super::error::HubError;
use super::handlers::register_all;
use super::message_store::{LoadOlderOutcome, MessageStore, OlderPageRequests};
use super::notifier::Notifier;
use super::order_status::OrderStatusTransitionEngine;
use super::room_registry::{RoomListChanged, RoomRegistry};

/// Session state shared by the hub and its inbound handlers.
pub(crate) struct HubContext {
    pub(crate) registry: Mutex<RoomRegistry>,
    pub(crate) store: Mutex<MessageStore>,
    pub(crate) notifier: Notifier,
    pub(crate) older_pages: OlderPageRequests,
    pub(crate) orders: OnceCell<Arc<OrderStatusTransitionEngine>>,
}

impl HubContext {
    pub(crate) fn new(
        config: &HubConfig,
        connection: Arc<TransportConnection>,
        store: MessageStore,
    ) -> Self {
        Self {
            registry: Mutex::new(RoomRegistry::new(connection, config.event_channel_capacity)),
            store: Mutex::new(store),
            notifier: Notifier::new(config.dedup_window(), config.event_channel_capacity),
            older_pages: OlderPageRequests::new(),
            orders: OnceCell::new(),
        }
    }
}

pub struct AdminHub {
    config: HubConfig,
    admin_room: RoomId,
    connection: Arc<TransportConnection>,
    dispatcher: Arc<EventDispatcher>,
    ctx: Arc<HubContext>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl AdminHub {
    /// Restore unread counts and start the event pump. Does not connect.
    pub async fn start(
        config: HubConfig,
        connector: Arc<dyn TransportConnector>,
        unread_store: Arc<dyn UnreadCountStore>,
    ) -> Result<Self, HubError> {
        let admin_room = RoomId::new(config.admin_room.clone())?;
        let (events_tx, events_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let connection = Arc::new(TransportConnection::new(
            connector,
            events_tx,
            config.shutdown_timeout(),
        ));
        let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&connection)));
        let store = MessageStore::load(unread_store, config.history_page_size).await?;
        let ctx = Arc::new(HubContext::new(&config, Arc::clone(&connection), store));

        let pump = tokio::spawn(run_event_pump(
            events_rx,
            Arc::clone(&connection),
            Arc::clone(&dispatcher),
            Arc::clone(&ctx),
        ));
        info!(server_url = %config.server_url, "Admin hub started");

        Ok(Self {
            config,
            admin_room,
            connection,
            dispatcher,
            ctx,
            pump: Mutex::new(Some(pump)),
        })
    }

    /// Attach the order status engine so order events keep its cache current.
    pub fn with_order_engine(self, engine: Arc<OrderStatusTransitionEngine>) -> Self {
        if self.ctx.orders.set(engine).is_err() {
            warn!("Order engine already attached, keeping the first one");
        }
        self
    }

    pub fn order_engine(&self) -> Option<Arc<OrderStatusTransitionEngine>> {
        self.ctx.orders.get().cloned()
    }

    // ════════════════════════════════════════════════════════════════════════
    // Connection
    // ════════════════════════════════════════════════════════════════════════

    /// Connect and subscribe. A no-op while connected or connecting.
    ///
    /// Handlers are bound before the link opens so nothing pushed right
    /// after the handshake is missed. After connecting, the admin room and
    /// every room remembered from a lost link are joined, and the active
    /// room snapshot is requested.
    pub async fn connect(&self, identity_token: &Secret<String>) -> Result<(), HubError> {
        register_all(&self.dispatcher, &self.ctx).await;

        if !self.connection.connect(identity_token).await? {
            return Ok(());
        }

        let join_admin = OutboundCommand::JoinRoom {
            room: self.admin_room.clone(),
        };
        if !self.connection.emit(&join_admin).await {
            return Err(HubError::NotConnected);
        }

        let rejoined = self.ctx.registry.lock().await.rejoin_remembered().await;
        if !rejoined.is_empty() {
            info!(count = rejoined.len(), "Re-joined rooms after reconnect");
        }

        if !self.connection.emit(&OutboundCommand::GetActiveRooms).await {
            return Err(HubError::NotConnected);
        }
        Ok(())
    }

    /// Unbind every handler and close the transport.
    ///
    /// Joined rooms are remembered and re-joined by the next `connect()`.
    pub async fn disconnect(&self) {
        let unbound = self.dispatcher.clear().await;
        self.connection.disconnect().await;
        let abandoned = self.ctx.older_pages.clear().await;
        self.ctx.registry.lock().await.on_transport_lost();
        debug!(unbound, abandoned, "Hub disconnected");
    }

    /// Disconnect and stop the event pump. The hub is unusable afterwards.
    pub async fn shutdown(&self) {
        self.disconnect().await;
        if let Some(pump) = self.pump.lock().await.take() {
            pump.abort();
        }
        info!("Admin hub shut down");
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn watch_connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe_state()
    }

    /// Whether the inbound handlers are currently bound.
    pub fn handlers_registered(&self) -> bool {
        self.dispatcher.is_registered()
    }

    // ════════════════════════════════════════════════════════════════════════
    // Rooms and messages
    // ════════════════════════════════════════════════════════════════════════

    pub async fn join(&self, room: &RoomId) -> Result<bool, HubError> {
        self.ctx.registry.lock().await.join(room).await
    }

    pub async fn leave(&self, room: &RoomId) -> bool {
        self.ctx.registry.lock().await.leave(room).await
    }

    pub async fn active_rooms(&self) -> Vec<RoomSummary> {
        self.ctx.registry.lock().await.active_rooms()
    }

    /// Send a chat message. Fails instead of dropping it when not connected.
    pub async fn send_message(&self, room: &RoomId, body: &str) -> Result<(), HubError> {
        if body.trim().is_empty() {
            return Err(ValidationError::empty_field("body").into());
        }
        if !self.connection.is_connected() {
            return Err(HubError::NotConnected);
        }

        let command = OutboundCommand::SendMessage {
            room: room.clone(),
            body: body.to_string(),
        };
        if !self.connection.emit(&command).await {
            return Err(HubError::NotConnected);
        }
        Ok(())
    }

    /// Make `room` the viewed room (or none). Its counter is zeroed and any
    /// older-page load of the previous room is abandoned.
    pub async fn view_room(&self, room: Option<RoomId>) -> Result<(), HubError> {
        let mut store = self.ctx.store.lock().await;
        if let Some(previous) = store.viewed_room().cloned() {
            if room.as_ref() != Some(&previous) {
                self.ctx.older_pages.cancel(&previous).await;
            }
        }
        store.set_viewed(room).await
    }

    pub async fn viewed_room(&self) -> Option<RoomId> {
        self.ctx.store.lock().await.viewed_room().cloned()
    }

    pub async fn mark_viewed(&self, room: &RoomId) -> Result<(), HubError> {
        self.ctx.store.lock().await.mark_viewed(room).await
    }

    /// Fetch the page of messages older than the oldest one loaded.
    pub async fn load_older(&self, room: &RoomId) -> Result<LoadOlderOutcome, HubError> {
        let ticket = self.ctx.store.lock().await.begin_load_older(room);
        let Some(ticket) = ticket else {
            return Ok(LoadOlderOutcome::Skipped);
        };
        let started = Instant::now();

        let response = self.ctx.older_pages.register(room).await;
        let request = OutboundCommand::GetOlderMessages {
            room: room.clone(),
            before: ticket.before,
        };
        if !self.connection.emit(&request).await {
            self.ctx.older_pages.cancel(room).await;
            self.ctx.store.lock().await.cancel_older(&ticket);
            return Err(HubError::NotConnected);
        }

        let messages = match tokio::time::timeout(self.config.request_timeout(), response).await {
            Ok(Ok(messages)) => messages,
            Ok(Err(_)) => {
                debug!(room = %room, "Older page request abandoned");
                self.ctx.store.lock().await.cancel_older(&ticket);
                return Ok(LoadOlderOutcome::Discarded);
            }
            Err(_) => {
                self.ctx.older_pages.cancel(room).await;
                self.ctx.store.lock().await.cancel_older(&ticket);
                warn!(room = %room, "Older page request timed out");
                return Err(HubError::Timeout);
            }
        };

        if let Some(floor) = self.config.min_load_older_latency() {
            let elapsed = started.elapsed();
            if elapsed < floor {
                tokio::time::sleep(floor - elapsed).await;
            }
        }

        match self.ctx.store.lock().await.apply_older(&ticket, messages) {
            Ok(page) => Ok(LoadOlderOutcome::Loaded(page)),
            Err(HubError::StaleResult { .. }) => Ok(LoadOlderOutcome::Discarded),
            Err(e) => Err(e),
        }
    }

    pub async fn record_scroll(&self, room: &RoomId, position: ScrollPosition) -> ScrollAction {
        self.ctx.store.lock().await.record_scroll(room, position)
    }

    /// Loaded messages of `room`, oldest first.
    pub async fn history(&self, room: &RoomId) -> Vec<ChatMessage> {
        self.ctx
            .store
            .lock()
            .await
            .history(room)
            .map(|h| h.messages().to_vec())
            .unwrap_or_default()
    }

    pub async fn has_more(&self, room: &RoomId) -> bool {
        self.ctx
            .store
            .lock()
            .await
            .history(room)
            .map_or(true, |h| h.has_more())
    }

    pub async fn unread_count(&self, room: &RoomId) -> u32 {
        self.ctx.store.lock().await.unread_count(room)
    }

    pub async fn total_unread_count(&self) -> u32 {
        self.ctx.store.lock().await.total_unread()
    }

    // ════════════════════════════════════════════════════════════════════════
    // Subscriptions
    // ════════════════════════════════════════════════════════════════════════

    pub fn on_notification(&self) -> broadcast::Receiver<Notification> {
        self.ctx.notifier.subscribe()
    }

    pub async fn on_room_list_changed(&self) -> broadcast::Receiver<RoomListChanged> {
        self.ctx.registry.lock().await.subscribe()
    }
}

impl Drop for AdminHub {
    fn drop(&mut self) {
        if let Ok(mut pump) = self.pump.try_lock() {
            if let Some(handle) = pump.take() {
                handle.abort();
            }
        }
    }
}

/// Processes link events strictly one at a time.
async fn run_event_pump(
    mut events: mpsc::Receiver<LinkEvent>,
    connection: Arc<TransportConnection>,
    dispatcher: Arc<EventDispatcher>,
    ctx: Arc<HubContext>,
) {
    while let Some(event) = events.recv().await {
        match event {
            LinkEvent::Frame { generation, text } => {
                if generation != connection.generation() {
                    debug!(generation, "Frame from torn-down link discarded");
                    continue;
                }
                match InboundEvent::decode(&text) {
                    Ok(event) => {
                        dispatcher.dispatch(event).await;
                    }
                    Err(e) => warn!(error = %e, "Undecodable frame dropped"),
                }
            }
            LinkEvent::Lost { generation, reason } => {
                if generation != connection.generation() {
                    continue;
                }
                warn!(generation, reason = %reason, "Transport lost, room membership dropped");
                ctx.older_pages.clear().await;
                ctx.registry.lock().await.on_transport_lost();
            }
        }
    }
    debug!("Event pump stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::channel::ChannelConnector;
    use crate::adapters::storage::InMemoryUnreadCountStore;

    async fn hub() -> (AdminHub, Arc<ChannelConnector>) {
        let connector = Arc::new(ChannelConnector::new());
        let hub = AdminHub::start(
            HubConfig::new("ws://localhost:9000"),
            connector.clone(),
            Arc::new(InMemoryUnreadCountStore::new()),
        )
        .await
        .unwrap();
        (hub, connector)
    }

    fn room(name: &str) -> RoomId {
        RoomId::new(name).unwrap()
    }

    #[tokio::test]
    async fn send_while_disconnected_reports_failure() {
        let (hub, _) = hub().await;
        let result = hub.send_message(&room("chat_a"), "hello").await;
        assert!(matches!(result, Err(HubError::NotConnected)));
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let (hub, _) = hub().await;
        let result = hub.send_message(&room("chat_a"), "   ").await;
        assert!(matches!(result, Err(HubError::Validation(_))));
    }

    #[tokio::test]
    async fn connect_binds_handlers_and_subscribes() {
        let (hub, connector) = hub().await;
        hub.connect(&Secret::new("token".to_string())).await.unwrap();
        let mut server = connector.accept().await.unwrap();

        assert!(hub.handlers_registered());
        assert_eq!(hub.connection_state(), ConnectionState::Connected);
        assert_eq!(
            server.next_command().await,
            Some(OutboundCommand::JoinRoom {
                room: room("admin_room")
            })
        );
        assert_eq!(server.next_command().await, Some(OutboundCommand::GetActiveRooms));
    }

    #[tokio::test]
    async fn disconnect_unbinds_handlers() {
        let (hub, _connector) = hub().await;
        hub.connect(&Secret::new("token".to_string())).await.unwrap();

        hub.disconnect().await;

        assert!(!hub.handlers_registered());
        assert_eq!(hub.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn load_older_without_history_is_skipped() {
        let (hub, _) = hub().await;
        let outcome = hub.load_older(&room("chat_a")).await.unwrap();
        assert_eq!(outcome, LoadOlderOutcome::Skipped);
    }

    #[tokio::test]
    async fn invalid_admin_room_fails_start() {
        let mut config = HubConfig::new("ws://localhost:9000");
        config.admin_room = String::new();
        let result = AdminHub::start(
            config,
            Arc::new(ChannelConnector::new()),
            Arc::new(InMemoryUnreadCountStore::new()),
        )
        .await;
        assert!(matches!(result, Err(HubError::Validation(_))));
    }
}
