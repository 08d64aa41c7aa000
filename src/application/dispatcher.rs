//! Event dispatcher - demultiplexes inbound events to handlers.
//!
//! Exactly one handler is active per event type. Registering a handler for
//! a type that already has one replaces it, so re-running the registration
//! (on reconnect, or from a UI that re-renders) can never make one inbound
//! event run twice.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::adapters::websocket::{InboundEvent, InboundEventType, OutboundCommand};

use super::connection::TransportConnection;
use super::error::HubError;

/// Handler for one or more inbound event types.
///
/// # Example
///
/// ```ignore
/// struct ActiveRoomsHandler { /* ... */ }
///
/// #[async_trait]
/// impl InboundHandler for ActiveRoomsHandler {
///     async fn handle(&self, event: InboundEvent) -> Result<(), HubError> {
///         // Join every room in the snapshot...
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "ActiveRoomsHandler"
///     }
/// }
/// ```
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, event: InboundEvent) -> Result<(), HubError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

pub struct EventDispatcher {
    handlers: RwLock<HashMap<InboundEventType, Arc<dyn InboundHandler>>>,
    registered: AtomicBool,
    connection: Arc<TransportConnection>,
}

impl EventDispatcher {
    pub fn new(connection: Arc<TransportConnection>) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            registered: AtomicBool::new(false),
            connection,
        }
    }

    /// Register `handler` for `event_type`, replacing any existing one.
    ///
    /// Returns the handler that was replaced.
    pub async fn on(
        &self,
        event_type: InboundEventType,
        handler: Arc<dyn InboundHandler>,
    ) -> Option<Arc<dyn InboundHandler>> {
        let name = handler.name();
        let previous = self.handlers.write().await.insert(event_type, handler);
        match &previous {
            Some(old) => debug!(event = %event_type, handler = name, replaced = old.name(), "Handler replaced"),
            None => debug!(event = %event_type, handler = name, "Handler registered"),
        }
        previous
    }

    /// Remove the handler for `event_type`.
    pub async fn off(&self, event_type: InboundEventType) -> Option<Arc<dyn InboundHandler>> {
        self.handlers.write().await.remove(&event_type)
    }

    /// Remove every handler. Returns how many were registered.
    pub async fn clear(&self) -> usize {
        let mut handlers = self.handlers.write().await;
        let count = handlers.len();
        handlers.clear();
        self.registered.store(false, Ordering::SeqCst);
        debug!(count, "All handlers unregistered");
        count
    }

    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }

    pub async fn has_handler(&self, event_type: InboundEventType) -> bool {
        self.handlers.read().await.contains_key(&event_type)
    }

    /// Whether the full handler set has been bound for this session.
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn mark_registered(&self) {
        self.registered.store(true, Ordering::SeqCst);
    }

    /// Route one event to its handler.
    ///
    /// Returns false when no handler is registered for the event's type.
    /// Handler failures are logged, not propagated: one bad event must not
    /// stop the pump.
    pub async fn dispatch(&self, event: InboundEvent) -> bool {
        let event_type = event.event_type();
        let handler = self.handlers.read().await.get(&event_type).cloned();

        let Some(handler) = handler else {
            debug!(event = %event_type, "No handler registered, event dropped");
            return false;
        };

        if let Err(e) = handler.handle(event).await {
            warn!(event = %event_type, handler = handler.name(), error = %e, "Handler failed");
        }
        true
    }

    /// Send a command on the transport iff it is connected.
    pub async fn emit(&self, command: &OutboundCommand) -> bool {
        self.connection.emit(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::channel::ChannelConnector;
    use crate::adapters::websocket::RoomData;
    use crate::domain::chat::RoomId;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct CountingHandler {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl CountingHandler {
        fn new(name: &'static str) -> (Arc<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Arc::new(Self {
                    name,
                    calls: Arc::clone(&calls),
                }),
                calls,
            )
        }
    }

    #[async_trait]
    impl InboundHandler for CountingHandler {
        async fn handle(&self, _event: InboundEvent) -> Result<(), HubError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl InboundHandler for FailingHandler {
        async fn handle(&self, _event: InboundEvent) -> Result<(), HubError> {
            Err(HubError::Protocol("boom".to_string()))
        }

        fn name(&self) -> &'static str {
            "FailingHandler"
        }
    }

    fn dispatcher() -> EventDispatcher {
        let (events_tx, _events_rx) = mpsc::channel(4);
        let connection = TransportConnection::new(
            Arc::new(ChannelConnector::new()),
            events_tx,
            Duration::from_millis(100),
        );
        EventDispatcher::new(Arc::new(connection))
    }

    fn room_closed() -> InboundEvent {
        InboundEvent::ChatRoomClosed(RoomData {
            room: RoomId::new("chat_a").unwrap(),
        })
    }

    #[tokio::test]
    async fn registering_twice_invokes_once_per_event() {
        let dispatcher = dispatcher();
        let (first, first_calls) = CountingHandler::new("first");
        let (second, second_calls) = CountingHandler::new("second");

        assert!(dispatcher
            .on(InboundEventType::ChatRoomClosed, first)
            .await
            .is_none());
        let replaced = dispatcher.on(InboundEventType::ChatRoomClosed, second).await;
        assert_eq!(replaced.map(|h| h.name()), Some("first"));

        assert!(dispatcher.dispatch(room_closed()).await);

        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.handler_count().await, 1);
    }

    #[tokio::test]
    async fn registering_same_handler_repeatedly_does_not_stack() {
        let dispatcher = dispatcher();
        let (handler, calls) = CountingHandler::new("same");

        for _ in 0..5 {
            dispatcher
                .on(InboundEventType::ChatRoomClosed, handler.clone())
                .await;
        }
        dispatcher.dispatch(room_closed()).await;
        dispatcher.dispatch(room_closed()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unhandled_event_is_dropped() {
        let dispatcher = dispatcher();
        assert!(!dispatcher.dispatch(room_closed()).await);
    }

    #[tokio::test]
    async fn clear_unregisters_everything() {
        let dispatcher = dispatcher();
        let (handler, calls) = CountingHandler::new("h");
        dispatcher
            .on(InboundEventType::ChatRoomClosed, handler.clone())
            .await;
        dispatcher.on(InboundEventType::NewChatRoom, handler).await;
        dispatcher.mark_registered();

        assert_eq!(dispatcher.clear().await, 2);
        assert!(!dispatcher.is_registered());
        assert!(!dispatcher.dispatch(room_closed()).await);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_failure_does_not_propagate() {
        let dispatcher = dispatcher();
        dispatcher
            .on(InboundEventType::ChatRoomClosed, Arc::new(FailingHandler))
            .await;
        assert!(dispatcher.dispatch(room_closed()).await);
    }

    #[tokio::test]
    async fn emit_reports_failure_when_disconnected() {
        let dispatcher = dispatcher();
        assert!(!dispatcher.emit(&OutboundCommand::GetActiveRooms).await);
    }

    #[tokio::test]
    async fn off_removes_single_handler() {
        let dispatcher = dispatcher();
        let (handler, _) = CountingHandler::new("h");
        dispatcher
            .on(InboundEventType::ChatRoomClosed, handler)
            .await;

        assert!(dispatcher.off(InboundEventType::ChatRoomClosed).await.is_some());
        assert!(!dispatcher.has_handler(InboundEventType::ChatRoomClosed).await);
    }
}
