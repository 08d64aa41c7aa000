//! Room registry - which rooms this client is subscribed to.
//!
//! The client is a member of a room if and only if the room is in the
//! active set. Server-side membership does not survive a transport loss,
//! so on loss the active set is moved to a remembered set and re-joined on
//! the next connect.
//!
//! Rooms the server closed are tracked until joined again, so stragglers
//! pushed after the close can be told apart from traffic of a live room.
//!
//! Every change to the active set is broadcast as a [`RoomListChanged`]
//! snapshot so any number of UI listeners can follow along.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::adapters::websocket::OutboundCommand;
use crate::domain::chat::{RoomId, RoomSummary};
use crate::domain::foundation::Timestamp;

use super::connection::TransportConnection;
use super::error::HubError;

/// Snapshot of joined rooms after a change, most recently active first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListChanged {
    pub rooms: Vec<RoomSummary>,
}

pub struct RoomRegistry {
    active: HashMap<RoomId, RoomSummary>,
    remembered: BTreeSet<RoomId>,
    closed: HashSet<RoomId>,
    connection: Arc<TransportConnection>,
    changes: broadcast::Sender<RoomListChanged>,
}

impl RoomRegistry {
    pub fn new(connection: Arc<TransportConnection>, channel_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            active: HashMap::new(),
            remembered: BTreeSet::new(),
            closed: HashSet::new(),
            connection,
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomListChanged> {
        self.changes.subscribe()
    }

    pub fn is_joined(&self, room: &RoomId) -> bool {
        self.active.contains_key(room)
    }

    /// True once the server closed `room` and it has not been joined since.
    pub fn is_closed(&self, room: &RoomId) -> bool {
        self.closed.contains(room)
    }

    /// Joined rooms, most recently active first.
    pub fn active_rooms(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self.active.values().cloned().collect();
        rooms.sort_by(|a, b| {
            b.last_activity
                .cmp(&a.last_activity)
                .then_with(|| a.room.cmp(&b.room))
        });
        rooms
    }

    /// Rooms to re-join on the next connect.
    pub fn remembered_rooms(&self) -> Vec<RoomId> {
        self.remembered.iter().cloned().collect()
    }

    /// Join `room`. Joining an already-joined room sends nothing.
    ///
    /// Returns `Ok(true)` when a join request was sent. When the request
    /// cannot be sent the room is not added.
    pub async fn join(&mut self, room: &RoomId) -> Result<bool, HubError> {
        if self.active.contains_key(room) {
            debug!(room = %room, "Already joined");
            return Ok(false);
        }

        let command = OutboundCommand::JoinRoom { room: room.clone() };
        if !self.connection.emit(&command).await {
            return Err(HubError::NotConnected);
        }

        let now = Timestamp::now();
        self.active.insert(
            room.clone(),
            RoomSummary {
                room: room.clone(),
                joined_at: now,
                last_activity: now,
            },
        );
        self.remembered.remove(room);
        self.closed.remove(room);
        info!(room = %room, "Joined room");
        self.publish();
        Ok(true)
    }

    /// Leave `room`. Returns false if it was not joined.
    ///
    /// The room is dropped locally even when disconnected; the server
    /// forgets transport-level membership on its own.
    pub async fn leave(&mut self, room: &RoomId) -> bool {
        let was_remembered = self.remembered.remove(room);
        if self.active.remove(room).is_none() {
            return was_remembered;
        }

        let command = OutboundCommand::LeaveRoom { room: room.clone() };
        if !self.connection.emit(&command).await {
            debug!(room = %room, "Leave request not sent, not connected");
        }
        info!(room = %room, "Left room");
        self.publish();
        true
    }

    /// Join every room of a server snapshot that is not joined yet.
    ///
    /// Returns the rooms that were newly joined.
    pub async fn apply_active_snapshot(&mut self, rooms: &[RoomId]) -> Vec<RoomId> {
        let mut joined = Vec::new();
        for room in rooms {
            match self.join(room).await {
                Ok(true) => joined.push(room.clone()),
                Ok(false) => {}
                Err(e) => warn!(room = %room, error = %e, "Could not join room from snapshot"),
            }
        }
        joined
    }

    /// Auto-join a room the server just created.
    pub async fn on_room_created(&mut self, room: &RoomId) -> Result<bool, HubError> {
        self.join(room).await
    }

    /// Forget a room the server closed. Returns false if it was unknown.
    pub fn on_room_closed(&mut self, room: &RoomId) -> bool {
        self.closed.insert(room.clone());
        let was_remembered = self.remembered.remove(room);
        if self.active.remove(room).is_some() {
            info!(room = %room, "Room closed by server");
            self.publish();
            return true;
        }
        was_remembered
    }

    /// Record activity in a joined room.
    pub fn touch(&mut self, room: &RoomId, at: Timestamp) {
        if let Some(summary) = self.active.get_mut(room) {
            if at.is_after(&summary.last_activity) {
                summary.last_activity = at;
                self.publish();
            }
        }
    }

    /// The link is gone, and with it every server-side membership.
    pub fn on_transport_lost(&mut self) {
        if self.active.is_empty() {
            return;
        }
        let rooms: Vec<RoomId> = self.active.drain().map(|(room, _)| room).collect();
        info!(count = rooms.len(), "Membership lost with transport, remembering rooms");
        self.remembered.extend(rooms);
        self.publish();
    }

    /// Re-join every remembered room. Returns the rooms joined.
    pub async fn rejoin_remembered(&mut self) -> Vec<RoomId> {
        let rooms = self.remembered_rooms();
        self.apply_active_snapshot(&rooms).await
    }

    fn publish(&self) {
        // No receivers is fine; nobody is listening yet.
        let _ = self.changes.send(RoomListChanged {
            rooms: self.active_rooms(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::channel::{ChannelConnector, ServerSession};
    use secrecy::Secret;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Fixture {
        connector: Arc<ChannelConnector>,
        connection: Arc<TransportConnection>,
        registry: RoomRegistry,
        _events: mpsc::Receiver<super::super::connection::LinkEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            let connector = Arc::new(ChannelConnector::new());
            let (events_tx, events_rx) = mpsc::channel(16);
            let connection = Arc::new(TransportConnection::new(
                connector.clone(),
                events_tx,
                Duration::from_millis(100),
            ));
            let registry = RoomRegistry::new(Arc::clone(&connection), 16);
            Self {
                connector,
                connection,
                registry,
                _events: events_rx,
            }
        }

        async fn connect(&self) -> ServerSession {
            self.connection
                .connect(&Secret::new("token".to_string()))
                .await
                .unwrap();
            self.connector.accept().await.unwrap()
        }
    }

    fn room(name: &str) -> RoomId {
        RoomId::new(name).unwrap()
    }

    #[tokio::test]
    async fn join_twice_sends_one_request() {
        let mut f = Fixture::new();
        let mut server = f.connect().await;

        assert!(f.registry.join(&room("chat_user42")).await.unwrap());
        assert!(!f.registry.join(&room("chat_user42")).await.unwrap());
        assert!(f.connection.emit(&OutboundCommand::GetActiveRooms).await);

        assert_eq!(
            server.next_command().await,
            Some(OutboundCommand::JoinRoom {
                room: room("chat_user42")
            })
        );
        // The marker follows directly: no second join was sent.
        assert_eq!(server.next_command().await, Some(OutboundCommand::GetActiveRooms));
        assert_eq!(f.registry.active_rooms().len(), 1);
    }

    #[tokio::test]
    async fn join_while_disconnected_fails_without_adding() {
        let mut f = Fixture::new();

        let result = f.registry.join(&room("chat_a")).await;
        assert!(matches!(result, Err(HubError::NotConnected)));
        assert!(!f.registry.is_joined(&room("chat_a")));
    }

    #[tokio::test]
    async fn snapshot_joins_only_missing_rooms() {
        let mut f = Fixture::new();
        let mut server = f.connect().await;
        f.registry.join(&room("chat_a")).await.unwrap();
        server.next_command().await;

        let joined = f
            .registry
            .apply_active_snapshot(&[room("chat_a"), room("chat_b"), room("chat_c")])
            .await;

        assert_eq!(joined, vec![room("chat_b"), room("chat_c")]);
        assert_eq!(f.registry.active_rooms().len(), 3);
        assert_eq!(
            server.next_command().await,
            Some(OutboundCommand::JoinRoom { room: room("chat_b") })
        );
        assert_eq!(
            server.next_command().await,
            Some(OutboundCommand::JoinRoom { room: room("chat_c") })
        );
    }

    #[tokio::test]
    async fn room_closed_removes_membership() {
        let mut f = Fixture::new();
        let _server = f.connect().await;
        f.registry.on_room_created(&room("chat_a")).await.unwrap();

        assert!(f.registry.on_room_closed(&room("chat_a")));
        assert!(!f.registry.is_joined(&room("chat_a")));
        assert!(!f.registry.on_room_closed(&room("chat_a")));
        assert!(f.registry.is_closed(&room("chat_a")));
    }

    #[tokio::test]
    async fn joining_a_closed_room_again_reopens_it() {
        let mut f = Fixture::new();
        let _server = f.connect().await;
        f.registry.on_room_created(&room("chat_a")).await.unwrap();
        f.registry.on_room_closed(&room("chat_a"));

        assert!(f.registry.on_room_created(&room("chat_a")).await.unwrap());
        assert!(!f.registry.is_closed(&room("chat_a")));
        assert!(f.registry.is_joined(&room("chat_a")));
    }

    #[tokio::test]
    async fn transport_loss_remembers_and_rejoin_restores() {
        let mut f = Fixture::new();
        let _server = f.connect().await;
        f.registry.join(&room("chat_a")).await.unwrap();
        f.registry.join(&room("chat_b")).await.unwrap();

        f.registry.on_transport_lost();
        assert!(f.registry.active_rooms().is_empty());
        assert_eq!(f.registry.remembered_rooms(), vec![room("chat_a"), room("chat_b")]);

        f.connection.disconnect().await;
        let mut server = f.connect().await;
        let rejoined = f.registry.rejoin_remembered().await;

        assert_eq!(rejoined, vec![room("chat_a"), room("chat_b")]);
        assert!(f.registry.remembered_rooms().is_empty());
        assert_eq!(
            server.next_command().await,
            Some(OutboundCommand::JoinRoom { room: room("chat_a") })
        );
        assert_eq!(
            server.next_command().await,
            Some(OutboundCommand::JoinRoom { room: room("chat_b") })
        );
    }

    #[tokio::test]
    async fn changes_are_broadcast() {
        let mut f = Fixture::new();
        let _server = f.connect().await;
        let mut changes = f.registry.subscribe();

        f.registry.join(&room("chat_a")).await.unwrap();
        let change = changes.recv().await.unwrap();
        assert_eq!(change.rooms.len(), 1);
        assert_eq!(change.rooms[0].room, room("chat_a"));

        f.registry.leave(&room("chat_a")).await;
        assert!(changes.recv().await.unwrap().rooms.is_empty());
    }

    #[tokio::test]
    async fn touch_orders_rooms_by_activity() {
        let mut f = Fixture::new();
        let _server = f.connect().await;
        f.registry.join(&room("chat_a")).await.unwrap();
        f.registry.join(&room("chat_b")).await.unwrap();

        f.registry.touch(&room("chat_a"), Timestamp::now().plus_secs(60));

        let rooms = f.registry.active_rooms();
        assert_eq!(rooms[0].room, room("chat_a"));
    }
}
