//! In-process transport over tokio channels.
//!
//! Stands in for the messaging backend in tests and local demos. Each
//! successful `connect()` yields a [`ServerSession`] on the connector side,
//! through which the "server" pushes frames to the client and reads the
//! commands the client sent.
//!
//! # Example
//!
//! ```ignore
//! let connector = Arc::new(ChannelConnector::new());
//! let hub = AdminHub::start(config, connector.clone(), store).await?;
//! hub.connect(&token).await?;
//!
//! let mut server = connector.accept().await.unwrap();
//! server.push(&InboundEvent::ActiveChatRooms(...));
//! assert_eq!(server.next_command().await, Some(OutboundCommand::GetActiveRooms));
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::adapters::websocket::{InboundEvent, OutboundCommand};
use crate::ports::{Transport, TransportConnector, TransportError};

enum ServerFrame {
    Text(String),
    Error(TransportError),
    Close,
}

/// Connector handing out channel-backed transports.
pub struct ChannelConnector {
    attempts: AtomicUsize,
    scripted_failures: Mutex<VecDeque<TransportError>>,
    sessions_tx: mpsc::UnboundedSender<ServerSession>,
    sessions_rx: Mutex<mpsc::UnboundedReceiver<ServerSession>>,
}

impl ChannelConnector {
    pub fn new() -> Self {
        let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();
        Self {
            attempts: AtomicUsize::new(0),
            scripted_failures: Mutex::new(VecDeque::new()),
            sessions_tx,
            sessions_rx: Mutex::new(sessions_rx),
        }
    }

    /// Make the next `connect()` fail with `error`.
    pub async fn fail_next(&self, error: TransportError) {
        self.scripted_failures.lock().await.push_back(error);
    }

    /// Number of `connect()` calls so far, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait for the next successfully opened link.
    pub async fn accept(&self) -> Option<ServerSession> {
        self.sessions_rx.lock().await.recv().await
    }
}

impl Default for ChannelConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportConnector for ChannelConnector {
    async fn connect(
        &self,
        identity_token: &Secret<String>,
    ) -> Result<Box<dyn Transport>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.scripted_failures.lock().await.pop_front() {
            return Err(error);
        }
        if identity_token.expose_secret().is_empty() {
            return Err(TransportError::Unauthorized);
        }

        let (to_client_tx, to_client_rx) = mpsc::unbounded_channel();
        let (to_server_tx, to_server_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let session = ServerSession {
            to_client: to_client_tx,
            from_client: to_server_rx,
            closed: Arc::clone(&closed),
            identity_token: identity_token.expose_secret().clone(),
        };
        self.sessions_tx
            .send(session)
            .map_err(|_| TransportError::Handshake("connector dropped".to_string()))?;

        Ok(Box::new(ChannelTransport {
            incoming: to_client_rx,
            outgoing: to_server_tx,
            closed,
        }))
    }
}

/// Client side of a channel link.
pub struct ChannelTransport {
    incoming: mpsc::UnboundedReceiver<ServerFrame>,
    outgoing: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.outgoing
            .send(frame)
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        match self.incoming.recv().await {
            Some(ServerFrame::Text(text)) => Some(Ok(text)),
            Some(ServerFrame::Error(error)) => Some(Err(error)),
            Some(ServerFrame::Close) | None => None,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Server side of a channel link.
pub struct ServerSession {
    to_client: mpsc::UnboundedSender<ServerFrame>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
    identity_token: String,
}

impl ServerSession {
    /// Push an event to the client. Returns false if the client side is gone.
    pub fn push(&self, event: &InboundEvent) -> bool {
        match event.encode() {
            Ok(frame) => self.push_raw(frame),
            Err(_) => false,
        }
    }

    /// Push an arbitrary text frame.
    pub fn push_raw(&self, frame: impl Into<String>) -> bool {
        self.to_client.send(ServerFrame::Text(frame.into())).is_ok()
    }

    /// Close the link from the server side.
    pub fn drop_link(&self) {
        let _ = self.to_client.send(ServerFrame::Close);
    }

    /// Fail the link with a transport error.
    pub fn fail(&self, error: TransportError) {
        let _ = self.to_client.send(ServerFrame::Error(error));
    }

    /// Next command sent by the client, waiting for it if necessary.
    ///
    /// Returns `None` once the client side is gone. Frames that are not
    /// valid commands are skipped.
    pub async fn next_command(&mut self) -> Option<OutboundCommand> {
        loop {
            let frame = self.from_client.recv().await?;
            if let Ok(command) = OutboundCommand::decode(&frame) {
                return Some(command);
            }
        }
    }

    /// Whether the client closed the link gracefully.
    pub fn is_closed_by_client(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn identity_token(&self) -> &str {
        &self.identity_token
    }
}
