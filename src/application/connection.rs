//! Transport connection lifecycle.
//!
//! Owns at most one live link per session. The link runs in a background
//! task that multiplexes outbound frames, inbound frames and a shutdown
//! signal with `tokio::select!`, forwarding everything it receives to the
//! hub's event queue as [`LinkEvent`]s.
//!
//! # Generations
//!
//! Every connect attempt and every `disconnect()` bumps a generation
//! counter. Frames are tagged with the generation of the link that read
//! them, so anything still queued from a torn-down link can be recognised
//! and dropped.
//!
//! Nothing here reconnects on its own. A lost link moves the state to
//! `Disconnected` and the caller decides when to `connect()` again.

use secrecy::Secret;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::adapters::websocket::OutboundCommand;
use crate::ports::{Transport, TransportConnector};

use super::error::ConnectionError;

/// Connectivity of the session's link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What the link task reports to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Frame { generation: u64, text: String },
    /// The link failed or the server closed it.
    Lost { generation: u64, reason: String },
}

struct LinkHandle {
    generation: u64,
    outbound: mpsc::UnboundedSender<String>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

pub struct TransportConnection {
    connector: Arc<dyn TransportConnector>,
    state: Arc<watch::Sender<ConnectionState>>,
    generation: Arc<AtomicU64>,
    link: Mutex<Option<LinkHandle>>,
    events: mpsc::Sender<LinkEvent>,
    shutdown_timeout: Duration,
}

impl TransportConnection {
    pub fn new(
        connector: Arc<dyn TransportConnector>,
        events: mpsc::Sender<LinkEvent>,
        shutdown_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            link: Mutex::new(None),
            events,
            shutdown_timeout,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Receiver that observes every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Generation of the current (or most recent) link.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Establish the link unless one is already up or being set up.
    ///
    /// Returns `Ok(true)` when this call opened the link and `Ok(false)` when
    /// it was a no-op because a connect was in flight or already done.
    pub async fn connect(&self, identity_token: &Secret<String>) -> Result<bool, ConnectionError> {
        let claimed = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Disconnected {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if !claimed {
            debug!(state = ?self.state(), "connect() ignored, link already up or in flight");
            return Ok(false);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, "Connecting to messaging backend");

        let mut transport = match self.connector.connect(identity_token).await {
            Ok(transport) => transport,
            Err(e) => {
                self.reset_if_current(generation);
                warn!(generation, error = %e, "Handshake failed");
                return Err(e.into());
            }
        };

        let mut link = self.link.lock().await;
        if self.generation() != generation {
            drop(link);
            let _ = transport.close().await;
            info!(generation, "Connect aborted by disconnect");
            return Err(ConnectionError::Aborted);
        }

        if let Some(stale) = link.take() {
            stale.task.abort();
        }

        // Must precede the spawn: a link that dies at once then moves
        // Connected to Disconnected, never the reverse.
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Connected;
                true
            } else {
                false
            }
        });

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(link_loop(
            transport,
            outbound_rx,
            shutdown_rx,
            self.events.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.generation),
            generation,
        ));
        *link = Some(LinkHandle {
            generation,
            outbound: outbound_tx,
            shutdown: Some(shutdown_tx),
            task,
        });
        drop(link);

        info!(generation, "Connected");
        Ok(true)
    }

    /// Send a command iff the link is connected.
    ///
    /// Returns false when not connected or the command could not be queued;
    /// the caller decides whether to retry.
    pub async fn emit(&self, command: &OutboundCommand) -> bool {
        if !self.is_connected() {
            debug!(event = command.event_name(), "emit skipped, not connected");
            return false;
        }

        let frame = match command.encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!(event = command.event_name(), error = %e, "Failed to encode command");
                return false;
            }
        };

        let link = self.link.lock().await;
        match link.as_ref() {
            Some(handle) if handle.generation == self.generation() => {
                let sent = handle.outbound.send(frame).is_ok();
                if sent {
                    debug!(event = command.event_name(), "Command queued");
                }
                sent
            }
            _ => false,
        }
    }

    /// Tear down the link.
    ///
    /// Requests a graceful close and aborts the link task if it does not
    /// finish within the shutdown timeout. Safe to call when not connected.
    pub async fn disconnect(&self) {
        let handle = {
            let mut link = self.link.lock().await;
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.state.send_replace(ConnectionState::Disconnected);
            link.take()
        };

        let Some(mut handle) = handle else {
            return;
        };
        info!(generation = handle.generation, "Disconnecting");

        if let Some(shutdown) = handle.shutdown.take() {
            let _ = shutdown.send(());
        }

        match tokio::time::timeout(self.shutdown_timeout, &mut handle.task).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => warn!(error = %join_err, "Link task terminated abnormally"),
            Err(_) => {
                warn!("Link task did not exit within timeout, aborting");
                handle.task.abort();
            }
        }
    }

    fn reset_if_current(&self, generation: u64) {
        let current = &self.generation;
        self.state.send_if_modified(|state| {
            if current.load(Ordering::SeqCst) == generation
                && *state != ConnectionState::Disconnected
            {
                *state = ConnectionState::Disconnected;
                true
            } else {
                false
            }
        });
    }
}

impl Drop for TransportConnection {
    fn drop(&mut self) {
        if let Ok(mut link) = self.link.try_lock() {
            if let Some(handle) = link.take() {
                handle.task.abort();
            }
        }
    }
}

async fn link_loop(
    mut transport: Box<dyn Transport>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut shutdown: oneshot::Receiver<()>,
    events: mpsc::Sender<LinkEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    current_generation: Arc<AtomicU64>,
    generation: u64,
) {
    debug!(generation, "Link task started");

    let lost_reason = loop {
        tokio::select! {
            _ = &mut shutdown => {
                let _ = transport.close().await;
                debug!(generation, "Link closed on request");
                return;
            }

            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = transport.send(frame).await {
                        break format!("send failed: {}", e);
                    }
                }
                None => {
                    let _ = transport.close().await;
                    return;
                }
            },

            incoming = transport.recv() => match incoming {
                Some(Ok(text)) => {
                    if events.send(LinkEvent::Frame { generation, text }).await.is_err() {
                        debug!(generation, "Event queue closed, stopping link task");
                        let _ = transport.close().await;
                        return;
                    }
                }
                Some(Err(e)) => break format!("receive failed: {}", e),
                None => break "closed by server".to_string(),
            },
        }
    };

    warn!(generation, reason = %lost_reason, "Link lost");
    state.send_if_modified(|s| {
        if current_generation.load(Ordering::SeqCst) == generation
            && *s != ConnectionState::Disconnected
        {
            *s = ConnectionState::Disconnected;
            true
        } else {
            false
        }
    });
    let _ = events
        .send(LinkEvent::Lost {
            generation,
            reason: lost_reason,
        })
        .await;
}
