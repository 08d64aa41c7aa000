//! Transport Port - Interface for the persistent bidirectional link.
//!
//! A transport carries text frames between the admin client and the
//! messaging backend. Framing and encoding of events happen above this
//! port; the transport only moves strings.

use async_trait::async_trait;
use secrecy::Secret;

/// Errors raised by a transport or while establishing one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Identity token rejected")]
    Unauthorized,

    #[error("Transport IO error: {0}")]
    Io(String),

    #[error("Transport closed")]
    Closed,
}

/// An open link. Owned by a single connection task.
#[async_trait]
pub trait Transport: Send {
    /// Send one text frame.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Receive the next text frame.
    ///
    /// Returns `None` once the remote side has closed the link.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the link gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports, performing the authentication handshake.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Open a new authenticated link.
    ///
    /// # Errors
    /// Returns `TransportError::Unauthorized` if the backend rejects the token,
    /// `TransportError::Handshake` for any other handshake failure.
    async fn connect(
        &self,
        identity_token: &Secret<String>,
    ) -> Result<Box<dyn Transport>, TransportError>;
}
