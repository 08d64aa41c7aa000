//! Caller-facing error taxonomy of the hub.

use thiserror::Error;

use crate::domain::chat::RoomId;
use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};
use crate::ports::{TransportError, UnreadStoreError};

/// Failure to establish the transport link.
///
/// Never retried inside the hub; the caller decides whether to `connect()` again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Identity token rejected by the messaging backend")]
    Unauthorized,

    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// `disconnect()` was called while the handshake was in flight.
    #[error("Connection attempt aborted")]
    Aborted,
}

impl From<TransportError> for ConnectionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unauthorized => ConnectionError::Unauthorized,
            other => ConnectionError::Handshake(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The operation needs a live connection and there is none.
    #[error("Not connected")]
    NotConnected,

    /// A response arrived after the context that requested it changed.
    #[error("Stale result for room {room} discarded")]
    StaleResult { room: RoomId },

    #[error("Request timed out")]
    Timeout,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unread count storage failed: {0}")]
    Storage(#[from] UnreadStoreError),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::Protocol(err.to_string())
    }
}

impl From<HubError> for DomainError {
    fn from(err: HubError) -> Self {
        let code = match &err {
            HubError::Connection(ConnectionError::Unauthorized) => ErrorCode::Unauthorized,
            HubError::Connection(_) | HubError::NotConnected => ErrorCode::NotConnected,
            HubError::StaleResult { .. } => ErrorCode::StaleResult,
            HubError::Timeout => ErrorCode::InternalError,
            HubError::Validation(_) => ErrorCode::ValidationFailed,
            HubError::Storage(_) => ErrorCode::StorageError,
            HubError::Protocol(_) => ErrorCode::ProtocolError,
        };
        DomainError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_transport_error_maps_to_unauthorized() {
        assert_eq!(
            ConnectionError::from(TransportError::Unauthorized),
            ConnectionError::Unauthorized
        );
        assert!(matches!(
            ConnectionError::from(TransportError::Io("reset".to_string())),
            ConnectionError::Handshake(msg) if msg.contains("reset")
        ));
    }

    #[test]
    fn not_connected_maps_to_not_connected_code() {
        let err: DomainError = HubError::NotConnected.into();
        assert_eq!(err.code, ErrorCode::NotConnected);
    }

    #[test]
    fn rejected_token_maps_to_unauthorized_code() {
        let err: DomainError = HubError::from(ConnectionError::Unauthorized).into();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert_eq!(
            err.to_string(),
            "[UNAUTHORIZED] Identity token rejected by the messaging backend"
        );

        let err: DomainError = HubError::from(ConnectionError::Aborted).into();
        assert_eq!(err.code, ErrorCode::NotConnected);
    }

    #[test]
    fn stale_result_names_the_room() {
        let err = HubError::StaleResult {
            room: RoomId::new("chat_user42").unwrap(),
        };
        assert!(err.to_string().contains("chat_user42"));
    }
}
