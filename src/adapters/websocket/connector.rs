//! WebSocket transport built on tokio-tungstenite.
//!
//! The identity token travels as a bearer `Authorization` header on the
//! upgrade request; a 401/403 upgrade response maps to
//! `TransportError::Unauthorized`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, Secret};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::ports::{Transport, TransportConnector, TransportError};

/// Opens WebSocket links to a fixed server URL.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    server_url: String,
}

impl WebSocketConnector {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

#[async_trait]
impl TransportConnector for WebSocketConnector {
    async fn connect(
        &self,
        identity_token: &Secret<String>,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let mut request = self
            .server_url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", identity_token.expose_secret()))
            .map_err(|_| TransportError::Handshake("identity token is not a valid header value".to_string()))?;
        request.headers_mut().insert(header::AUTHORIZATION, bearer);

        let (stream, response) = connect_async(request).await.map_err(map_handshake_error)?;
        info!(url = %self.server_url, status = %response.status(), "WebSocket connected");

        Ok(Box::new(WebSocketTransport { stream }))
    }
}

fn map_handshake_error(err: WsError) -> TransportError {
    match err {
        WsError::Http(response)
            if response.status() == StatusCode::UNAUTHORIZED
                || response.status() == StatusCode::FORBIDDEN =>
        {
            TransportError::Unauthorized
        }
        other => TransportError::Handshake(other.to_string()),
    }
}

/// An open WebSocket link carrying JSON text frames.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(map_io_error)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Server closed WebSocket");
                    return None;
                }
                // Ping/pong are answered by tungstenite; binary frames are not part of the protocol.
                Ok(_) => continue,
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => return None,
                Err(e) => return Some(Err(map_io_error(e))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(map_io_error(e)),
        }
    }
}

fn map_io_error(err: WsError) -> TransportError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
        other => TransportError::Io(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_errors_map_to_closed() {
        assert_eq!(map_io_error(WsError::ConnectionClosed), TransportError::Closed);
        assert_eq!(map_io_error(WsError::AlreadyClosed), TransportError::Closed);
    }

    #[tokio::test]
    async fn invalid_url_fails_handshake() {
        let connector = WebSocketConnector::new("not a url");
        let token = Secret::new("token".to_string());
        let err = connector.connect(&token).await.err();
        assert!(matches!(err, Some(TransportError::Handshake(_))));
    }
}
