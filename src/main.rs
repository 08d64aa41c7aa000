//! Backoffice Hub - headless session runner.
//!
//! Connects to the messaging backend with the configured identity token and
//! logs notifications and room list changes until Ctrl-C.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use backoffice_hub::adapters::{FileUnreadCountStore, HttpOrderStatusApi, WebSocketConnector};
use backoffice_hub::application::{AdminHub, OrderStatusTransitionEngine};
use backoffice_hub::config::AppConfig;
use backoffice_hub::domain::foundation::DomainError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.hub.log_level))?,
        )
        .init();

    config.validate()?;
    info!(server_url = %config.hub.server_url, "Configuration loaded");

    let connector = Arc::new(WebSocketConnector::new(config.hub.server_url.clone()));
    let unread_store = Arc::new(FileUnreadCountStore::new(&config.storage.unread_counts_path));
    let order_api = HttpOrderStatusApi::new(
        config.api.base_url.clone(),
        config.auth.identity_token.clone(),
        config.api.request_timeout(),
    )?;
    let engine = Arc::new(OrderStatusTransitionEngine::new(Arc::new(order_api)));

    let hub = AdminHub::start(config.hub.clone(), connector, unread_store)
        .await?
        .with_order_engine(engine);
    let mut notifications = hub.on_notification();
    let mut room_changes = hub.on_room_list_changed().await;
    let mut connection_state = hub.watch_connection_state();

    if let Err(e) = hub.connect(&config.auth.identity_token).await {
        let err = DomainError::from(e).with_detail("server_url", config.hub.server_url.to_string());
        error!(code = %err.code, error = %err, "Could not connect to messaging backend");
        hub.shutdown().await;
        return Err(err.into());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }

            notification = notifications.recv() => match notification {
                Ok(n) => info!(
                    kind = %n.kind,
                    entity_id = %n.entity_id,
                    title = %n.title,
                    body = %n.body,
                    "Notification"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Notification listener lagged"),
                Err(RecvError::Closed) => break,
            },

            change = room_changes.recv() => match change {
                Ok(change) => {
                    let unread = hub.total_unread_count().await;
                    info!(rooms = change.rooms.len(), unread, "Room list changed");
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Room listener lagged"),
                Err(RecvError::Closed) => break,
            },

            changed = connection_state.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *connection_state.borrow_and_update();
                warn!(state = ?state, "Connection state changed");
            }
        }
    }

    hub.shutdown().await;
    Ok(())
}
