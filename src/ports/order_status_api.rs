//! Order Status API Port - REST collaborator for order status changes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::OrderId;
use crate::domain::order::{OrderStatus, OrderStatusError, TransitionMetadata};

/// Errors returned by the order service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderStatusApiError {
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    #[error("Order service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<OrderStatusApiError> for OrderStatusError {
    fn from(err: OrderStatusApiError) -> Self {
        match err {
            OrderStatusApiError::NotFound(order) => OrderStatusError::OrderNotFound(order),
            other => OrderStatusError::Api(other.to_string()),
        }
    }
}

/// Body of `GET /orders/{id}/valid-transitions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOptions {
    pub current_status: OrderStatus,
    pub valid_transitions: Vec<OrderStatus>,
    #[serde(default)]
    pub all_statuses: Vec<OrderStatus>,
}

/// Port for reading and changing an order's detailed status
#[async_trait]
pub trait OrderStatusApi: Send + Sync {
    /// Current status and the moves the service would accept. Never mutates.
    async fn fetch_transitions(&self, order: &OrderId)
        -> Result<TransitionOptions, OrderStatusApiError>;

    /// Move the order to `target`.
    async fn update_order_status(
        &self,
        order: &OrderId,
        target: OrderStatus,
        metadata: &TransitionMetadata,
    ) -> Result<(), OrderStatusApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_options_deserialize_from_camel_case() {
        let json = r#"{
            "currentStatus": "cancellation_requested",
            "validTransitions": ["cancelled"],
            "allStatuses": ["new", "cancelled"]
        }"#;
        let options: TransitionOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.current_status, OrderStatus::CancellationRequested);
        assert_eq!(options.valid_transitions, vec![OrderStatus::Cancelled]);
        assert_eq!(options.all_statuses.len(), 2);
    }

    #[test]
    fn not_found_maps_to_order_not_found() {
        let order = OrderId::new("ord-9").unwrap();
        let err: OrderStatusError = OrderStatusApiError::NotFound(order.clone()).into();
        assert_eq!(err, OrderStatusError::OrderNotFound(order));
    }

    #[test]
    fn other_failures_map_to_api_error() {
        let err: OrderStatusError = OrderStatusApiError::Network("timeout".to_string()).into();
        assert!(matches!(err, OrderStatusError::Api(msg) if msg.contains("timeout")));
    }
}
