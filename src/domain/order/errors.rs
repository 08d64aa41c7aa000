//! Order status errors.

use thiserror::Error;

use crate::domain::foundation::{IllegalTransition, OrderId};

use super::status::OrderStatus;

/// Errors from requesting or inspecting order status moves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderStatusError {
    /// The move is not an edge of the transition graph. Raised before any
    /// network call is made.
    #[error("Illegal order status transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("Order service error: {0}")]
    Api(String),
}

impl From<IllegalTransition<OrderStatus>> for OrderStatusError {
    fn from(err: IllegalTransition<OrderStatus>) -> Self {
        OrderStatusError::IllegalTransition {
            from: err.from,
            to: err.to,
        }
    }
}
