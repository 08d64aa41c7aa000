//! Transition graph and transition metadata.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::status::OrderStatus;

/// The fixed transition table. Absence of an edge means the move is illegal.
pub static DEFAULT_TRANSITION_GRAPH: Lazy<TransitionGraph> = Lazy::new(|| {
    use OrderStatus::*;
    TransitionGraph::from_edges([
        (New, vec![Confirmed]),
        (Confirmed, vec![Preparing, Cancelled]),
        (Preparing, vec![ShippingInProgress, Cancelled]),
        (ShippingInProgress, vec![Delivered, DeliveryFailed, Cancelled]),
        (CancellationRequested, vec![Cancelled]),
        (ReturnRequested, vec![Refunded]),
    ])
});

/// Directed graph of legal detailed-status moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionGraph {
    edges: HashMap<OrderStatus, Vec<OrderStatus>>,
}

impl TransitionGraph {
    /// Builds a graph from `(from, targets)` pairs. Statuses not listed are terminal.
    pub fn from_edges(edges: impl IntoIterator<Item = (OrderStatus, Vec<OrderStatus>)>) -> Self {
        Self {
            edges: edges.into_iter().collect(),
        }
    }

    /// Outbound edge set of `from`, in table order.
    pub fn targets(&self, from: OrderStatus) -> &[OrderStatus] {
        self.edges.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn allows(&self, from: OrderStatus, to: OrderStatus) -> bool {
        self.targets(from).contains(&to)
    }
}

impl Default for TransitionGraph {
    fn default() -> Self {
        DEFAULT_TRANSITION_GRAPH.clone()
    }
}

/// Optional details attached to a status change.
///
/// All fields are optional for every target status; see
/// [`suggested_fields`] for what the UI should offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TransitionMetadata {
    pub fn with_tracking(mut self, tracking_number: impl Into<String>, carrier: impl Into<String>) -> Self {
        self.tracking_number = Some(tracking_number.into());
        self.carrier = Some(carrier.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// A metadata field the UI may offer for a target status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    TrackingNumber,
    Carrier,
    Reason,
}

/// Fields worth suggesting when moving to `target`. Never required.
pub fn suggested_fields(target: OrderStatus) -> &'static [MetadataField] {
    match target {
        OrderStatus::ShippingInProgress => &[MetadataField::TrackingNumber, MetadataField::Carrier],
        OrderStatus::Cancelled | OrderStatus::DeliveryFailed | OrderStatus::Refunded => {
            &[MetadataField::Reason]
        }
        _ => &[],
    }
}
