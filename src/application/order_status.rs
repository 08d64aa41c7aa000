//! Order status transition engine.
//!
//! The local [`TransitionGraph`] is the gate: a move that is not an edge
//! is rejected before anything is sent to the order service. The service's
//! own list of valid moves is consulted for display and intersected with
//! the graph, so the two can only ever narrow each other.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::foundation::OrderId;
use crate::domain::order::{
    suggested_fields, GeneralStatus, MetadataField, OrderStatus, OrderStatusError,
    TransitionGraph, TransitionMetadata,
};
use crate::ports::OrderStatusApi;

/// One legal target status as offered to the admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusOption {
    pub status: OrderStatus,
    pub general: GeneralStatus,
    /// Metadata worth asking for. Never required.
    pub suggested_fields: &'static [MetadataField],
}

pub struct OrderStatusTransitionEngine {
    api: Arc<dyn OrderStatusApi>,
    graph: TransitionGraph,
    cache: RwLock<HashMap<OrderId, OrderStatus>>,
}

impl OrderStatusTransitionEngine {
    pub fn new(api: Arc<dyn OrderStatusApi>) -> Self {
        Self::with_graph(api, TransitionGraph::default())
    }

    pub fn with_graph(api: Arc<dyn OrderStatusApi>, graph: TransitionGraph) -> Self {
        Self {
            api,
            graph,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn valid_transitions(&self, current: OrderStatus) -> Vec<OrderStatus> {
        self.graph.targets(current).to_vec()
    }

    /// Legal targets from `current` with their suggested metadata.
    ///
    /// `active_tab` is the general-status filter the admin is looking at. It
    /// is display-only and does not change the result.
    pub fn status_options(
        &self,
        current: OrderStatus,
        active_tab: Option<GeneralStatus>,
    ) -> Vec<StatusOption> {
        debug!(current = %current, tab = ?active_tab, "Building status options");
        self.graph
            .targets(current)
            .iter()
            .map(|&status| StatusOption {
                status,
                general: status.general(),
                suggested_fields: suggested_fields(status),
            })
            .collect()
    }

    /// Ask the order service for the current status and its valid moves.
    ///
    /// Only moves the local graph also allows are returned.
    pub async fn load_transition_options(
        &self,
        order: &OrderId,
    ) -> Result<Vec<OrderStatus>, OrderStatusError> {
        let options = self.api.fetch_transitions(order).await?;
        let current = options.current_status;
        self.record_status(order, current).await;

        let local = self.graph.targets(current);
        let accepted: Vec<OrderStatus> = local
            .iter()
            .copied()
            .filter(|s| options.valid_transitions.contains(s))
            .collect();

        if accepted.len() != local.len() || accepted.len() != options.valid_transitions.len() {
            warn!(
                order_id = %order,
                current = %current,
                local = ?local,
                remote = ?options.valid_transitions,
                "Order service and local transition graph disagree"
            );
        }
        Ok(accepted)
    }

    /// Current status of `order`, from the cache or the order service.
    pub async fn current_status(&self, order: &OrderId) -> Result<OrderStatus, OrderStatusError> {
        if let Some(status) = self.cached_status(order).await {
            return Ok(status);
        }
        let options = self.api.fetch_transitions(order).await?;
        self.record_status(order, options.current_status).await;
        Ok(options.current_status)
    }

    /// Move `order` to `target`, resolving its current status first.
    pub async fn request_transition(
        &self,
        order: &OrderId,
        target: OrderStatus,
        metadata: &TransitionMetadata,
    ) -> Result<OrderStatus, OrderStatusError> {
        let current = self.current_status(order).await?;
        self.request_transition_from(order, current, target, metadata)
            .await
    }

    /// Move `order` from a known `current` status to `target`.
    ///
    /// An illegal move fails with [`OrderStatusError::IllegalTransition`]
    /// without contacting the order service.
    pub async fn request_transition_from(
        &self,
        order: &OrderId,
        current: OrderStatus,
        target: OrderStatus,
        metadata: &TransitionMetadata,
    ) -> Result<OrderStatus, OrderStatusError> {
        if !self.graph.allows(current, target) {
            warn!(order_id = %order, from = %current, to = %target, "Illegal transition rejected");
            return Err(OrderStatusError::IllegalTransition {
                from: current,
                to: target,
            });
        }

        self.api.update_order_status(order, target, metadata).await?;
        self.record_status(order, target).await;
        info!(order_id = %order, from = %current, to = %target, "Order status updated");
        Ok(target)
    }

    pub async fn record_status(&self, order: &OrderId, status: OrderStatus) {
        self.cache.write().await.insert(order.clone(), status);
    }

    /// Drop the cached status so the next lookup asks the order service.
    pub async fn forget(&self, order: &OrderId) {
        self.cache.write().await.remove(order);
    }

    pub async fn cached_status(&self, order: &OrderId) -> Option<OrderStatus> {
        self.cache.read().await.get(order).copied()
    }
}
