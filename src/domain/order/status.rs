//! Order status state machine.
//!
//! Two levels of classification: the detailed [`OrderStatus`] drives
//! transitions, the coarse [`GeneralStatus`] is only a display filter
//! (the tabs of the order table).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

use super::transition::DEFAULT_TRANSITION_GRAPH;

/// Detailed lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed by the customer, not yet reviewed.
    New,
    Confirmed,
    Preparing,
    ShippingInProgress,
    Delivered,
    DeliveryFailed,
    Cancelled,
    /// Customer asked to cancel; an admin must approve.
    CancellationRequested,
    /// Customer asked to return a delivered order.
    ReturnRequested,
    Refunded,
}

impl OrderStatus {
    /// Every detailed status, in lifecycle order.
    pub const ALL: [OrderStatus; 10] = [
        OrderStatus::New,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::ShippingInProgress,
        OrderStatus::Delivered,
        OrderStatus::DeliveryFailed,
        OrderStatus::Cancelled,
        OrderStatus::CancellationRequested,
        OrderStatus::ReturnRequested,
        OrderStatus::Refunded,
    ];

    /// Wire name (`shipping_in_progress`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::ShippingInProgress => "shipping_in_progress",
            OrderStatus::Delivered => "delivered",
            OrderStatus::DeliveryFailed => "delivery_failed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::CancellationRequested => "cancellation_requested",
            OrderStatus::ReturnRequested => "return_requested",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// The general status group this detailed status is filed under.
    pub fn general(&self) -> GeneralStatus {
        match self {
            OrderStatus::New => GeneralStatus::Pending,
            OrderStatus::Confirmed | OrderStatus::Preparing => GeneralStatus::Processing,
            OrderStatus::ShippingInProgress | OrderStatus::DeliveryFailed => {
                GeneralStatus::Shipping
            }
            OrderStatus::Delivered => GeneralStatus::Completed,
            OrderStatus::Cancelled | OrderStatus::CancellationRequested => {
                GeneralStatus::Cancelled
            }
            OrderStatus::ReturnRequested | OrderStatus::Refunded => GeneralStatus::ReturnRefund,
        }
    }
}

impl StateMachine for OrderStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        DEFAULT_TRANSITION_GRAPH.allows(*self, *target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        DEFAULT_TRANSITION_GRAPH.targets(*self).to_vec()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("order_status", format!("unknown status '{}'", s))
            })
    }
}

/// Coarse grouping used for filtering and display only.
///
/// Never participates in transition legality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneralStatus {
    Pending,
    Processing,
    Shipping,
    Completed,
    Cancelled,
    ReturnRefund,
}

impl GeneralStatus {
    pub const ALL: [GeneralStatus; 6] = [
        GeneralStatus::Pending,
        GeneralStatus::Processing,
        GeneralStatus::Shipping,
        GeneralStatus::Completed,
        GeneralStatus::Cancelled,
        GeneralStatus::ReturnRefund,
    ];

    /// Detailed statuses filed under this group.
    pub fn members(&self) -> Vec<OrderStatus> {
        OrderStatus::ALL
            .iter()
            .copied()
            .filter(|status| status.general() == *self)
            .collect()
    }
}

impl fmt::Display for GeneralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GeneralStatus::Pending => "pending",
            GeneralStatus::Processing => "processing",
            GeneralStatus::Shipping => "shipping",
            GeneralStatus::Completed => "completed",
            GeneralStatus::Cancelled => "cancelled",
            GeneralStatus::ReturnRefund => "return_refund",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_can_only_be_confirmed() {
        assert_eq!(OrderStatus::New.valid_transitions(), vec![OrderStatus::Confirmed]);
    }

    #[test]
    fn preparing_cannot_jump_to_delivered() {
        let err = OrderStatus::Preparing
            .transition_to(OrderStatus::Delivered)
            .unwrap_err();
        assert_eq!(err.from, OrderStatus::Preparing);
        assert_eq!(err.to, OrderStatus::Delivered);
    }

    #[test]
    fn preparing_can_ship() {
        assert_eq!(
            OrderStatus::Preparing.transition_to(OrderStatus::ShippingInProgress),
            Ok(OrderStatus::ShippingInProgress)
        );
    }

    #[test]
    fn cancellation_request_only_allows_approval() {
        assert_eq!(
            OrderStatus::CancellationRequested.valid_transitions(),
            vec![OrderStatus::Cancelled]
        );
    }

    #[test]
    fn terminal_statuses_have_no_outbound_edges() {
        for status in [
            OrderStatus::Delivered,
            OrderStatus::DeliveryFailed,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert!(status.is_terminal(), "{} should be terminal", status);
        }
    }

    #[test]
    fn every_detailed_status_belongs_to_exactly_one_group() {
        for status in OrderStatus::ALL {
            let groups: Vec<_> = GeneralStatus::ALL
                .iter()
                .filter(|g| g.members().contains(&status))
                .collect();
            assert_eq!(groups.len(), 1, "{} is in {:?}", status, groups);
        }
    }

    #[test]
    fn serializes_to_snake_case_json() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::ShippingInProgress).unwrap(),
            "\"shipping_in_progress\""
        );
        let status: OrderStatus = serde_json::from_str("\"cancellation_requested\"").unwrap();
        assert_eq!(status, OrderStatus::CancellationRequested);
    }

    #[test]
    fn from_str_matches_wire_names() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    fn any_status() -> impl Strategy<Value = OrderStatus> {
        prop::sample::select(OrderStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn transition_to_agrees_with_valid_transitions(from in any_status(), to in any_status()) {
            let listed = from.valid_transitions().contains(&to);
            prop_assert_eq!(from.transition_to(to).is_ok(), listed);
        }
    }
}
