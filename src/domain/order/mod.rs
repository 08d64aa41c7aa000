//! Order lifecycle: detailed statuses, general grouping and the
//! transition graph that gates status changes.

mod errors;
mod status;
mod transition;

pub use errors::OrderStatusError;
pub use status::{GeneralStatus, OrderStatus};
pub use transition::{
    suggested_fields, MetadataField, TransitionGraph, TransitionMetadata,
    DEFAULT_TRANSITION_GRAPH,
};
