//! Backoffice Hub - Real-time order notifications and support chat
//!
//! This crate keeps an e-commerce admin back office in sync with the
//! messaging backend: order lifecycle notifications, customer support chat
//! rooms with paginated history and unread counters, and locally validated
//! order status transitions.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
