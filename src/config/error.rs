//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Hub server URL must use ws:// or wss://")]
    InvalidServerUrl,

    #[error("API base URL must use http:// or https://")]
    InvalidApiUrl,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("History page size must be between 1 and 100")]
    InvalidPageSize,

    #[error("Dedup window must be non-zero")]
    InvalidDedupWindow,

    #[error("Event channel capacity must be non-zero")]
    InvalidChannelCapacity,

    #[error("Minimum load-older latency must be shorter than the request timeout")]
    LatencyFloorExceedsTimeout,
}
