//! Hub configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Real-time hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// WebSocket endpoint of the messaging backend
    pub server_url: String,

    /// Name of the global admin broadcast room
    #[serde(default = "default_admin_room")]
    pub admin_room: String,

    /// Window within which repeated notifications collapse to one
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,

    /// Messages per history page
    #[serde(default = "default_history_page_size")]
    pub history_page_size: usize,

    /// Minimum time a load-older request appears to take (0 = off)
    #[serde(default)]
    pub min_load_older_latency_ms: u64,

    /// Timeout for request/response exchanges over the socket
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long a graceful close may take before the link task is aborted
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Capacity of the internal event queue and the broadcast channels
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Rust log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl HubConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// The load-older latency floor, if enabled.
    pub fn min_load_older_latency(&self) -> Option<Duration> {
        (self.min_load_older_latency_ms > 0)
            .then(|| Duration::from_millis(self.min_load_older_latency_ms))
    }

    /// Validate hub configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.server_url.is_empty() {
            return Err(ValidationError::MissingRequired("HUB__SERVER_URL"));
        }
        if !self.server_url.starts_with("ws://") && !self.server_url.starts_with("wss://") {
            return Err(ValidationError::InvalidServerUrl);
        }
        if self.admin_room.trim().is_empty() {
            return Err(ValidationError::MissingRequired("HUB__ADMIN_ROOM"));
        }
        if self.dedup_window_ms == 0 {
            return Err(ValidationError::InvalidDedupWindow);
        }
        if self.history_page_size == 0 || self.history_page_size > 100 {
            return Err(ValidationError::InvalidPageSize);
        }
        if self.request_timeout_ms == 0 || self.request_timeout_ms > 120_000 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.min_load_older_latency_ms >= self.request_timeout_ms {
            return Err(ValidationError::LatencyFloorExceedsTimeout);
        }
        if self.event_channel_capacity == 0 {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            admin_room: default_admin_room(),
            dedup_window_ms: default_dedup_window_ms(),
            history_page_size: default_history_page_size(),
            min_load_older_latency_ms: 0,
            request_timeout_ms: default_request_timeout_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            event_channel_capacity: default_event_channel_capacity(),
            log_level: default_log_level(),
        }
    }
}

fn default_admin_room() -> String {
    "admin_room".to_string()
}

fn default_dedup_window_ms() -> u64 {
    3_000
}

fn default_history_page_size() -> usize {
    10
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_shutdown_timeout_ms() -> u64 {
    1_000
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info,backoffice_hub=debug".to_string()
}
