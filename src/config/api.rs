//! Order service API configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// REST collaborator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the admin REST API
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate API configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("API__BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidApiUrl);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_request_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    #[test]
    fn test_valid_api_config() {
        assert!(config("https://api.example.com").validate().is_ok());
        assert!(config("http://localhost:3000/api").validate().is_ok());
    }

    #[test]
    fn test_invalid_scheme() {
        assert_eq!(
            config("ftp://api.example.com").validate(),
            Err(ValidationError::InvalidApiUrl)
        );
    }

    #[test]
    fn test_timeout_out_of_range() {
        let mut c = config("https://api.example.com");
        c.request_timeout_secs = 0;
        assert_eq!(c.validate(), Err(ValidationError::InvalidTimeout));
        c.request_timeout_secs = 301;
        assert_eq!(c.validate(), Err(ValidationError::InvalidTimeout));
    }
}
