//! Authentication configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use super::error::ValidationError;

/// Credentials presented to the messaging backend and the REST API
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Admin identity token, sent as a bearer token
    pub identity_token: Secret<String>,
}

impl AuthConfig {
    /// Validate authentication configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.identity_token.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__IDENTITY_TOKEN"));
        }
        Ok(())
    }
}
