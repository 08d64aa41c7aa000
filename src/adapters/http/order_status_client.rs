//! reqwest client for the order service's status endpoints.
//!
//! - `GET   {base}/orders/{id}/valid-transitions`
//! - `PATCH {base}/orders/{id}/status`

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::time::Duration;

use crate::domain::foundation::OrderId;
use crate::domain::order::{OrderStatus, TransitionMetadata};
use crate::ports::{OrderStatusApi, OrderStatusApiError, TransitionOptions};

/// Body of the status PATCH: target status plus whichever metadata is set.
#[derive(Debug, Serialize)]
struct UpdateStatusRequest<'a> {
    status: OrderStatus,
    #[serde(flatten)]
    metadata: &'a TransitionMetadata,
}

/// HTTP implementation of [`OrderStatusApi`].
pub struct HttpOrderStatusApi {
    base_url: String,
    identity_token: Secret<String>,
    http_client: reqwest::Client,
}

impl HttpOrderStatusApi {
    pub fn new(
        base_url: impl Into<String>,
        identity_token: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, OrderStatusApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OrderStatusApiError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            identity_token,
            http_client,
        })
    }

    fn transitions_url(&self, order: &OrderId) -> String {
        format!("{}/orders/{}/valid-transitions", self.base_url, order)
    }

    fn status_url(&self, order: &OrderId) -> String {
        format!("{}/orders/{}/status", self.base_url, order)
    }

    async fn check_status(
        order: &OrderId,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, OrderStatusApiError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(OrderStatusApiError::NotFound(order.clone()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(order_id = %order, status = %status, error = %error_text, "Order service request failed");
            return Err(OrderStatusApiError::Rejected {
                status: status.as_u16(),
                message: error_text,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl OrderStatusApi for HttpOrderStatusApi {
    async fn fetch_transitions(
        &self,
        order: &OrderId,
    ) -> Result<TransitionOptions, OrderStatusApiError> {
        let response = self
            .http_client
            .get(self.transitions_url(order))
            .bearer_auth(self.identity_token.expose_secret())
            .send()
            .await
            .map_err(|e| OrderStatusApiError::Network(e.to_string()))?;

        let response = Self::check_status(order, response).await?;

        response.json().await.map_err(|e| {
            OrderStatusApiError::InvalidResponse(format!("Failed to parse transitions: {}", e))
        })
    }

    async fn update_order_status(
        &self,
        order: &OrderId,
        target: OrderStatus,
        metadata: &TransitionMetadata,
    ) -> Result<(), OrderStatusApiError> {
        let body = UpdateStatusRequest {
            status: target,
            metadata,
        };

        let response = self
            .http_client
            .patch(self.status_url(order))
            .bearer_auth(self.identity_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| OrderStatusApiError::Network(e.to_string()))?;

        Self::check_status(order, response).await?;
        tracing::info!(order_id = %order, status = %target, "Order status updated");
        Ok(())
    }
}
