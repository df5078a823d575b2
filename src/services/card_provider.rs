//! Card deposit provider
//!
//! The provider SDK flow is: authenticate with the merchant credentials, then
//! request a pay session for the merchant. The session's `orderId` becomes the
//! deposit's provider id and its `url` is the checkout page the user visits.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::CashierError;

/// Checkout session returned by the card provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaySession {
    pub url: String,
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct PaySessionResponse {
    data: PaySession,
}

#[async_trait]
pub trait CardCheckout: Send + Sync {
    /// Open a new checkout session for the configured merchant
    async fn create_pay_session(&self) -> Result<PaySession, CashierError>;
}

#[derive(Clone)]
pub struct CardProviderClient {
    client: Client,
    base_url: String,
    merchant_id: String,
    merchant_secret: String,
}

impl CardProviderClient {
    pub fn new(
        base_url: String,
        merchant_id: String,
        merchant_secret: String,
        timeout: Duration,
    ) -> Result<Self, CashierError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            merchant_id,
            merchant_secret,
        })
    }

    async fn authenticate(&self) -> Result<String, CashierError> {
        let url = format!("{}/auth", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "merchant": self.merchant_id,
                "secret": self.merchant_secret,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CashierError::ExternalService(format!(
                "Card provider auth error {}: {}",
                status, error_text
            )));
        }

        let auth: AuthResponse = response.json().await?;
        Ok(auth.token)
    }
}

#[async_trait]
impl CardCheckout for CardProviderClient {
    async fn create_pay_session(&self) -> Result<PaySession, CashierError> {
        // Must authenticate before any other call
        let token = self.authenticate().await?;

        let url = format!("{}/pay-session/{}", self.base_url, self.merchant_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CashierError::ExternalService(format!(
                "Card provider pay session error {}: {}",
                status, error_text
            )));
        }

        let session: PaySessionResponse = response.json().await?;

        tracing::info!("Opened card pay session {}", session.data.order_id);

        Ok(session.data)
    }
}
