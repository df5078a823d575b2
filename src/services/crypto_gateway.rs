use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::CashierError;
use crate::models::deposit::CryptoCurrency;

/// `result` code the gateway uses for a successful price response
const PRICES_OK: i64 = 100;

const PRICES_CACHE_KEY: &str = "prices";

#[derive(Debug, Deserialize)]
struct PricesResponse {
    result: i64,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
}

/// Deposit address issued by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedAddress {
    pub address: String,
}

#[async_trait]
pub trait CryptoGateway: Send + Sync {
    /// Current coin prices, as returned by the gateway
    async fn prices(&self) -> Result<Value, CashierError>;

    /// Fresh deposit address for `currency`
    async fn generate_address(
        &self,
        currency: CryptoCurrency,
    ) -> Result<GeneratedAddress, CashierError>;
}

#[derive(Clone)]
pub struct CryptoGatewayClient {
    client: Client,
    base_url: String,
    cache: Arc<Cache<String, Value>>,
}

impl CryptoGatewayClient {
    pub fn new(
        base_url: String,
        timeout: Duration,
        prices_ttl: Duration,
    ) -> Result<Self, CashierError> {
        let client = Client::builder().timeout(timeout).build()?;
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(prices_ttl)
            .build();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Arc::new(cache),
        })
    }
}

#[async_trait]
impl CryptoGateway for CryptoGatewayClient {
    async fn prices(&self) -> Result<Value, CashierError> {
        if let Some(cached) = self.cache.get(PRICES_CACHE_KEY).await {
            tracing::debug!("Cache hit for crypto prices");
            return Ok(cached);
        }

        let url = format!("{}/get-prices", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CashierError::ExternalService(format!(
                "Crypto gateway prices error {}: {}",
                status, error_text
            )));
        }

        let body: PricesResponse = response.json().await?;
        if body.result != PRICES_OK {
            return Err(CashierError::ExternalService(
                body.message
                    .unwrap_or_else(|| "Failed to fetch prices".to_string()),
            ));
        }

        self.cache
            .insert(PRICES_CACHE_KEY.to_string(), body.data.clone())
            .await;

        Ok(body.data)
    }

    async fn generate_address(
        &self,
        currency: CryptoCurrency,
    ) -> Result<GeneratedAddress, CashierError> {
        let url = format!("{}/generate-address", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "currency": currency.as_str() }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CashierError::ExternalService(format!(
                "Crypto gateway address error {}: {}",
                status, error_text
            )));
        }

        let generated: GeneratedAddress = response.json().await?;
        if generated.address.trim().is_empty() {
            return Err(CashierError::ExternalService(
                "Crypto gateway returned an empty address".to_string(),
            ));
        }

        tracing::info!("Generated {} deposit address", currency.as_str());

        Ok(generated)
    }
}
