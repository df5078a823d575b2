//! Cash App receipt lookups
//!
//! Users prove a payment by pasting the receipt link Cash App gives them
//! (`https://cash.app/payments/<id>/receipt`). The JSON view of that receipt
//! is the authoritative source for amount, memo, funding source and status.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::CashierError;

/// Funding source accepted for deposits (cash balance, not a linked card)
pub const CASH_FUNDING_SOURCE: &str = "Cash";

/// `status_treatment` of a settled payment
pub const SUCCESS_STATUS: &str = "SUCCESS";

lazy_static! {
    static ref PAYMENT_LINK_REGEX: Regex =
        Regex::new(r"^https://cash\.app/payments/([A-Za-z0-9_-]+)/receipt").unwrap();
}

/// Pull the payment id out of a receipt link
pub fn extract_payment_id(payment_link: &str) -> Result<String, CashierError> {
    PAYMENT_LINK_REGEX
        .captures(payment_link.trim())
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
        .ok_or_else(|| CashierError::validation("Invalid payment link."))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptDetailRow {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl ReceiptDetailRow {
    fn value_text(&self) -> String {
        match &self.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Subset of `receipt-json` the cashier reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashAppReceipt {
    /// Row 0 is the amount (`"$10.00"`), row 1 the funding source
    #[serde(default)]
    pub detail_rows: Vec<ReceiptDetailRow>,
    /// Payment memo; must equal the verification note
    #[serde(default)]
    pub notes: Option<String>,
    /// e.g. `"Payment from $sender"`
    #[serde(default)]
    pub header_subtext: Option<String>,
    #[serde(default)]
    pub status_treatment: Option<String>,
}

impl CashAppReceipt {
    /// Paid amount in dollars. `None` when the row is missing or unparseable.
    pub fn amount(&self) -> Option<Decimal> {
        let text = self.detail_rows.first()?.value_text();
        let cleaned: String = text
            .trim()
            .trim_start_matches('$')
            .chars()
            .filter(|c| *c != ',')
            .collect();
        Decimal::from_str(&cleaned).ok()
    }

    pub fn funding_source(&self) -> Option<String> {
        self.detail_rows.get(1).map(ReceiptDetailRow::value_text)
    }

    /// Sender's cash tag: third word of the header subtext
    pub fn sender_cashtag(&self) -> Option<&str> {
        self.header_subtext.as_deref()?.split_whitespace().nth(2)
    }
}

/// Source of Cash App receipts
#[async_trait]
pub trait CashAppReceipts: Send + Sync {
    async fn fetch_receipt(&self, payment_id: &str) -> Result<CashAppReceipt, CashierError>;
}

#[derive(Clone)]
pub struct CashAppClient {
    client: Client,
    base_url: String,
}

impl CashAppClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, CashierError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CashAppReceipts for CashAppClient {
    async fn fetch_receipt(&self, payment_id: &str) -> Result<CashAppReceipt, CashierError> {
        let url = format!("{}/receipt-json/f/{}", self.base_url, payment_id);

        tracing::debug!("Fetching Cash App receipt {}", payment_id);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CashierError::ExternalService(format!(
                "Cash App receipt error {}: {}",
                status, error_text
            )));
        }

        let receipt: CashAppReceipt = response.json().await?;
        Ok(receipt)
    }
}
