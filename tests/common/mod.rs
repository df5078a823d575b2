#![allow(dead_code)]

use async_trait::async_trait;
use cashier_backend::{
    entities::users,
    errors::CashierError,
    models::deposit::CryptoCurrency,
    services::{
        anti_spam::AntiSpam,
        card_provider::{CardCheckout, PaySession},
        cashapp::{CashAppReceipt, CashAppReceipts},
        crypto_gateway::{CryptoGateway, GeneratedAddress},
        pricing::PricingPolicy,
        user_broadcaster::UserBroadcaster,
    },
    AppState,
};
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use parking_lot::Mutex;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectOptions, Database, DatabaseConnection, DbErr};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const CASH_TAG: &str = "$CashierTest";

/// Set up a migrated in-memory database
/// A single pooled connection keeps every query on the same SQLite database
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    referrer: Option<i32>,
) -> users::Model {
    let now = Utc::now();
    users::ActiveModel {
        username: Set(username.to_string()),
        balance: Set(0),
        stats_deposit: Set(0),
        limits_bet_to_withdraw: Set(0),
        affiliates_deposit: Set(0),
        affiliates_referrer: Set(referrer),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert test user")
}

/// Receipts keyed by payment id
#[derive(Default)]
pub struct StubCashApp {
    receipts: Mutex<HashMap<String, CashAppReceipt>>,
}

impl StubCashApp {
    pub fn put(&self, payment_id: &str, receipt: CashAppReceipt) {
        self.receipts.lock().insert(payment_id.to_string(), receipt);
    }
}

#[async_trait]
impl CashAppReceipts for StubCashApp {
    async fn fetch_receipt(&self, payment_id: &str) -> Result<CashAppReceipt, CashierError> {
        self.receipts
            .lock()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| CashierError::ExternalService(format!("no receipt {}", payment_id)))
    }
}

/// Hands out numbered checkout sessions and counts calls
#[derive(Default)]
pub struct StubCard {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CardCheckout for StubCard {
    async fn create_pay_session(&self) -> Result<PaySession, CashierError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaySession {
            url: format!("https://pay.test/checkout/{}", n),
            order_id: format!("order-{}", n),
        })
    }
}

#[derive(Default)]
pub struct StubCrypto {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CryptoGateway for StubCrypto {
    async fn prices(&self) -> Result<Value, CashierError> {
        Ok(json!({ "btc": 65000.5, "eth": 3200.25, "ltc": 80.1 }))
    }

    async fn generate_address(
        &self,
        currency: CryptoCurrency,
    ) -> Result<GeneratedAddress, CashierError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GeneratedAddress {
            address: format!("{}-address-{}", currency.as_str(), n),
        })
    }
}

pub struct TestContext {
    pub state: AppState,
    pub cashapp: Arc<StubCashApp>,
    pub card: Arc<StubCard>,
    pub crypto: Arc<StubCrypto>,
}

pub async fn setup_context() -> TestContext {
    let db = setup_test_db().await.expect("test database");

    let cashapp = Arc::new(StubCashApp::default());
    let card = Arc::new(StubCard::default());
    let crypto = Arc::new(StubCrypto::default());

    let state = AppState {
        db,
        pricing: PricingPolicy::default(),
        cashapp_tags: Arc::new(vec![CASH_TAG.to_string()]),
        cashapp: cashapp.clone(),
        card: card.clone(),
        crypto: crypto.clone(),
        user_broadcaster: UserBroadcaster::new(),
        anti_spam: AntiSpam::new(),
    };

    TestContext {
        state,
        cashapp,
        card,
        crypto,
    }
}

/// Receipt as Cash App would return it for a settled cash-balance payment
pub fn receipt(amount: &str, memo: &str, funding: &str, status: &str) -> CashAppReceipt {
    serde_json::from_value(json!({
        "detail_rows": [
            { "label": "Amount", "value": amount },
            { "label": "Source", "value": funding }
        ],
        "notes": memo,
        "header_subtext": "Payment from $payer",
        "status_treatment": status
    }))
    .expect("receipt fixture")
}

pub fn receipt_link(payment_id: &str) -> String {
    format!("https://cash.app/payments/{}/receipt", payment_id)
}
