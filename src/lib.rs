// src/lib.rs

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use services::{
    anti_spam::AntiSpam, card_provider::CardCheckout, cashapp::CashAppReceipts,
    crypto_gateway::CryptoGateway, pricing::PricingPolicy, user_broadcaster::UserBroadcaster,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub pricing: PricingPolicy,
    pub cashapp_tags: Arc<Vec<String>>,
    pub cashapp: Arc<dyn CashAppReceipts>,
    pub card: Arc<dyn CardCheckout>,
    pub crypto: Arc<dyn CryptoGateway>,
    pub user_broadcaster: UserBroadcaster,
    pub anti_spam: AntiSpam,
}

pub mod entities {
    pub mod prelude;
    pub mod deposit_transactions;
    pub mod reports;
    pub mod users;
}

pub mod services {
    pub mod anti_spam;
    pub mod card_provider;
    pub mod cashapp;
    pub mod crypto_gateway;
    pub mod deposit_creator;
    pub mod deposit_verifier;
    pub mod pricing;
    pub mod user_broadcaster;
}

pub mod config;
pub mod errors;
pub mod models;
pub mod handlers;
