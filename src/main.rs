use std::sync::Arc;

use cashier_backend::{
    config::CashierConfig,
    handlers,
    services::{
        anti_spam::AntiSpam, card_provider::CardProviderClient, cashapp::CashAppClient,
        crypto_gateway::CryptoGatewayClient, user_broadcaster::UserBroadcaster,
    },
    AppState,
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cashier_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = CashierConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let cashapp = CashAppClient::new(config.cashapp_receipt_base_url.clone(), config.http_timeout)?;
    let card = CardProviderClient::new(
        config.card.base_url.clone(),
        config.card.merchant_id.clone(),
        config.card.merchant_secret.clone(),
        config.http_timeout,
    )?;
    let crypto = CryptoGatewayClient::new(
        config.crypto_gateway_base_url.clone(),
        config.http_timeout,
        config.crypto_price_cache_ttl,
    )?;

    tracing::info!(
        "Cash App deposits rotate across {} cash tag(s)",
        config.cashapp_tags.len()
    );

    let state = AppState {
        db,
        pricing: config.pricing,
        cashapp_tags: Arc::new(config.cashapp_tags.clone()),
        cashapp: Arc::new(cashapp),
        card: Arc::new(card),
        crypto: Arc::new(crypto),
        user_broadcaster: UserBroadcaster::new(),
        anti_spam: AntiSpam::new(),
    };

    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
