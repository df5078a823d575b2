//! Runtime configuration, read from the environment (after `.env` is loaded)

use rust_decimal::Decimal;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::services::pricing::PricingPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct CardProviderConfig {
    pub base_url: String,
    pub merchant_id: String,
    pub merchant_secret: String,
}

#[derive(Debug, Clone)]
pub struct CashierConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Cash tags handed out for Cash App deposits; rotated without a rebuild
    pub cashapp_tags: Vec<String>,
    pub cashapp_receipt_base_url: String,
    pub pricing: PricingPolicy,
    pub card: CardProviderConfig,
    pub crypto_gateway_base_url: String,
    pub http_timeout: Duration,
    pub crypto_price_cache_ttl: Duration,
}

impl CashierConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes `std::env::var`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PricingPolicy::default();

        let cashapp_tags: Vec<String> = required(&lookup, "CASHAPP_TAGS")?
            .split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        if cashapp_tags.is_empty() {
            return Err(ConfigError::Invalid {
                name: "CASHAPP_TAGS",
                value: lookup("CASHAPP_TAGS").unwrap_or_default(),
            });
        }

        let pricing = PricingPolicy {
            coin_rate_divisor: positive_decimal(&lookup, "COIN_RATE_DIVISOR", defaults.coin_rate_divisor)?,
            coin_rate_multiplier: positive_decimal(
                &lookup,
                "COIN_RATE_MULTIPLIER",
                defaults.coin_rate_multiplier,
            )?,
            cashapp_min_scale: positive_decimal(&lookup, "CASHAPP_MIN_SCALE", defaults.cashapp_min_scale)?,
            min_deposit: parsed(&lookup, "CREDIT_MIN_AMOUNT", defaults.min_deposit)?,
        };

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            bind_addr: parsed(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            cashapp_tags,
            cashapp_receipt_base_url: lookup("CASHAPP_RECEIPT_BASE_URL")
                .unwrap_or_else(|| "https://cash.app".to_string()),
            pricing,
            card: CardProviderConfig {
                base_url: required(&lookup, "CARD_PROVIDER_BASE_URL")?,
                merchant_id: required(&lookup, "CARD_MERCHANT_ID")?,
                merchant_secret: required(&lookup, "CARD_MERCHANT_SECRET")?,
            },
            crypto_gateway_base_url: lookup("CRYPTO_GATEWAY_BASE_URL")
                .unwrap_or_else(|| "https://oxapay.onrender.com".to_string()),
            http_timeout: Duration::from_secs(parsed(&lookup, "HTTP_TIMEOUT_SECS", 15)?),
            crypto_price_cache_ttl: Duration::from_secs(parsed(&lookup, "CRYPTO_PRICE_CACHE_SECS", 60)?),
        })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn positive_decimal<F>(lookup: &F, name: &'static str, default: Decimal) -> Result<Decimal, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parsed(lookup, name, default)?;
    if value <= Decimal::ZERO {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}
