//! Deposit request/response payloads and the enums stored as strings in
//! `deposit_transactions`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// `kind` column value for every record written by the cashier
pub const KIND_DEPOSIT: &str = "deposit";

/// Fiat currency used by the Cash App and card providers
pub const CURRENCY_USD: &str = "usd";

/// Lifecycle of a deposit transaction
/// Status progresses: created → completed (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositState {
    /// Pending request waiting for proof of payment
    Created,
    /// Verified and credited
    Completed,
}

impl DepositState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepositState::Created => "created",
            DepositState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for DepositState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepositState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(DepositState::Created),
            "completed" => Ok(DepositState::Completed),
            _ => Err(format!("Unknown deposit state: {}", s)),
        }
    }
}

/// Payment providers the cashier accepts deposits from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "cashapp")]
    CashApp,
    Card,
    Crypto,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::CashApp => "cashapp",
            Provider::Card => "card",
            Provider::Crypto => "crypto",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cashapp" => Ok(Provider::CashApp),
            "card" => Ok(Provider::Card),
            "crypto" => Ok(Provider::Crypto),
            _ => Err(format!("Unknown deposit provider: {}", s)),
        }
    }
}

/// Currencies accepted for crypto deposits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CryptoCurrency {
    Btc,
    Eth,
    Ltc,
}

impl CryptoCurrency {
    pub fn as_str(&self) -> &'static str {
        match self {
            CryptoCurrency::Btc => "btc",
            CryptoCurrency::Eth => "eth",
            CryptoCurrency::Ltc => "ltc",
        }
    }
}

impl FromStr for CryptoCurrency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "btc" => Ok(CryptoCurrency::Btc),
            "eth" => Ok(CryptoCurrency::Eth),
            "ltc" => Ok(CryptoCurrency::Ltc),
            _ => Err(format!("Unknown crypto currency: {}", s)),
        }
    }
}

/// Amount as sent by clients: either a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    /// Parse into an exact decimal. Floats go through their shortest
    /// round-trip representation so `10.1` stays `10.1`.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            AmountInput::Number(value) if value.is_finite() => {
                Decimal::from_str(&value.to_string()).ok()
            }
            AmountInput::Number(_) => None,
            AmountInput::Text(text) => Decimal::from_str(text.trim()).ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendCashappDepositRequest {
    pub amount: Option<AmountInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendCreditDepositRequest {
    pub amount: Option<AmountInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendCryptoDepositRequest {
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckCashappDepositRequest {
    pub payment_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashappDepositCreated {
    /// Memo the user must attach to the Cash App payment
    pub note: String,
    pub cashtag: String,
    pub id: i32,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditDepositCreated {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoDepositCreated {
    pub address: String,
    pub currency: CryptoCurrency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoPrices {
    pub prices: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositCredited {
    pub message: String,
}

/// Convert a fiat amount to cents. `None` if it has sub-cent precision or
/// does not fit.
pub fn fiat_to_cents(amount: Decimal) -> Option<i64> {
    use rust_decimal::prelude::ToPrimitive;

    let cents = amount.checked_mul(dec!(100))?;
    if cents.fract() != Decimal::ZERO {
        return None;
    }
    cents.to_i64()
}

pub fn cents_to_fiat(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Render a fiat amount as `1,234.50`.
pub fn format_fiat(amount: Decimal) -> String {
    let rendered = format!("{:.2}", amount.round_dp(2));
    let (whole, fraction) = rendered.split_once('.').unwrap_or((rendered.as_str(), "00"));
    let (sign, digits) = match whole.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", whole),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}.{}", sign, grouped, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_input_parses_numbers_and_strings() {
        assert_eq!(AmountInput::Number(10.1).to_decimal(), Some(dec!(10.1)));
        assert_eq!(AmountInput::Number(10.0).to_decimal(), Some(dec!(10)));
        assert_eq!(AmountInput::Text(" 25.50 ".to_string()).to_decimal(), Some(dec!(25.50)));
        assert_eq!(AmountInput::Text("abc".to_string()).to_decimal(), None);
        assert_eq!(AmountInput::Number(f64::NAN).to_decimal(), None);
        assert_eq!(AmountInput::Number(f64::INFINITY).to_decimal(), None);
    }

    #[test]
    fn test_amount_input_deserializes_untagged() {
        let number: AmountInput = serde_json::from_str("12.5").unwrap();
        let text: AmountInput = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(number, AmountInput::Number(12.5));
        assert_eq!(text, AmountInput::Text("12.5".to_string()));
    }

    #[test]
    fn test_fiat_cents_conversion() {
        assert_eq!(fiat_to_cents(dec!(10)), Some(1000));
        assert_eq!(fiat_to_cents(dec!(10.05)), Some(1005));
        assert_eq!(fiat_to_cents(dec!(10.005)), None);
        assert_eq!(cents_to_fiat(1005), dec!(10.05));
    }

    #[test]
    fn test_fiat_to_cents_overflow_is_none() {
        assert_eq!(fiat_to_cents(Decimal::MAX), None);
        assert_eq!(fiat_to_cents(dec!(1000000000000000000000000000)), None);
        // Fits in a Decimal but not in i64 cents
        assert_eq!(fiat_to_cents(dec!(100000000000000000000)), None);
    }

    #[test]
    fn test_format_fiat_groups_thousands() {
        assert_eq!(format_fiat(dec!(5)), "5.00");
        assert_eq!(format_fiat(dec!(1234.5)), "1,234.50");
        assert_eq!(format_fiat(dec!(1234567)), "1,234,567.00");
        assert_eq!(format_fiat(dec!(100)), "100.00");
    }

    #[test]
    fn test_provider_and_state_round_trip_strings() {
        assert_eq!("cashapp".parse::<Provider>().unwrap(), Provider::CashApp);
        assert_eq!(Provider::Card.to_string(), "card");
        assert_eq!("completed".parse::<DepositState>().unwrap(), DepositState::Completed);
        assert!("failed".parse::<DepositState>().is_err());
        assert_eq!("LTC".parse::<CryptoCurrency>().unwrap(), CryptoCurrency::Ltc);
        assert!("doge".parse::<CryptoCurrency>().is_err());
    }
}
