//! Coin pricing and deposit minimums
//!
//! Coins credited for a fiat deposit are `floor(fiat / divisor * multiplier)`.
//! With the defaults (3, 1000) a $10.00 deposit credits 3333 coins.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Bounds a claimed deposit amount must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositLimits {
    /// Smallest accepted whole part
    pub scale: Decimal,
    /// Amounts must be strictly above this
    pub minimum: Decimal,
    /// Configured minimum before any provider scaling
    pub base_minimum: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    pub coin_rate_divisor: Decimal,
    pub coin_rate_multiplier: Decimal,
    /// Cash App amounts are scaled by this factor before comparing against
    /// `min_deposit`, and no claim may have a whole part below it
    pub cashapp_min_scale: Decimal,
    /// Base-currency minimum deposit
    pub min_deposit: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            coin_rate_divisor: dec!(3),
            coin_rate_multiplier: dec!(1000),
            cashapp_min_scale: dec!(1.42),
            min_deposit: dec!(5),
        }
    }
}

impl PricingPolicy {
    /// Coins credited for a fiat amount. `None` if the result does not fit.
    pub fn credited_coins(&self, fiat: Decimal) -> Option<i64> {
        if self.coin_rate_divisor.is_zero() {
            return None;
        }
        fiat.checked_mul(self.coin_rate_multiplier)?
            .checked_div(self.coin_rate_divisor)?
            .floor()
            .to_i64()
    }

    /// Cash App claims must be strictly above this amount
    pub fn cashapp_minimum(&self) -> Decimal {
        // An unrepresentable minimum admits nothing
        self.min_deposit
            .checked_mul(self.cashapp_min_scale)
            .unwrap_or(Decimal::MAX)
            .floor()
    }

    /// Card claims must be strictly above this amount
    pub fn card_minimum(&self) -> Decimal {
        self.min_deposit
    }

    pub fn cashapp_limits(&self) -> DepositLimits {
        DepositLimits {
            scale: self.cashapp_min_scale,
            minimum: self.cashapp_minimum(),
            base_minimum: self.min_deposit,
        }
    }

    pub fn card_limits(&self) -> DepositLimits {
        DepositLimits {
            scale: Decimal::ONE,
            minimum: self.card_minimum(),
            base_minimum: self.min_deposit,
        }
    }
}
