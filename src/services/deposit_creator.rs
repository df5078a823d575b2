//! Deposit request creation
//!
//! A user asks to deposit; we hand back a provider tracking reference and
//! persist a `created` transaction. Requests are idempotent per
//! `(user, kind, provider, amount, currency)`: the pending-row unique index
//! makes the insert a conditional one, so repeated or concurrent requests
//! resolve to the same record.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, TryInsertResult,
};

use crate::entities::{deposit_transactions, prelude::*};
use crate::errors::{CashierError, GENERIC_FAILURE};
use crate::models::deposit::{
    fiat_to_cents, format_fiat, AmountInput, CashappDepositCreated, CreditDepositCreated,
    CryptoCurrency, CryptoDepositCreated, DepositState, Provider, SendCashappDepositRequest,
    SendCreditDepositRequest, SendCryptoDepositRequest, CURRENCY_USD, KIND_DEPOSIT,
};
use crate::services::pricing::DepositLimits;
use crate::AppState;

pub const VERIFICATION_NOTE_LENGTH: usize = 10;

const INVALID_AMOUNT: &str = "Your provided deposit amount is invalid.";

/// Check a claimed fiat amount against a provider's limits.
///
/// The whole part must be at least `limits.scale` and the amount must be
/// strictly above `limits.minimum`. At most two decimal places are accepted.
pub fn validate_deposit_amount(
    input: Option<&AmountInput>,
    limits: DepositLimits,
) -> Result<Decimal, CashierError> {
    let amount = input
        .and_then(AmountInput::to_decimal)
        .ok_or_else(|| CashierError::validation(INVALID_AMOUNT))?;

    if amount <= Decimal::ZERO || amount.normalize().scale() > 2 || amount.floor() < limits.scale
    {
        return Err(CashierError::validation(INVALID_AMOUNT));
    }

    if amount <= limits.minimum {
        return Err(CashierError::validation(minimum_message(limits)));
    }

    Ok(amount)
}

fn minimum_message(limits: DepositLimits) -> String {
    if limits.minimum == limits.base_minimum {
        format!(
            "You can only deposit amounts above ${}.",
            format_fiat(limits.minimum)
        )
    } else {
        format!(
            "You can only deposit amounts above ${} (base minimum ${}).",
            format_fiat(limits.minimum),
            format_fiat(limits.base_minimum)
        )
    }
}

/// Random memo over `[A-Za-z0-9]`, uniform per character
pub fn generate_verification_note<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..VERIFICATION_NOTE_LENGTH)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

pub fn pick_cash_tag<'a, R: Rng + ?Sized>(
    tags: &'a [String],
    rng: &mut R,
) -> Result<&'a str, CashierError> {
    tags.choose(rng)
        .map(String::as_str)
        .ok_or_else(|| CashierError::ExternalService("No Cash App tags configured".to_string()))
}

/// Pending transaction for the idempotency key, if any
pub async fn find_pending<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    provider: Provider,
    amount: i64,
    currency: &str,
) -> Result<Option<deposit_transactions::Model>, DbErr> {
    DepositTransactions::find()
        .filter(deposit_transactions::Column::UserId.eq(user_id))
        .filter(deposit_transactions::Column::Kind.eq(KIND_DEPOSIT))
        .filter(deposit_transactions::Column::Provider.eq(provider.as_str()))
        .filter(deposit_transactions::Column::State.eq(DepositState::Created.as_str()))
        .filter(deposit_transactions::Column::Amount.eq(amount))
        .filter(deposit_transactions::Column::Currency.eq(currency))
        .one(db)
        .await
}

/// Values for a new pending transaction
#[derive(Debug, Clone)]
pub struct NewPendingDeposit {
    pub user_id: i32,
    pub provider: Provider,
    /// Fiat cents (zero for crypto)
    pub amount: i64,
    pub provider_id: String,
    pub provider_url: String,
    pub currency: String,
    pub amount_currency: String,
}

/// Insert unless a pending record with the same key exists, then return
/// whichever record holds the key.
pub async fn find_or_create_pending(
    db: &DatabaseConnection,
    new: NewPendingDeposit,
) -> Result<deposit_transactions::Model, CashierError> {
    let now = Utc::now();

    let active = deposit_transactions::ActiveModel {
        user_id: Set(new.user_id),
        kind: Set(KIND_DEPOSIT.to_string()),
        provider: Set(new.provider.as_str().to_string()),
        state: Set(DepositState::Created.as_str().to_string()),
        amount: Set(new.amount),
        credited_amount: Set(None),
        provider_id: Set(new.provider_id.clone()),
        provider_url: Set(new.provider_url),
        currency: Set(new.currency.clone()),
        amount_currency: Set(new.amount_currency),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    let inserted = DepositTransactions::insert(active)
        .on_conflict(OnConflict::new().do_nothing().to_owned())
        .do_nothing()
        .exec(db)
        .await?;

    match inserted {
        TryInsertResult::Inserted(_) => tracing::info!(
            "Created pending {} deposit {} for user {}",
            new.provider,
            new.provider_id,
            new.user_id
        ),
        TryInsertResult::Conflicted | TryInsertResult::Empty => tracing::debug!(
            "Pending {} deposit for user {} already exists, reusing it",
            new.provider,
            new.user_id
        ),
    }

    find_pending(db, new.user_id, new.provider, new.amount, &new.currency)
        .await?
        .ok_or_else(|| {
            // The insert lost to a provider-id collision or the winner was
            // completed in between
            tracing::warn!(
                "No pending {} deposit after insert for user {}",
                new.provider,
                new.user_id
            );
            CashierError::Conflict(GENERIC_FAILURE.to_string())
        })
}

/// `sendCashappDeposit`: reserve a verification note and cash tag
pub async fn create_cashapp_deposit(
    state: &AppState,
    user_id: i32,
    request: SendCashappDepositRequest,
) -> Result<CashappDepositCreated, CashierError> {
    let amount = validate_deposit_amount(request.amount.as_ref(), state.pricing.cashapp_limits())?;
    let cents = fiat_to_cents(amount).ok_or_else(|| CashierError::validation(INVALID_AMOUNT))?;

    let transaction =
        match find_pending(&state.db, user_id, Provider::CashApp, cents, CURRENCY_USD).await? {
            Some(existing) => {
                tracing::debug!(
                    "Reusing pending Cash App deposit {} for user {}",
                    existing.id,
                    user_id
                );
                existing
            }
            None => {
                let (note, cash_tag) = {
                    let mut rng = rand::thread_rng();
                    let note = generate_verification_note(&mut rng);
                    let cash_tag = pick_cash_tag(&state.cashapp_tags, &mut rng)?.to_string();
                    (note, cash_tag)
                };

                find_or_create_pending(
                    &state.db,
                    NewPendingDeposit {
                        user_id,
                        provider: Provider::CashApp,
                        amount: cents,
                        provider_id: note,
                        provider_url: cash_tag,
                        currency: CURRENCY_USD.to_string(),
                        amount_currency: amount.to_string(),
                    },
                )
                .await?
            }
        };

    Ok(CashappDepositCreated {
        note: transaction.provider_id,
        cashtag: transaction.provider_url,
        id: transaction.id,
        created_at: transaction.created_at.to_rfc3339(),
    })
}

/// `sendCreditDeposit`: open a card checkout session
pub async fn create_card_deposit(
    state: &AppState,
    user_id: i32,
    request: SendCreditDepositRequest,
) -> Result<CreditDepositCreated, CashierError> {
    let amount = validate_deposit_amount(request.amount.as_ref(), state.pricing.card_limits())?;
    let cents = fiat_to_cents(amount).ok_or_else(|| CashierError::validation(INVALID_AMOUNT))?;

    if let Some(existing) =
        find_pending(&state.db, user_id, Provider::Card, cents, CURRENCY_USD).await?
    {
        tracing::debug!("Reusing pending card deposit {} for user {}", existing.id, user_id);
        return Ok(CreditDepositCreated {
            url: existing.provider_url,
        });
    }

    let session = state.card.create_pay_session().await?;

    let transaction = find_or_create_pending(
        &state.db,
        NewPendingDeposit {
            user_id,
            provider: Provider::Card,
            amount: cents,
            provider_id: session.order_id,
            provider_url: session.url,
            currency: CURRENCY_USD.to_string(),
            amount_currency: amount.to_string(),
        },
    )
    .await?;

    Ok(CreditDepositCreated {
        url: transaction.provider_url,
    })
}

/// `sendCryptoDeposit`: one pending deposit address per user and currency
pub async fn create_crypto_deposit(
    state: &AppState,
    user_id: i32,
    request: SendCryptoDepositRequest,
) -> Result<CryptoDepositCreated, CashierError> {
    let currency = request
        .currency
        .as_deref()
        .and_then(|c| c.parse::<CryptoCurrency>().ok())
        .ok_or_else(|| CashierError::validation("You've entered an invalid deposit currency."))?;

    if let Some(existing) =
        find_pending(&state.db, user_id, Provider::Crypto, 0, currency.as_str()).await?
    {
        tracing::debug!("Reusing pending {} address for user {}", currency.as_str(), user_id);
        return Ok(CryptoDepositCreated {
            address: existing.provider_id,
            currency,
        });
    }

    let generated = state.crypto.generate_address(currency).await?;

    let transaction = find_or_create_pending(
        &state.db,
        NewPendingDeposit {
            user_id,
            provider: Provider::Crypto,
            amount: 0,
            provider_id: generated.address.clone(),
            provider_url: generated.address,
            currency: currency.as_str().to_string(),
            amount_currency: Decimal::ZERO.to_string(),
        },
    )
    .await?;

    Ok(CryptoDepositCreated {
        address: transaction.provider_id,
        currency,
    })
}
