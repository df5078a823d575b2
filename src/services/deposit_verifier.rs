//! Deposit verification and crediting
//!
//! A Cash App deposit is credited only after the receipt fetched from Cash App
//! matches the pending transaction on memo, amount, funding source and
//! status. Crediting runs in a single database transaction: the state flip
//! `created → completed` is a compare-and-set, so a receipt can credit at
//! most once even when submitted concurrently.

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};

use crate::entities::{deposit_transactions, prelude::*, reports, users};
use crate::errors::CashierError;
use crate::models::deposit::{
    cents_to_fiat, fiat_to_cents, CheckCashappDepositRequest, DepositCredited, DepositState,
    Provider,
};
use crate::services::cashapp::{
    extract_payment_id, CashAppReceipt, CASH_FUNDING_SOURCE, SUCCESS_STATUS,
};
use crate::AppState;

const NOT_FOUND: &str = "Deposit request not found.";
const ALREADY_CLAIMED: &str = "Deposit already claimed.";
const VERIFICATION_FAILED: &str = "Payment verification failed.";
const CASH_BALANCE_REQUIRED: &str = "Money must be sent with cash balance!";
const PAYMENT_NOT_SUCCESSFUL: &str = "Payment must be successful!";

/// Compare a receipt against its pending transaction.
///
/// Returns the verified fiat amount.
pub fn cross_check(
    receipt: &CashAppReceipt,
    transaction: &deposit_transactions::Model,
) -> Result<rust_decimal::Decimal, CashierError> {
    let paid_cents = receipt.amount().and_then(fiat_to_cents);

    if paid_cents != Some(transaction.amount)
        || receipt.notes.as_deref() != Some(transaction.provider_id.as_str())
    {
        return Err(CashierError::verification(VERIFICATION_FAILED));
    }

    if receipt.funding_source().as_deref() != Some(CASH_FUNDING_SOURCE) {
        return Err(CashierError::verification(CASH_BALANCE_REQUIRED));
    }

    if receipt.status_treatment.as_deref() != Some(SUCCESS_STATUS) {
        return Err(CashierError::verification(PAYMENT_NOT_SUCCESSFUL));
    }

    Ok(cents_to_fiat(transaction.amount))
}

/// Complete `transaction` and apply every balance side effect atomically.
///
/// Returns the owner's row after the credit.
pub async fn credit_deposit(
    db: &DatabaseConnection,
    transaction: &deposit_transactions::Model,
    credited: i64,
) -> Result<users::Model, CashierError> {
    let provider = transaction
        .provider
        .parse::<Provider>()
        .map_err(CashierError::verification)?;
    let now = Utc::now();
    let now_tz: sea_orm::prelude::DateTimeWithTimeZone = now.into();

    let txn = db.begin().await?;

    // (a) created → completed, once
    let completed = DepositTransactions::update_many()
        .col_expr(
            deposit_transactions::Column::State,
            Expr::value(DepositState::Completed.as_str()),
        )
        .col_expr(deposit_transactions::Column::CreditedAmount, Expr::value(credited))
        .col_expr(deposit_transactions::Column::UpdatedAt, Expr::value(now_tz))
        .filter(deposit_transactions::Column::Id.eq(transaction.id))
        .filter(deposit_transactions::Column::State.eq(DepositState::Created.as_str()))
        .exec(&txn)
        .await?;

    if completed.rows_affected == 0 {
        txn.rollback().await?;
        return Err(CashierError::Conflict(ALREADY_CLAIMED.to_string()));
    }

    // (b) owner balance and counters
    let owner = Users::update_many()
        .col_expr(users::Column::Balance, Expr::col(users::Column::Balance).add(credited))
        .col_expr(
            users::Column::StatsDeposit,
            Expr::col(users::Column::StatsDeposit).add(credited),
        )
        .col_expr(
            users::Column::LimitsBetToWithdraw,
            Expr::col(users::Column::LimitsBetToWithdraw).add(credited),
        )
        .col_expr(users::Column::UpdatedAt, Expr::value(now_tz))
        .filter(users::Column::Id.eq(transaction.user_id))
        .exec(&txn)
        .await?;

    if owner.rows_affected == 0 {
        txn.rollback().await?;
        return Err(CashierError::NotFound(NOT_FOUND.to_string()));
    }

    // (c) daily report, fiat cents
    let report_column = match provider {
        Provider::CashApp => reports::Column::CashappDeposit,
        Provider::Card => reports::Column::CardDeposit,
        Provider::Crypto => reports::Column::CryptoDeposit,
    };
    let mut report = reports::ActiveModel {
        day: Set(now.format("%Y-%m-%d").to_string()),
        total_deposit: Set(transaction.amount),
        cashapp_deposit: Set(0),
        card_deposit: Set(0),
        crypto_deposit: Set(0),
        updated_at: Set(now_tz),
        ..Default::default()
    };
    match provider {
        Provider::CashApp => report.cashapp_deposit = Set(transaction.amount),
        Provider::Card => report.card_deposit = Set(transaction.amount),
        Provider::Crypto => report.crypto_deposit = Set(transaction.amount),
    }

    Reports::insert(report)
        .on_conflict(
            OnConflict::column(reports::Column::Day)
                .value(
                    reports::Column::TotalDeposit,
                    Expr::col((Reports, reports::Column::TotalDeposit)).add(transaction.amount),
                )
                .value(
                    report_column,
                    Expr::col((Reports, report_column)).add(transaction.amount),
                )
                .value(reports::Column::UpdatedAt, Expr::value(now_tz))
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

    let user = Users::find_by_id(transaction.user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| CashierError::NotFound(NOT_FOUND.to_string()))?;

    // (d) referrer's affiliate counter
    if let Some(referrer) = user.affiliates_referrer {
        let referred = Users::update_many()
            .col_expr(
                users::Column::AffiliatesDeposit,
                Expr::col(users::Column::AffiliatesDeposit).add(credited),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now_tz))
            .filter(users::Column::Id.eq(referrer))
            .exec(&txn)
            .await?;

        if referred.rows_affected == 0 {
            tracing::warn!(
                "Referrer {} of user {} not found, skipping affiliate credit",
                referrer,
                user.id
            );
        }
    }

    txn.commit().await?;

    Ok(user)
}

/// `checkCashappDeposit`: verify a receipt link and credit the deposit
pub async fn check_cashapp_deposit(
    state: &AppState,
    request: CheckCashappDepositRequest,
) -> Result<DepositCredited, CashierError> {
    let payment_link = request
        .payment_link
        .as_deref()
        .ok_or_else(|| CashierError::validation("Invalid payment link."))?;
    let payment_id = extract_payment_id(payment_link)?;

    let receipt = state.cashapp.fetch_receipt(&payment_id).await?;

    let memo = receipt
        .notes
        .as_deref()
        .filter(|memo| !memo.is_empty())
        .ok_or_else(|| CashierError::NotFound(NOT_FOUND.to_string()))?;

    let transaction = DepositTransactions::find()
        .filter(deposit_transactions::Column::ProviderId.eq(memo))
        .filter(deposit_transactions::Column::Provider.eq(Provider::CashApp.as_str()))
        .one(&state.db)
        .await?
        .ok_or_else(|| CashierError::NotFound(NOT_FOUND.to_string()))?;

    if transaction.state != DepositState::Created.as_str() {
        tracing::warn!(
            "Rejected second claim on deposit {} (receipt {})",
            transaction.id,
            payment_id
        );
        return Err(CashierError::Conflict(ALREADY_CLAIMED.to_string()));
    }

    let fiat = cross_check(&receipt, &transaction).inspect_err(|e| {
        tracing::warn!(
            "Receipt {} failed verification for deposit {}: {}",
            payment_id,
            transaction.id,
            e
        );
    })?;

    let credited = state
        .pricing
        .credited_coins(fiat)
        .filter(|coins| *coins > 0)
        .ok_or_else(|| CashierError::verification(VERIFICATION_FAILED))?;

    let user = credit_deposit(&state.db, &transaction, credited).await?;

    tracing::info!(
        "Credited {} coins to user {} for Cash App deposit {} (${} from {})",
        credited,
        user.id,
        transaction.id,
        fiat,
        receipt.sender_cashtag().unwrap_or("unknown sender")
    );

    state.user_broadcaster.broadcast_user(user.into());

    Ok(DepositCredited {
        message: format!("Successfully credited {} coins to your wallet!", credited),
    })
}
