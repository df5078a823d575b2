//! Cashier error type
//!
//! Every variant maps to a stable [`ErrorKind`] so clients can branch on the
//! kind instead of the message text.

use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

/// Shown when the underlying failure is not something the user can act on
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again in a few seconds.";

const PROVIDER_UNAVAILABLE: &str = "Payment provider is unavailable. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Verification,
    ExternalService,
    Persistence,
}

#[derive(Debug, Error)]
pub enum CashierError {
    /// Malformed or out-of-range input; nothing was written
    #[error("{0}")]
    Validation(String),
    /// No matching pending deposit
    #[error("{0}")]
    NotFound(String),
    /// Deposit already completed, or a concurrent request won
    #[error("{0}")]
    Conflict(String),
    /// Provider data failed a cross-check; the deposit stays pending
    #[error("{0}")]
    Verification(String),
    #[error("Payment provider error: {0}")]
    ExternalService(String),
    #[error("Database error: {0}")]
    Persistence(#[from] DbErr),
}

impl CashierError {
    pub fn validation(message: impl Into<String>) -> Self {
        CashierError::Validation(message.into())
    }

    pub fn verification(message: impl Into<String>) -> Self {
        CashierError::Verification(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CashierError::Validation(_) => ErrorKind::Validation,
            CashierError::NotFound(_) => ErrorKind::NotFound,
            CashierError::Conflict(_) => ErrorKind::Conflict,
            CashierError::Verification(_) => ErrorKind::Verification,
            CashierError::ExternalService(_) => ErrorKind::ExternalService,
            CashierError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Message safe to send to the client. Provider and database details
    /// stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            CashierError::ExternalService(_) => PROVIDER_UNAVAILABLE.to_string(),
            CashierError::Persistence(_) => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for CashierError {
    fn from(err: reqwest::Error) -> Self {
        CashierError::ExternalService(err.to_string())
    }
}
