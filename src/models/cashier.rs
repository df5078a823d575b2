//! Frames exchanged over the cashier WebSocket
//!
//! Every client frame carrying an `id` is acknowledged exactly once with an
//! `ack` frame holding `{ success: true, ... }` or
//! `{ success: false, error: { type, kind, message } }`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{CashierError, ErrorKind};
use crate::models::user::UserSnapshot;

/// Cashier RPC event names
pub mod events {
    pub const SEND_CASHAPP_DEPOSIT: &str = "sendCashappDeposit";
    pub const CHECK_CASHAPP_DEPOSIT: &str = "checkCashappDeposit";
    pub const SEND_CREDIT_DEPOSIT: &str = "sendCreditDeposit";
    pub const SEND_CRYPTO_DEPOSIT: &str = "sendCryptoDeposit";
    pub const GET_CRYPTO_PRICES: &str = "getCryptoPrices";
}

/// Request frame from the client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    /// Correlates the acknowledgement; frames without an id are fire-and-forget
    pub id: Option<u64>,
    pub event: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Frame sent to the client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// Acknowledgement of a client request
    #[serde(rename = "ack")]
    Ack { id: u64, response: Value },
    /// Balance update for the session's user
    #[serde(rename = "user")]
    User { user: UserSnapshot },
    /// Frame could not be understood
    #[serde(rename = "error")]
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub error_type: &'static str,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&CashierError> for ErrorBody {
    fn from(err: &CashierError) -> Self {
        Self {
            error_type: "error",
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

/// `{ success: true, ...payload }`. Non-object payloads land under `data`.
pub fn success_response<T: Serialize>(payload: &T) -> Value {
    let mut body = match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => map,
        Ok(Value::Null) => Map::new(),
        Ok(other) => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
        Err(e) => return failure_response(&CashierError::validation(format!(
            "Failed to encode response: {}",
            e
        ))),
    };
    body.insert("success".to_string(), Value::Bool(true));
    Value::Object(body)
}

pub fn failure_response(err: &CashierError) -> Value {
    serde_json::json!({
        "success": false,
        "error": ErrorBody::from(err),
    })
}
