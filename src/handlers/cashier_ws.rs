//! WebSocket handler for the cashier RPC
//!
//! Provides `/cashier/ws`. The session user is taken from the `x-user-id`
//! header set by the gateway in front of this service. Clients send
//! request frames:
//!
//! ```json
//! { "id": 1, "event": "sendCashappDeposit", "data": { "amount": 10 } }
//! ```
//!
//! and receive one acknowledgement per frame carrying an `id`:
//!
//! ```json
//! { "type": "ack", "id": 1, "response": { "success": true, "note": "..." } }
//! ```
//!
//! After a successful credit the owner's sessions also receive
//! `{ "type": "user", "user": { ... } }`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::entities::{prelude::Users, users};
use crate::errors::{CashierError, GENERIC_FAILURE};
use crate::models::cashier::{
    events, failure_response, success_response, ClientFrame, ServerFrame,
};
use crate::models::deposit::CryptoPrices;
use crate::services::{deposit_creator, deposit_verifier};
use crate::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// GET /cashier/ws
pub async fn cashier_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let user = match resolve_session_user(&state.db, &headers).await {
        Ok(user) => user,
        Err(status) => {
            let error = CashierError::validation(match status {
                StatusCode::UNAUTHORIZED => "You must be signed in to use the cashier.",
                _ => GENERIC_FAILURE,
            });
            return (status, Json(failure_response(&error))).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user.id))
}

/// Look up the user named by the `x-user-id` header
pub async fn resolve_session_user(
    db: &DatabaseConnection,
    headers: &HeaderMap,
) -> Result<users::Model, StatusCode> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i32>().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match Users::find_by_id(user_id).one(db).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            warn!("Cashier connection for unknown user {}", user_id);
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e) => {
            error!("Failed to load session user {}: {}", user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: i32) {
    let (mut sender, mut receiver) = socket.split();

    info!("New cashier WebSocket connection for user {}", user_id);

    let mut user_rx = state.user_broadcaster.subscribe();
    let mut heartbeat = tokio::time::interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            result = user_rx.recv() => {
                match result {
                    Ok(event) => {
                        if event.user_id == user_id {
                            let frame = ServerFrame::User { user: event.user };
                            if let Err(e) = send_frame(&mut sender, &frame).await {
                                debug!("WebSocket send error: {}", e);
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Missed {} user events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("User broadcast channel closed");
                        break;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if let Err(e) = sender.send(Message::Ping(axum::body::Bytes::new())).await {
                    debug!("Heartbeat failed: {}", e);
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(frame) = handle_text(&state, user_id, text.as_str()).await {
                            if let Err(e) = send_frame(&mut sender, &frame).await {
                                debug!("WebSocket send error: {}", e);
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket closed by client");
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket receive error: {}", e);
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("Cashier WebSocket connection closed for user {}", user_id);
}

async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    match serde_json::to_string(frame) {
        Ok(text) => sender.send(Message::Text(text.into())).await,
        Err(e) => {
            error!("Failed to encode cashier frame: {}", e);
            Ok(())
        }
    }
}

/// Decode one text frame and produce the reply, if any.
///
/// Frames without an `id` are executed but not acknowledged.
pub async fn handle_text(state: &AppState, user_id: i32, text: &str) -> Option<ServerFrame> {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => {
            let response = dispatch(state, user_id, &frame.event, frame.data).await;
            frame.id.map(|id| ServerFrame::Ack { id, response })
        }
        Err(e) => {
            debug!("Unreadable cashier frame from user {}: {}", user_id, e);
            Some(ServerFrame::Error {
                message: format!("Invalid frame: {}", e),
            })
        }
    }
}

/// Run one cashier event for `user_id` and build its response envelope.
///
/// Always returns a response; failures become `{ success: false, error }`.
pub async fn dispatch(state: &AppState, user_id: i32, event: &str, data: Option<Value>) -> Value {
    let result = match state.anti_spam.acquire(user_id) {
        Ok(_guard) => route(state, user_id, event, data).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => response,
        Err(e) => {
            match &e {
                CashierError::Persistence(_) | CashierError::ExternalService(_) => {
                    error!("{} failed for user {}: {}", event, user_id, e)
                }
                _ => debug!("{} rejected for user {}: {}", event, user_id, e),
            }
            failure_response(&e)
        }
    }
}

async fn route(
    state: &AppState,
    user_id: i32,
    event: &str,
    data: Option<Value>,
) -> Result<Value, CashierError> {
    match event {
        events::SEND_CASHAPP_DEPOSIT => {
            let created =
                deposit_creator::create_cashapp_deposit(state, user_id, payload(data)?).await?;
            Ok(success_response(&created))
        }
        events::CHECK_CASHAPP_DEPOSIT => {
            let credited = deposit_verifier::check_cashapp_deposit(state, payload(data)?).await?;
            Ok(success_response(&credited))
        }
        events::SEND_CREDIT_DEPOSIT => {
            let created =
                deposit_creator::create_card_deposit(state, user_id, payload(data)?).await?;
            Ok(success_response(&created))
        }
        events::SEND_CRYPTO_DEPOSIT => {
            let created =
                deposit_creator::create_crypto_deposit(state, user_id, payload(data)?).await?;
            Ok(success_response(&created))
        }
        events::GET_CRYPTO_PRICES => {
            let prices = state.crypto.prices().await?;
            Ok(success_response(&CryptoPrices { prices }))
        }
        other => Err(CashierError::validation(format!(
            "Unknown cashier event: {}",
            other
        ))),
    }
}

/// Missing or malformed request data
fn payload<T: DeserializeOwned>(data: Option<Value>) -> Result<T, CashierError> {
    let data = data
        .filter(|data| !data.is_null())
        .ok_or_else(|| CashierError::validation(GENERIC_FAILURE))?;

    serde_json::from_value(data).map_err(|_| CashierError::validation(GENERIC_FAILURE))
}
