pub mod cashier_ws;
pub mod health;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::hello_cashier))
        .route("/health", get(health::health))
        .route("/cashier/ws", get(cashier_ws::cashier_websocket))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
