use axum::Json;
use serde_json::{json, Value};

pub async fn hello_cashier() -> &'static str {
    "Hello from Cashier Backend!"
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
