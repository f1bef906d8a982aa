use axum::Json;
use serde_json::{Value, json};

/// Liveness probe
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
