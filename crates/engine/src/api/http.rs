//! HTTP routes.
//!
//! Everything game-related rides the WebSocket; HTTP is just liveness.

use axum::{routing::get, Json, Router};
use serde_json::json;

/// Create all HTTP routes.
pub fn routes() -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
