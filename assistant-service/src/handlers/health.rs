use axum::{response::IntoResponse, Json};
use serde_json::json;

/// Liveness only; never touches the model client.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
