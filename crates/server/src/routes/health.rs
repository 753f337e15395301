use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::handler::AppState;

/// GET /health - store liveness.
///
/// Returns 200 when the store answers a trivial query, 503 otherwise.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable", "detail": e.to_string() })))
        }
    }
}
