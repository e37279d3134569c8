use axum::{extract::State, response::Json};
use serde_json::{Value, json};

use crate::AppState;

/// Pool status and the active draw settings. Never draws.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let stats = state.pool_stats();
    let policy = state.draw.policy();
    Json(json!({
        "status": "ok",
        "remaining": stats.remaining,
        "generation": stats.generation.0,
        "expired": stats.expired,
        "refilling": state.refill.is_refilling(),
        "watermark": state.refill.watermark(),
        "retry_budget": policy.retry_budget,
        "deadline_ms": policy.deadline.as_millis() as u64,
    }))
}
