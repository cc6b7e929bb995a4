use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let profiles = state.store.count().ok();
    let scheduler = state.scheduler.status();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at,
        "profiles": profiles,
        "github_authenticated": state.config.github.token.is_some(),
        "scheduler_running": scheduler.is_running,
        "leaderboards_computed_at": state.leaderboard.computed_at(),
    }))
}
