//! Scheduler control surface.
//!
//! `start`/`stop`/`trigger` never fail: a no-op (already running, already
//! stopped, cycle in progress) is reported as `false` in the response body.

use axum::{extract::State, Json};
use ghpower_scheduler::{SchedulerConfigView, SchedulerStatus};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::app::AppState;

/// GET /api/scheduler/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status())
}

/// GET /api/scheduler/config
pub async fn config(State(state): State<Arc<AppState>>) -> Json<SchedulerConfigView> {
    Json(state.scheduler.config())
}

/// POST /api/scheduler/start
pub async fn start(State(state): State<Arc<AppState>>) -> Json<Value> {
    let started = state.scheduler.start();
    Json(json!({ "started": started, "status": state.scheduler.status() }))
}

/// POST /api/scheduler/stop
pub async fn stop(State(state): State<Arc<AppState>>) -> Json<Value> {
    let stopped = state.scheduler.stop();
    Json(json!({ "stopped": stopped, "status": state.scheduler.status() }))
}

/// POST /api/scheduler/trigger: start a refresh cycle now.
pub async fn trigger(State(state): State<Arc<AppState>>) -> Json<Value> {
    let triggered = state.scheduler.trigger_update();
    info!(triggered, "manual refresh requested");
    Json(json!({ "triggered": triggered, "last_report": state.scheduler.last_report() }))
}
