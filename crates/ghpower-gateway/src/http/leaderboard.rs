use axum::{
    extract::{Path, Query, State},
    Json,
};
use ghpower_leaderboard::LeaderboardEntry;
use serde::Deserialize;
use std::sync::Arc;

use crate::app::AppState;

/// Upper bound on `?limit=`.
const MAX_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    pub limit: Option<usize>,
}

/// GET /api/leaderboard/{metric}?limit=N: unknown metrics yield `[]`.
pub async fn board(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
    Query(query): Query<BoardQuery>,
) -> Json<Vec<LeaderboardEntry>> {
    let limit = query.limit.map(|n| n.min(MAX_LIMIT));
    Json(state.leaderboard.get_by_name(&metric, limit))
}
