use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use ghpower_core::{progress_from_points, CachedProfile, GhpowerError, LevelProgress, Username};
use ghpower_leaderboard::Metric;
use ghpower_scheduler::{RefreshKind, RefreshOutcome};
use serde::Serialize;
use tracing::{debug, warn};

use super::error::ApiResult;
use crate::app::AppState;

/// Cached profile plus everything derived from it.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub cached: CachedProfile,
    pub power_points: u64,
    pub power: LevelProgress,
    /// Rank per metric; `null` before the user appears on a board.
    pub ranks: BTreeMap<&'static str, Option<u32>>,
    /// Set when this request refreshed the profile.
    pub refreshed: Option<RefreshKind>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub outcome: RefreshOutcome,
    pub profile: ProfileView,
}

/// GET /api/profiles/{username}: refreshes first when missing or stale.
///
/// A login GitHub does not know is answered with 404 and not cached.
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<ProfileView>> {
    let username = Username::parse(&raw)?;

    let refreshed = if state.staleness.is_stale(&username)? {
        debug!(%username, "profile missing or stale, refreshing on demand");
        let outcome = state.scheduler.pipeline().refresh_on_demand(&username).await;
        if outcome.is_some() {
            recompute_boards(&state);
        }
        outcome.map(|o| o.kind)
    } else {
        None
    };

    let cached = load(&state, &username)?;
    Ok(Json(view(&state, cached, refreshed)))
}

/// POST /api/profiles/{username}/refresh: refresh regardless of age.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<RefreshResponse>> {
    let username = Username::parse(&raw)?;

    let outcome = state.scheduler.pipeline().refresh(&username).await;
    if outcome.kind == RefreshKind::Failed {
        return Err(GhpowerError::Database(outcome.error.unwrap_or_default()).into());
    }
    recompute_boards(&state);

    let cached = load(&state, &username)?;
    let profile = view(&state, cached, Some(outcome.kind));
    Ok(Json(RefreshResponse { outcome, profile }))
}

fn load(state: &AppState, username: &Username) -> ApiResult<CachedProfile> {
    state.store.get(username)?.ok_or_else(|| {
        GhpowerError::ProfileNotFound {
            username: username.to_string(),
        }
        .into()
    })
}

fn recompute_boards(state: &AppState) {
    if let Err(e) = state.leaderboard.recompute_all() {
        warn!(error = %e, "leaderboard recompute after on-demand refresh failed");
    }
}

fn view(state: &AppState, cached: CachedProfile, refreshed: Option<RefreshKind>) -> ProfileView {
    let power_points = cached.profile.power_points();
    let ranks = Metric::ALL
        .into_iter()
        .map(|m| (m.as_str(), state.leaderboard.position_of(m, &cached.username)))
        .collect();
    ProfileView {
        power_points,
        power: progress_from_points(power_points),
        ranks,
        refreshed,
        cached,
    }
}
