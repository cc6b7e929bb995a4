use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use ghpower_core::config::GhpowerConfig;
use ghpower_github::ProfileFetcher;
use ghpower_leaderboard::LeaderboardEngine;
use ghpower_scheduler::{RefreshScheduler, StalenessPolicy};
use ghpower_store::ProfileStore;

use crate::http;

/// Central shared state: passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: GhpowerConfig,
    pub store: Arc<dyn ProfileStore>,
    pub leaderboard: Arc<LeaderboardEngine>,
    pub scheduler: RefreshScheduler,
    /// Ad hoc freshness checks for profile lookups.
    pub staleness: StalenessPolicy,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: GhpowerConfig,
        store: Arc<dyn ProfileStore>,
        fetcher: Arc<dyn ProfileFetcher>,
    ) -> Self {
        let leaderboard = Arc::new(LeaderboardEngine::new(Arc::clone(&store)));
        let scheduler = RefreshScheduler::new(
            config.scheduler.clone(),
            Arc::clone(&store),
            fetcher,
            Arc::clone(&leaderboard),
        );
        let staleness = StalenessPolicy::new(Arc::clone(&store), config.scheduler.max_age_minutes);
        Self {
            config,
            store,
            leaderboard,
            scheduler,
            staleness,
            started_at: Utc::now(),
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(http::health::health_handler))
        .route("/api/scheduler/status", get(http::scheduler::status))
        .route("/api/scheduler/config", get(http::scheduler::config))
        .route("/api/scheduler/start", post(http::scheduler::start))
        .route("/api/scheduler/stop", post(http::scheduler::stop))
        .route("/api/scheduler/trigger", post(http::scheduler::trigger))
        .route("/api/leaderboard/{metric}", get(http::leaderboard::board))
        .route("/api/profiles/{username}", get(http::profiles::show))
        .route("/api/profiles/{username}/refresh", post(http::profiles::refresh))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
