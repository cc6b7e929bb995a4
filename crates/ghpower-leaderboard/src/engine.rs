use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ghpower_core::{CachedProfile, Username};
use ghpower_store::ProfileStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::metric::Metric;

/// One row of a leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: Username,
    /// Profile name, or the login when the profile has none.
    pub name: String,
    pub avatar_url: Option<String>,
    pub score: u64,
    /// 1-based position.
    pub rank: u32,
    pub metric: Metric,
}

/// Rank `profiles` by `metric`, highest score first.
///
/// The sort is stable: equal scores keep the order the profiles were given
/// in. Unavailable values score 0.
pub fn rank_profiles(profiles: &[CachedProfile], metric: Metric) -> Vec<LeaderboardEntry> {
    let mut scored: Vec<(&CachedProfile, u64)> = profiles
        .iter()
        .map(|p| (p, metric.extract(&p.profile).unwrap_or(0)))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (p, score))| LeaderboardEntry {
            username: p.username.clone(),
            name: p.profile.display_name().to_string(),
            avatar_url: p.profile.avatar_url.clone(),
            score,
            rank: u32::try_from(i + 1).unwrap_or(u32::MAX),
            metric,
        })
        .collect()
}

/// Holds the latest computed board for every metric.
///
/// Boards are swapped whole, so readers see either the previous or the new
/// snapshot of a metric, never a mix.
pub struct LeaderboardEngine {
    store: Arc<dyn ProfileStore>,
    boards: DashMap<Metric, Arc<Vec<LeaderboardEntry>>>,
    computed_at: Mutex<Option<DateTime<Utc>>>,
    /// Held from the store read to the last board swap, so a slower
    /// recompute never publishes an older snapshot over a newer one.
    recompute: Mutex<()>,
}

impl LeaderboardEngine {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            boards: DashMap::new(),
            computed_at: Mutex::new(None),
            recompute: Mutex::new(()),
        }
    }

    /// Rebuild every board from the store. Returns the number of profiles
    /// ranked. On a store error the existing boards are kept.
    #[instrument(skip(self))]
    pub fn recompute_all(&self) -> ghpower_store::Result<usize> {
        let _recompute = self.recompute.lock().unwrap_or_else(PoisonError::into_inner);
        let profiles = self.store.list_all().map_err(|e| {
            warn!(error = %e, "leaderboard recompute skipped, store unreadable");
            e
        })?;

        for metric in Metric::ALL {
            let board = rank_profiles(&profiles, metric);
            debug!(metric = %metric, entries = board.len(), "board rebuilt");
            self.boards.insert(metric, Arc::new(board));
        }
        *self
            .computed_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());

        info!(profiles = profiles.len(), "leaderboards recomputed");
        Ok(profiles.len())
    }

    /// Top `limit` entries (all when `None`). Empty before the first recompute.
    pub fn get(&self, metric: Metric, limit: Option<usize>) -> Vec<LeaderboardEntry> {
        let Some(board) = self.boards.get(&metric).map(|b| Arc::clone(b.value())) else {
            return Vec::new();
        };
        let take = limit.unwrap_or(board.len()).min(board.len());
        board[..take].to_vec()
    }

    /// Like [`get`](Self::get) but by metric name. Unknown names yield an
    /// empty board.
    pub fn get_by_name(&self, name: &str, limit: Option<usize>) -> Vec<LeaderboardEntry> {
        match name.parse::<Metric>() {
            Ok(metric) => self.get(metric, limit),
            Err(_) => {
                debug!(name, "unknown leaderboard metric");
                Vec::new()
            }
        }
    }

    /// Rank of `username` on `metric` in the current board.
    pub fn position_of(&self, metric: Metric, username: &Username) -> Option<u32> {
        let board = self.boards.get(&metric)?;
        board
            .iter()
            .find(|e| &e.username == username)
            .map(|e| e.rank)
    }

    pub fn computed_at(&self) -> Option<DateTime<Utc>> {
        *self.computed_at.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
