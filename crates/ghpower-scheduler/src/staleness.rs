use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use ghpower_core::{config::MAX_AGE_LIMIT_MINUTES, CachedProfile, Username};
use ghpower_store::ProfileStore;

use crate::error::Result;

pub const DEFAULT_MAX_AGE_MINUTES: i64 = 30;

/// A profile is stale when it is missing or strictly older than
/// `max_age_minutes` at `now`. A profile exactly at the limit is fresh.
pub fn is_stale(cached: Option<&CachedProfile>, max_age_minutes: i64, now: DateTime<Utc>) -> bool {
    match cached {
        None => true,
        // an age too large to represent is never exceeded
        Some(p) => Duration::try_minutes(max_age_minutes).is_some_and(|max| p.age(now) > max),
    }
}

/// Staleness checks against the live cache, for callers outside a cycle.
#[derive(Clone)]
pub struct StalenessPolicy {
    store: Arc<dyn ProfileStore>,
    max_age_minutes: i64,
}

impl StalenessPolicy {
    pub fn new(store: Arc<dyn ProfileStore>, max_age_minutes: i64) -> Self {
        Self {
            store,
            max_age_minutes: max_age_minutes.clamp(0, MAX_AGE_LIMIT_MINUTES),
        }
    }

    pub fn with_default_age(store: Arc<dyn ProfileStore>) -> Self {
        Self::new(store, DEFAULT_MAX_AGE_MINUTES)
    }

    pub fn max_age_minutes(&self) -> i64 {
        self.max_age_minutes
    }

    pub fn is_stale(&self, username: &Username) -> Result<bool> {
        let cached = self.store.get(username)?;
        Ok(is_stale(cached.as_ref(), self.max_age_minutes, Utc::now()))
    }
}
