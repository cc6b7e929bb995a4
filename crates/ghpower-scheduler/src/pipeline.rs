use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use ghpower_core::{CachedProfile, GithubProfile, Username};
use ghpower_github::{FetchError, ProfileFetcher, ProfileSnapshot};
use ghpower_store::ProfileStore;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, instrument, warn};

use crate::types::{RefreshKind, RefreshOutcome};

type UserLocks = DashMap<Username, Arc<Mutex<()>>>;

/// Fetch, derive and write one user's profile.
///
/// Never fails outright: fetch errors keep the previous snapshot (or write a
/// placeholder), store errors are reported as [`RefreshKind::Failed`].
///
/// Refreshes of the same user are serialized; each one reads the record the
/// previous one wrote.
#[derive(Clone)]
pub struct RefreshPipeline {
    store: Arc<dyn ProfileStore>,
    fetcher: Arc<dyn ProfileFetcher>,
    locks: Arc<UserLocks>,
}

/// Exclusive turn on one username. Drops its map entry once nobody else
/// is waiting for it.
struct UserTurn {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<UserLocks>,
    username: Username,
}

impl Drop for UserTurn {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.username, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl RefreshPipeline {
    pub fn new(store: Arc<dyn ProfileStore>, fetcher: Arc<dyn ProfileFetcher>) -> Self {
        Self {
            store,
            fetcher,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    #[instrument(skip(self), fields(username = %username))]
    pub async fn refresh(&self, username: &Username) -> RefreshOutcome {
        let _turn = self.turn(username).await;
        let previous = match self.read(username) {
            Ok(p) => p,
            Err(failed) => return failed,
        };
        let fetched = self.fetcher.fetch_profile(username).await;
        self.write(username, previous, fetched)
    }

    /// Like [`refresh`](Self::refresh), but a user with no cached record
    /// whom GitHub reports as nonexistent is not stored. Returns `None` in
    /// that case.
    #[instrument(skip(self), fields(username = %username))]
    pub async fn refresh_on_demand(&self, username: &Username) -> Option<RefreshOutcome> {
        let _turn = self.turn(username).await;
        let previous = match self.read(username) {
            Ok(p) => p,
            Err(failed) => return Some(failed),
        };
        match self.fetcher.fetch_profile(username).await {
            Err(FetchError::NotFound) if previous.is_none() => {
                debug!("unknown github user, nothing cached");
                None
            }
            fetched => Some(self.write(username, previous, fetched)),
        }
    }

    async fn turn(&self, username: &Username) -> UserTurn {
        let lock = self.locks.entry(username.clone()).or_default().value().clone();
        UserTurn {
            guard: Some(lock.lock_owned().await),
            locks: Arc::clone(&self.locks),
            username: username.clone(),
        }
    }

    fn read(&self, username: &Username) -> Result<Option<CachedProfile>, RefreshOutcome> {
        self.store.get(username).map_err(|e| {
            error!(error = %e, "could not read cached profile");
            outcome(username, RefreshKind::Failed, Some(e.to_string()))
        })
    }

    fn write(
        &self,
        username: &Username,
        previous: Option<CachedProfile>,
        fetched: Result<ProfileSnapshot, FetchError>,
    ) -> RefreshOutcome {
        let refresh_count = previous.as_ref().map_or(0, |p| p.refresh_count) + 1;

        let (record, kind) = match fetched {
            Ok(snapshot) => (
                CachedProfile {
                    username: username.clone(),
                    profile: snapshot.into_profile(),
                    last_updated: Utc::now(),
                    refresh_count,
                    fetch_failed: false,
                    fetch_error: None,
                },
                RefreshKind::Refreshed,
            ),
            Err(e) => {
                let message = e.to_string();
                let (profile, kind) = match previous {
                    Some(prev) => {
                        warn!(error = %message, "fetch failed, keeping previous profile");
                        (prev.profile, RefreshKind::Preserved)
                    }
                    None => {
                        warn!(error = %message, "fetch failed, saving placeholder profile");
                        (GithubProfile::placeholder(username), RefreshKind::Fallback)
                    }
                };
                (
                    CachedProfile {
                        username: username.clone(),
                        profile,
                        last_updated: Utc::now(),
                        refresh_count,
                        fetch_failed: true,
                        fetch_error: Some(message),
                    },
                    kind,
                )
            }
        };

        if let Err(e) = self.store.put(&record) {
            error!(error = %e, "could not write cached profile");
            return outcome(username, RefreshKind::Failed, Some(e.to_string()));
        }

        info!(kind = %kind, refresh_count, "profile refreshed");
        outcome(username, kind, record.fetch_error)
    }
}

fn outcome(username: &Username, kind: RefreshKind, error: Option<String>) -> RefreshOutcome {
    RefreshOutcome {
        username: username.clone(),
        kind,
        error,
    }
}
