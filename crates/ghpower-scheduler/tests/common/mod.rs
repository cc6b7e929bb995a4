#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use ghpower_core::{config::SchedulerConfig, CachedProfile, GithubProfile, Username};
use ghpower_github::{FetchError, GithubRepo, GithubUser, ProfileFetcher, ProfileSnapshot};
use ghpower_leaderboard::LeaderboardEngine;
use ghpower_scheduler::RefreshScheduler;
use ghpower_store::MemoryProfileStore;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Fetcher that records every call and can fail or block on demand.
///
/// Successful fetches report one repository whose star count equals the
/// login length.
pub struct ScriptedFetcher {
    failing: HashSet<String>,
    gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, logins: &[&str]) -> Self {
        self.failing = logins.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Every fetch waits for one permit from `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProfileFetcher for ScriptedFetcher {
    async fn fetch_profile(&self, username: &Username) -> Result<ProfileSnapshot, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((username.to_string(), Instant::now()));
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.failing.contains(username.as_str()) {
            return Err(FetchError::Transient("connection reset".into()));
        }
        Ok(ProfileSnapshot {
            user: GithubUser {
                login: username.to_string(),
                public_repos: Some(1),
                ..GithubUser::default()
            },
            repos: vec![GithubRepo {
                name: "main".into(),
                stargazers_count: username.as_str().len() as u64,
                ..GithubRepo::default()
            }],
            contributions: None,
        })
    }
}

/// A cached profile last refreshed `minutes_old` minutes ago.
pub fn cached(login: &str, minutes_old: i64) -> CachedProfile {
    let username = Username::parse(login).unwrap();
    CachedProfile {
        profile: GithubProfile {
            login: username.to_string(),
            name: Some(format!("{login} (cached)")),
            total_stars: Some(1),
            ..GithubProfile::default()
        },
        username,
        last_updated: Utc::now() - Duration::minutes(minutes_old),
        refresh_count: 1,
        fetch_failed: false,
        fetch_error: None,
    }
}

pub struct Harness {
    pub store: Arc<MemoryProfileStore>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub leaderboard: Arc<LeaderboardEngine>,
    pub scheduler: RefreshScheduler,
}

pub fn harness(
    config: SchedulerConfig,
    profiles: Vec<CachedProfile>,
    fetcher: ScriptedFetcher,
) -> Harness {
    let store = Arc::new(MemoryProfileStore::with_profiles(profiles));
    let fetcher = Arc::new(fetcher);
    let leaderboard = Arc::new(LeaderboardEngine::new(store.clone()));
    let scheduler = RefreshScheduler::new(
        config,
        store.clone(),
        fetcher.clone(),
        leaderboard.clone(),
    );
    Harness {
        store,
        fetcher,
        leaderboard,
        scheduler,
    }
}

/// Poll until the scheduler reports no cycle in progress. Sleeps between
/// polls so paused-clock tests can auto-advance through batch delays.
pub async fn wait_idle(scheduler: &RefreshScheduler) {
    tokio::time::timeout(std::time::Duration::from_secs(30), async {
        while scheduler.status().is_updating {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("cycle did not finish");
}
