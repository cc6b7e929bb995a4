use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::join_all;
use ghpower_core::{
    config::{RefreshMode, SchedulerConfig},
    Username,
};
use ghpower_github::ProfileFetcher;
use ghpower_leaderboard::LeaderboardEngine;
use ghpower_store::ProfileStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    pipeline::RefreshPipeline,
    staleness::is_stale,
    types::{CycleReport, SchedulerConfigView, SchedulerStatus},
};

/// Periodic batch refresher.
///
/// Cheap to clone; every clone controls the same scheduler. Several
/// independent schedulers may coexist.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    config: SchedulerConfig,
    store: Arc<dyn ProfileStore>,
    pipeline: RefreshPipeline,
    leaderboard: Arc<LeaderboardEngine>,
    /// Re-entrancy guard: set while a cycle runs.
    updating: AtomicBool,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    timer: Option<Timer>,
    /// Bumped on every `start`; a timer task only touches state while its
    /// generation is current.
    generation: u64,
    next_update_at: Option<DateTime<Utc>>,
    last_report: Option<CycleReport>,
}

struct Timer {
    generation: u64,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Clears the re-entrancy flag when the cycle ends, however it ends.
struct CycleGuard {
    inner: Arc<Inner>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.inner.updating.store(false, Ordering::Release);
    }
}

impl RefreshScheduler {
    pub fn new(
        config: SchedulerConfig,
        store: Arc<dyn ProfileStore>,
        fetcher: Arc<dyn ProfileFetcher>,
        leaderboard: Arc<LeaderboardEngine>,
    ) -> Self {
        let pipeline = RefreshPipeline::new(Arc::clone(&store), fetcher);
        Self {
            inner: Arc::new(Inner {
                config: config.validated(),
                store,
                pipeline,
                leaderboard,
                updating: AtomicBool::new(false),
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Pipeline sharing this scheduler's store and fetcher, for on-demand
    /// refreshes outside a cycle.
    pub fn pipeline(&self) -> &RefreshPipeline {
        &self.inner.pipeline
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.inner.config.update_interval_secs)
    }

    /// Start the timer loop. The first cycle runs one full interval from now.
    /// Returns `false` if already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut state = self.state();
        if state.timer.is_some() {
            debug!("scheduler already running");
            return false;
        }

        state.generation += 1;
        let generation = state.generation;
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(self.clone().run_timer(generation, rx));
        state.timer = Some(Timer {
            generation,
            shutdown: tx,
            task,
        });
        state.next_update_at = next_tick_at(self.interval());

        info!(
            interval_secs = self.inner.config.update_interval_secs,
            batch_size = self.inner.config.batch_size,
            "refresh scheduler started"
        );
        true
    }

    /// Stop the timer loop. A cycle already in progress runs to completion.
    /// Returns `false` if not running.
    pub fn stop(&self) -> bool {
        let timer = {
            let mut state = self.state();
            state.next_update_at = None;
            state.timer.take()
        };
        match timer {
            Some(timer) => {
                let _ = timer.shutdown.send(true);
                info!("refresh scheduler stopped");
                true
            }
            None => false,
        }
    }

    /// Stop and wait for the timer task to exit, including any cycle it is
    /// running.
    pub async fn shutdown(&self) {
        let timer = {
            let mut state = self.state();
            state.next_update_at = None;
            state.timer.take()
        };
        if let Some(timer) = timer {
            let _ = timer.shutdown.send(true);
            if let Err(e) = timer.task.await {
                warn!(error = %e, "scheduler timer task ended abnormally");
            }
            info!("refresh scheduler shut down");
        }
    }

    /// Start a cycle in the background. Returns `false` (and does nothing)
    /// if a cycle is already running. Works while stopped.
    pub fn trigger_update(&self) -> bool {
        let Some(guard) = self.try_begin() else {
            debug!("manual trigger ignored, cycle in progress");
            return false;
        };
        let this = self.clone();
        tokio::spawn(async move {
            this.run_guarded(guard).await;
        });
        true
    }

    /// Run a cycle on the caller's task. `None` if one was already running.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        let guard = self.try_begin()?;
        Some(self.run_guarded(guard).await)
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.state();
        let next_update_at = state.next_update_at;
        SchedulerStatus {
            is_running: state.timer.is_some(),
            is_updating: self.inner.updating.load(Ordering::Acquire),
            next_update_at,
            next_update_in: next_update_at
                .map(|at| at.signed_duration_since(Utc::now()).num_seconds().max(0) as u64),
        }
    }

    pub fn config(&self) -> SchedulerConfigView {
        let c = &self.inner.config;
        SchedulerConfigView {
            update_interval_seconds: c.update_interval_secs,
            batch_size: c.batch_size,
            batch_delay_seconds: c.batch_delay_secs,
            refresh_mode: c.refresh_mode,
            max_age_minutes: c.max_age_minutes,
        }
    }

    pub fn last_report(&self) -> Option<CycleReport> {
        self.state().last_report.clone()
    }

    // --- private helpers ---------------------------------------------------

    fn try_begin(&self) -> Option<CycleGuard> {
        self.inner
            .updating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard {
                inner: Arc::clone(&self.inner),
            })
    }

    /// Timer loop. Sleeps one interval, runs a cycle unless one is already
    /// running, repeats until `shutdown` flips to `true`.
    async fn run_timer(self, generation: u64, mut shutdown: watch::Receiver<bool>) {
        let period = self.interval();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(period) => {
                    match self.try_begin() {
                        Some(guard) => {
                            self.run_guarded(guard).await;
                        }
                        None => debug!("timer tick dropped, cycle in progress"),
                    }
                    self.schedule_next(generation, period);
                }
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        debug!("scheduler timer loop exiting");
                        break;
                    }
                }
            }
        }
    }

    fn schedule_next(&self, generation: u64, period: Duration) {
        let mut state = self.state();
        if state.timer.as_ref().is_some_and(|t| t.generation == generation) {
            state.next_update_at = next_tick_at(period);
        }
    }

    async fn run_guarded(&self, guard: CycleGuard) -> CycleReport {
        let cycle_id = Uuid::now_v7();
        let report = self
            .run_cycle_inner(cycle_id)
            .instrument(info_span!("refresh_cycle", %cycle_id))
            .await;
        self.state().last_report = Some(report.clone());
        drop(guard);
        report
    }

    async fn run_cycle_inner(&self, cycle_id: Uuid) -> CycleReport {
        let config = &self.inner.config;
        let started_at = Utc::now();
        let mut report = CycleReport::new(cycle_id, started_at);

        let candidates = self.select_candidates(started_at);
        report.candidates = candidates.len();
        info!(candidates = candidates.len(), mode = ?config.refresh_mode, "refresh cycle started");

        let delay = Duration::from_secs(config.batch_delay_secs);
        for (i, batch) in candidates.chunks(config.batch_size).enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let outcomes = join_all(batch.iter().map(|u| self.inner.pipeline.refresh(u))).await;
            for outcome in &outcomes {
                report.record(outcome);
            }
            report.batches += 1;
            debug!(batch = i + 1, size = batch.len(), "batch finished");
        }

        // Recompute before the guard is released so the next cycle sees fresh boards.
        if let Err(e) = self.inner.leaderboard.recompute_all() {
            warn!(error = %e, "leaderboard recompute failed after refresh cycle");
        }

        report.finished_at = Utc::now();
        info!(
            refreshed = report.refreshed,
            preserved = report.preserved,
            fallback = report.fallback,
            failed = report.failed,
            batches = report.batches,
            "refresh cycle finished"
        );
        report
    }

    fn select_candidates(&self, now: DateTime<Utc>) -> Vec<Username> {
        let config = &self.inner.config;
        let profiles = match self.inner.store.list_all() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "could not list cached profiles, nothing to refresh");
                return Vec::new();
            }
        };
        profiles
            .into_iter()
            .filter(|p| match config.refresh_mode {
                RefreshMode::All => true,
                RefreshMode::Stale => is_stale(Some(p), config.max_age_minutes, now),
            })
            .map(|p| p.username)
            .collect()
    }
}

/// Wall-clock instant one `period` from now, `None` if unrepresentable.
fn next_tick_at(period: Duration) -> Option<DateTime<Utc>> {
    let period = TimeDelta::from_std(period).ok()?;
    Utc::now().checked_add_signed(period)
}
