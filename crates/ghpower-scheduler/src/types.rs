use chrono::{DateTime, Utc};
use ghpower_core::{config::RefreshMode, Username};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of the scheduler's runtime state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Timer loop is active.
    pub is_running: bool,
    /// A refresh cycle is in progress.
    pub is_updating: bool,
    pub next_update_at: Option<DateTime<Utc>>,
    /// Seconds until `next_update_at`, clamped at 0.
    pub next_update_in: Option<u64>,
}

/// Effective scheduler settings, as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfigView {
    pub update_interval_seconds: u64,
    pub batch_size: usize,
    pub batch_delay_seconds: u64,
    pub refresh_mode: RefreshMode,
    pub max_age_minutes: i64,
}

/// How a single refresh attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshKind {
    Refreshed,
    Preserved,
    Fallback,
    Failed,
}

impl std::fmt::Display for RefreshKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RefreshKind::Refreshed => "refreshed",
            RefreshKind::Preserved => "preserved",
            RefreshKind::Fallback => "fallback",
            RefreshKind::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub username: Username,
    pub kind: RefreshKind,
    /// Fetch or store error message, when there was one.
    pub error: Option<String>,
}

impl RefreshOutcome {
    /// True when fresh data was written.
    pub fn is_success(&self) -> bool {
        self.kind == RefreshKind::Refreshed
    }
}

/// Summary of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Usernames selected for refresh.
    pub candidates: usize,
    pub batches: usize,
    pub refreshed: usize,
    pub preserved: usize,
    pub fallback: usize,
    pub failed: usize,
}

impl CycleReport {
    pub(crate) fn new(cycle_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            cycle_id,
            started_at,
            finished_at: started_at,
            candidates: 0,
            batches: 0,
            refreshed: 0,
            preserved: 0,
            fallback: 0,
            failed: 0,
        }
    }

    pub(crate) fn record(&mut self, outcome: &RefreshOutcome) {
        match outcome.kind {
            RefreshKind::Refreshed => self.refreshed += 1,
            RefreshKind::Preserved => self.preserved += 1,
            RefreshKind::Fallback => self.fallback += 1,
            RefreshKind::Failed => self.failed += 1,
        }
    }
}
