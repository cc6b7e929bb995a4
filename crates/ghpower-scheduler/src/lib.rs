//! `ghpower-scheduler`: keeps the profile cache fresh.
//!
//! # Overview
//!
//! A [`RefreshScheduler`] wakes every `update_interval_secs`, selects the
//! cached usernames due for a refresh, and runs them through the
//! [`RefreshPipeline`] in batches of `batch_size`, sleeping
//! `batch_delay_secs` between batches. When the cycle is done the
//! leaderboards are recomputed.
//!
//! | Outcome     | Meaning                                              |
//! |-------------|------------------------------------------------------|
//! | `Refreshed` | Fetch succeeded, new snapshot written                |
//! | `Preserved` | Fetch failed, previous snapshot kept and re-stamped  |
//! | `Fallback`  | Fetch failed, no previous snapshot, placeholder saved |
//! | `Failed`    | The store could not be read or written               |
//!
//! At most one cycle runs at a time per scheduler; a timer tick or manual
//! trigger that arrives mid-cycle is dropped, not queued.

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod staleness;
pub mod types;

pub use engine::RefreshScheduler;
pub use error::{Result, SchedulerError};
pub use pipeline::RefreshPipeline;
pub use staleness::{is_stale, StalenessPolicy, DEFAULT_MAX_AGE_MINUTES};
pub use types::{CycleReport, RefreshKind, RefreshOutcome, SchedulerConfigView, SchedulerStatus};
