//! `ghpower-leaderboard`: per-metric rankings over the profile cache.

pub mod engine;
pub mod metric;

pub use engine::{rank_profiles, LeaderboardEngine, LeaderboardEntry};
pub use metric::Metric;
