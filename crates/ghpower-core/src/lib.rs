//! `ghpower-core`: shared types, configuration and the power-level curve.
//!
//! Everything in this crate is synchronous and free of I/O except
//! [`config::GhpowerConfig::load`], which reads the TOML file.

pub mod config;
pub mod error;
pub mod level;
pub mod types;

pub use error::{GhpowerError, Result};
pub use level::{level_from_points, progress_from_points, LevelProgress};
pub use types::{CachedProfile, GithubProfile, LanguageShare, Username};
