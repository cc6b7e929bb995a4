//! `ghpower-store`: persistence for cached GitHub profiles.
//!
//! The refresh pipeline and the leaderboard engine only see the narrow
//! [`ProfileStore`] contract. Two backends are provided: SQLite for the
//! gateway and an in-memory map for tests and database-less runs.

pub mod db;
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryProfileStore;
pub use sqlite::SqliteProfileStore;
pub use store::ProfileStore;
