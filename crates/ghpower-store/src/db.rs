use rusqlite::Connection;

use crate::error::Result;

/// Initialise the profile cache table.
///
/// Safe to call on every startup: uses `IF NOT EXISTS` throughout.
/// `id` records first-insertion order; upserts keep it, so `list_all`
/// enumerates profiles in the order they were first cached.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS cached_profiles (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT NOT NULL UNIQUE,
            profile       TEXT NOT NULL,   -- JSON-encoded GithubProfile
            last_updated  TEXT NOT NULL,   -- RFC3339
            refresh_count INTEGER NOT NULL DEFAULT 0,
            fetch_failed  INTEGER NOT NULL DEFAULT 0,
            fetch_error   TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_cached_profiles_updated
            ON cached_profiles(last_updated);",
    )?;
    Ok(())
}
