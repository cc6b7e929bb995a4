use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use ghpower_core::{CachedProfile, GithubProfile, Username};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, instrument, warn};

use crate::db::init_db;
use crate::error::{Result, StoreError};
use crate::store::ProfileStore;

/// Profile cache backed by a single SQLite connection.
///
/// Wraps the connection in a `Mutex`, like the other single-node managers;
/// every call holds the lock only for one statement.
pub struct SqliteProfileStore {
    db: Mutex<Connection>,
}

/// Raw column values, decoded outside the rusqlite row closure.
struct ProfileRow {
    username: String,
    profile: String,
    last_updated: String,
    refresh_count: i64,
    fetch_failed: bool,
    fetch_error: Option<String>,
}

impl SqliteProfileStore {
    /// Wrap an open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProfileStore for SqliteProfileStore {
    #[instrument(skip(self), fields(username = %username))]
    fn get(&self, username: &Username) -> Result<Option<CachedProfile>> {
        let row = self
            .conn()
            .query_row(
                "SELECT username, profile, last_updated, refresh_count, fetch_failed, fetch_error
                 FROM cached_profiles WHERE username = ?1",
                rusqlite::params![username.as_str()],
                read_row,
            )
            .optional()?;
        row.map(decode_row).transpose()
    }

    #[instrument(skip(self, profile), fields(username = %profile.username))]
    fn put(&self, profile: &CachedProfile) -> Result<()> {
        let json = serde_json::to_string(&profile.profile)?;
        self.conn().execute(
            "INSERT INTO cached_profiles
             (username, profile, last_updated, refresh_count, fetch_failed, fetch_error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(username) DO UPDATE SET
                profile       = excluded.profile,
                last_updated  = excluded.last_updated,
                refresh_count = excluded.refresh_count,
                fetch_failed  = excluded.fetch_failed,
                fetch_error   = excluded.fetch_error",
            rusqlite::params![
                profile.username.as_str(),
                json,
                profile.last_updated.to_rfc3339(),
                profile.refresh_count as i64,
                profile.fetch_failed,
                profile.fetch_error,
            ],
        )?;
        debug!(refresh_count = profile.refresh_count, "profile written");
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<CachedProfile>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT username, profile, last_updated, refresh_count, fetch_failed, fetch_error
             FROM cached_profiles ORDER BY id",
        )?;
        let rows: Vec<ProfileRow> = stmt
            .query_map([], read_row)?
            .collect::<rusqlite::Result<_>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match decode_row(row) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable cached profile");
                    None
                }
            })
            .collect())
    }

    fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM cached_profiles", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        username: row.get(0)?,
        profile: row.get(1)?,
        last_updated: row.get(2)?,
        refresh_count: row.get(3)?,
        fetch_failed: row.get(4)?,
        fetch_error: row.get(5)?,
    })
}

/// Map raw columns to a `CachedProfile`.
///
/// A profile payload that no longer decodes is replaced by a login-only
/// record rather than dropping the user: leaderboards then score it 0. An
/// unreadable timestamp becomes the epoch, so the row is stale and the next
/// refresh rewrites it. Only an invalid username is an error.
fn decode_row(row: ProfileRow) -> Result<CachedProfile> {
    let username = Username::parse(&row.username).map_err(|e| StoreError::CorruptRow {
        username: row.username.clone(),
        reason: e.to_string(),
    })?;
    let last_updated = DateTime::parse_from_rfc3339(&row.last_updated)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!(username = %username, value = %row.last_updated, error = %e,
                "last_updated unreadable, treating profile as never refreshed");
            DateTime::<Utc>::UNIX_EPOCH
        });
    let profile = serde_json::from_str::<GithubProfile>(&row.profile).unwrap_or_else(|e| {
        warn!(username = %username, error = %e, "profile payload unreadable, using empty profile");
        GithubProfile {
            login: username.to_string(),
            ..GithubProfile::default()
        }
    });

    Ok(CachedProfile {
        username,
        profile,
        last_updated,
        refresh_count: row.refresh_count.max(0) as u64,
        fetch_failed: row.fetch_failed,
        fetch_error: row.fetch_error,
    })
}
