use ghpower_core::{CachedProfile, Username};

use crate::error::Result;

/// Read/write contract for the profile cache.
///
/// Last write wins per username; no transactional guarantees beyond that.
/// Readers may observe a refresh cycle's partial progress.
pub trait ProfileStore: Send + Sync {
    /// Fetch the cached profile for `username`, if any.
    fn get(&self, username: &Username) -> Result<Option<CachedProfile>>;

    /// Replace (or create) the record for `profile.username`.
    fn put(&self, profile: &CachedProfile) -> Result<()>;

    /// Every cached profile, in first-insertion order.
    fn list_all(&self) -> Result<Vec<CachedProfile>>;

    fn count(&self) -> Result<usize> {
        Ok(self.list_all()?.len())
    }
}
