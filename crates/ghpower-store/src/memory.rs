use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ghpower_core::{CachedProfile, Username};

use crate::error::Result;
use crate::store::ProfileStore;

/// In-process profile cache. Enumerates in first-insertion order, like the
/// SQLite backend.
#[derive(Default)]
pub struct MemoryProfileStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: Vec<CachedProfile>,
    index: HashMap<Username, usize>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing records (later duplicates replace earlier ones).
    pub fn with_profiles(profiles: impl IntoIterator<Item = CachedProfile>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for p in profiles {
                inner.upsert(p);
            }
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn upsert(&mut self, profile: CachedProfile) {
        match self.index.get(&profile.username) {
            Some(&slot) => self.rows[slot] = profile,
            None => {
                self.index.insert(profile.username.clone(), self.rows.len());
                self.rows.push(profile);
            }
        }
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get(&self, username: &Username) -> Result<Option<CachedProfile>> {
        let inner = self.lock();
        Ok(inner.index.get(username).map(|&slot| inner.rows[slot].clone()))
    }

    fn put(&self, profile: &CachedProfile) -> Result<()> {
        self.lock().upsert(profile.clone());
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<CachedProfile>> {
        Ok(self.lock().rows.clone())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.lock().rows.len())
    }
}
