use ghpower_core::GhpowerError;
use thiserror::Error;

/// Errors raised by a [`ProfileStore`](crate::ProfileStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be mapped back into a `CachedProfile`.
    #[error("corrupt row for {username}: {reason}")]
    CorruptRow { username: String, reason: String },

    /// The profile payload could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for GhpowerError {
    fn from(e: StoreError) -> Self {
        GhpowerError::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
