use async_trait::async_trait;
use ghpower_core::Username;

use crate::{error::FetchError, snapshot::ProfileSnapshot};

/// Source of raw profile data for the refresh pipeline.
///
/// Implementations must be `Send + Sync`: one fetcher is shared by every
/// concurrent refresh in a batch.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Fetch everything needed to build a profile for `username`.
    ///
    /// Errors are classified (see [`FetchError`]) but callers treat every
    /// class the same way: keep the previous snapshot or write a fallback.
    async fn fetch_profile(&self, username: &Username) -> Result<ProfileSnapshot, FetchError>;
}
