use ghpower_core::GhpowerError;
use ghpower_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the scheduler's ad hoc queries.
///
/// Refresh cycles never return errors: failures are folded into
/// [`RefreshOutcome`](crate::types::RefreshOutcome)s and logged.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The profile cache could not be read.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<SchedulerError> for GhpowerError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::Store(inner) => inner.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
