use thiserror::Error;

#[derive(Debug, Error)]
pub enum GhpowerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Profile not found: {username}")]
    ProfileNotFound { username: String },

    #[error("Unknown metric: {name}")]
    UnknownMetric { name: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("GitHub fetch failed: {0}")]
    Fetch(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GhpowerError {
    /// Short error code string returned to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            GhpowerError::Config(_) => "CONFIG_ERROR",
            GhpowerError::InvalidUsername(_) => "INVALID_USERNAME",
            GhpowerError::ProfileNotFound { .. } => "PROFILE_NOT_FOUND",
            GhpowerError::UnknownMetric { .. } => "UNKNOWN_METRIC",
            GhpowerError::Database(_) => "DATABASE_ERROR",
            GhpowerError::Fetch(_) => "FETCH_ERROR",
            GhpowerError::Serialization(_) => "SERIALIZATION_ERROR",
            GhpowerError::Io(_) => "IO_ERROR",
            GhpowerError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, GhpowerError>;
