use chrono::{DateTime, Utc};
use ghpower_core::GhpowerError;
use reqwest::{header::HeaderMap, StatusCode};
use thiserror::Error;

/// Why a profile fetch failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The configured token was rejected, or access was forbidden.
    #[error("GitHub rejected the request credentials")]
    Unauthorized,

    /// Quota exhausted. `reset_at` comes from `x-ratelimit-reset` when present.
    #[error("GitHub rate limit exhausted")]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("GitHub user not found")]
    NotFound,

    /// Network failures, timeouts, 5xx and unreadable bodies.
    #[error("GitHub request failed: {0}")]
    Transient(String),
}

impl FetchError {
    /// Classify a non-success HTTP response.
    ///
    /// GitHub reports an exhausted quota as 403 (primary limit) or 429
    /// (secondary limit); a 403 with quota left is a permission problem.
    pub fn from_status(status: StatusCode, limit: &RateLimit, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => FetchError::Unauthorized,
            StatusCode::NOT_FOUND => FetchError::NotFound,
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
                if limit.exhausted()
                    || status == StatusCode::TOO_MANY_REQUESTS
                    || body.to_ascii_lowercase().contains("rate limit") =>
            {
                FetchError::RateLimited {
                    reset_at: limit.reset_at,
                }
            }
            StatusCode::FORBIDDEN => FetchError::Unauthorized,
            _ => {
                let snippet: String = body.chars().take(200).collect();
                FetchError::Transient(format!("HTTP {status}: {snippet}"))
            }
        }
    }
}

impl From<FetchError> for GhpowerError {
    fn from(e: FetchError) -> Self {
        GhpowerError::Fetch(e.to_string())
    }
}

/// Rate-limit state reported on every GitHub response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<i64>().ok())
        };
        Self {
            remaining: number("x-ratelimit-remaining").map(|n| n.max(0) as u64),
            reset_at: number("x-ratelimit-reset").and_then(|ts| DateTime::from_timestamp(ts, 0)),
        }
    }

    pub fn exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(remaining: &str, reset: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert("x-ratelimit-remaining", HeaderValue::from_str(remaining).unwrap());
        h.insert("x-ratelimit-reset", HeaderValue::from_str(reset).unwrap());
        h
    }

    #[test]
    fn parses_rate_limit_headers() {
        let limit = RateLimit::from_headers(&headers("0", "1700000000"));
        assert!(limit.exhausted());
        assert_eq!(limit.reset_at.unwrap().timestamp(), 1_700_000_000);

        let none = RateLimit::from_headers(&HeaderMap::new());
        assert_eq!(none, RateLimit::default());
        assert!(!none.exhausted());
    }

    #[test]
    fn classifies_statuses() {
        let quiet = RateLimit::default();
        assert_eq!(
            FetchError::from_status(StatusCode::UNAUTHORIZED, &quiet, ""),
            FetchError::Unauthorized
        );
        assert_eq!(
            FetchError::from_status(StatusCode::NOT_FOUND, &quiet, "{}"),
            FetchError::NotFound
        );
        assert_eq!(
            FetchError::from_status(StatusCode::FORBIDDEN, &quiet, "Resource not accessible"),
            FetchError::Unauthorized
        );
        assert!(matches!(
            FetchError::from_status(StatusCode::BAD_GATEWAY, &quiet, "upstream"),
            FetchError::Transient(msg) if msg.contains("502")
        ));
    }

    #[test]
    fn forbidden_with_exhausted_quota_is_rate_limited() {
        let limit = RateLimit::from_headers(&headers("0", "1700000000"));
        let err = FetchError::from_status(StatusCode::FORBIDDEN, &limit, "");
        assert_eq!(
            err,
            FetchError::RateLimited {
                reset_at: limit.reset_at
            }
        );

        let by_body = FetchError::from_status(
            StatusCode::FORBIDDEN,
            &RateLimit::default(),
            r#"{"message":"API rate limit exceeded for 1.2.3.4"}"#,
        );
        assert_eq!(by_body, FetchError::RateLimited { reset_at: None });

        let secondary = FetchError::from_status(StatusCode::TOO_MANY_REQUESTS, &RateLimit::default(), "");
        assert!(matches!(secondary, FetchError::RateLimited { .. }));
    }

    #[test]
    fn converts_into_core_error() {
        let err: GhpowerError = FetchError::NotFound.into();
        assert_eq!(err.code(), "FETCH_ERROR");
    }
}
