use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GhpowerError, Result};

/// GitHub caps logins at 39 characters.
pub const MAX_USERNAME_LEN: usize = 39;

// Point weights for `GithubProfile::power_points`.
const POINTS_PER_CONTRIBUTION: u64 = 1;
const POINTS_PER_STAR: u64 = 5;
const POINTS_PER_FOLLOWER: u64 = 3;
const POINTS_PER_REPO: u64 = 2;
const POINTS_PER_FORK: u64 = 2;

/// Canonical (lowercase) GitHub login. The cache key for every profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Trim, lowercase and validate a login.
    pub fn parse(raw: &str) -> Result<Self> {
        let login = raw.trim().to_ascii_lowercase();
        if login.is_empty() || login.len() > MAX_USERNAME_LEN {
            return Err(GhpowerError::InvalidUsername(format!(
                "length must be 1..={MAX_USERNAME_LEN}: {raw:?}"
            )));
        }
        if login.starts_with('-') {
            return Err(GhpowerError::InvalidUsername(format!(
                "must not start with a hyphen: {raw:?}"
            )));
        }
        if !login.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(GhpowerError::InvalidUsername(format!(
                "only ASCII letters, digits and hyphens are allowed: {raw:?}"
            )));
        }
        Ok(Self(login))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Username {
    type Err = GhpowerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Username {
    type Error = GhpowerError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Username> for String {
    fn from(u: Username) -> Self {
        u.0
    }
}

/// Number of owned repositories using a language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageShare {
    pub language: String,
    pub repos: u32,
}

/// Derived GitHub profile snapshot stored in the cache.
///
/// Counts are `None` when GitHub did not provide them (e.g. contribution
/// totals without a token). Leaderboards score unavailable values as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubProfile {
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    pub bio: Option<String>,
    pub public_repos: Option<u64>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
    pub total_stars: Option<u64>,
    pub total_forks: Option<u64>,
    pub contributions: Option<u64>,
    pub top_languages: Vec<LanguageShare>,
    pub account_created_at: Option<String>,
}

impl GithubProfile {
    /// Minimal record built without touching the API: identity fields that
    /// can be derived from the login, every count zeroed.
    pub fn placeholder(username: &Username) -> Self {
        Self {
            login: username.to_string(),
            avatar_url: Some(format!("https://github.com/{username}.png")),
            html_url: Some(format!("https://github.com/{username}")),
            public_repos: Some(0),
            followers: Some(0),
            following: Some(0),
            total_stars: Some(0),
            total_forks: Some(0),
            contributions: Some(0),
            ..Self::default()
        }
    }

    /// Name shown on leaderboards: profile name when set, else the login.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.login,
        }
    }

    /// Point total fed into the power-level curve.
    pub fn power_points(&self) -> u64 {
        let weighted = |count: Option<u64>, weight: u64| count.unwrap_or(0).saturating_mul(weight);
        weighted(self.contributions, POINTS_PER_CONTRIBUTION)
            .saturating_add(weighted(self.total_stars, POINTS_PER_STAR))
            .saturating_add(weighted(self.followers, POINTS_PER_FOLLOWER))
            .saturating_add(weighted(self.public_repos, POINTS_PER_REPO))
            .saturating_add(weighted(self.total_forks, POINTS_PER_FORK))
    }
}

/// One user's latest known snapshot. Writes always replace the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedProfile {
    pub username: Username,
    pub profile: GithubProfile,
    pub last_updated: DateTime<Utc>,
    /// Incremented on every write, successful or not. Never reset.
    pub refresh_count: u64,
    /// Set when the latest refresh attempt could not reach GitHub.
    pub fetch_failed: bool,
    pub fetch_error: Option<String>,
}

impl CachedProfile {
    /// Age of the snapshot at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.last_updated)
    }
}
