use std::fmt;
use std::str::FromStr;

use ghpower_core::{level_from_points, GhpowerError, GithubProfile};
use serde::{Deserialize, Serialize};

/// A ranking dimension. Closed set; each variant knows how to read its
/// value from a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Stars,
    Followers,
    Repos,
    Contributions,
    Level,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Stars,
        Metric::Followers,
        Metric::Repos,
        Metric::Contributions,
        Metric::Level,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Stars => "stars",
            Metric::Followers => "followers",
            Metric::Repos => "repos",
            Metric::Contributions => "contributions",
            Metric::Level => "level",
        }
    }

    /// The profile's value for this metric; `None` when unavailable.
    pub fn extract(&self, profile: &GithubProfile) -> Option<u64> {
        match self {
            Metric::Stars => profile.total_stars,
            Metric::Followers => profile.followers,
            Metric::Repos => profile.public_repos,
            Metric::Contributions => profile.contributions,
            Metric::Level => Some(u64::from(level_from_points(profile.power_points()))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = GhpowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| GhpowerError::UnknownMetric {
                name: s.to_string(),
            })
    }
}
