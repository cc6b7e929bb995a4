use std::collections::HashMap;

use ghpower_core::{GithubProfile, LanguageShare};
use serde::{Deserialize, Serialize};

/// How many languages a profile lists.
pub const TOP_LANGUAGES: usize = 5;

/// Subset of `GET /users/{login}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GithubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub public_repos: Option<u64>,
    #[serde(default)]
    pub followers: Option<u64>,
    #[serde(default)]
    pub following: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Subset of one entry of `GET /users/{login}/repos`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GithubRepo {
    pub name: String,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub language: Option<String>,
}

/// Raw data gathered for one user, before derivation.
#[derive(Debug, Clone, Default)]
pub struct ProfileSnapshot {
    pub user: GithubUser,
    pub repos: Vec<GithubRepo>,
    /// `None` when contribution totals could not be queried.
    pub contributions: Option<u64>,
}

impl ProfileSnapshot {
    /// Derive the cached profile. Forked repositories are ignored for stars,
    /// forks and languages.
    pub fn into_profile(self) -> GithubProfile {
        let owned: Vec<&GithubRepo> = self.repos.iter().filter(|r| !r.fork).collect();
        let total_stars = owned.iter().map(|r| r.stargazers_count).fold(0u64, u64::saturating_add);
        let total_forks = owned.iter().map(|r| r.forks_count).fold(0u64, u64::saturating_add);

        GithubProfile {
            login: self.user.login.to_ascii_lowercase(),
            name: self.user.name,
            avatar_url: self.user.avatar_url,
            html_url: self.user.html_url,
            bio: self.user.bio,
            public_repos: self.user.public_repos,
            followers: self.user.followers,
            following: self.user.following,
            total_stars: Some(total_stars),
            total_forks: Some(total_forks),
            contributions: self.contributions,
            top_languages: top_languages(&owned),
            account_created_at: self.user.created_at,
        }
    }
}

/// Most used languages by repository count, ties broken alphabetically.
fn top_languages(repos: &[&GithubRepo]) -> Vec<LanguageShare> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for lang in repos.iter().filter_map(|r| r.language.as_deref()) {
        *counts.entry(lang).or_default() += 1;
    }
    let mut shares: Vec<LanguageShare> = counts
        .into_iter()
        .map(|(language, repos)| LanguageShare {
            language: language.to_string(),
            repos,
        })
        .collect();
    shares.sort_by(|a, b| b.repos.cmp(&a.repos).then_with(|| a.language.cmp(&b.language)));
    shares.truncate(TOP_LANGUAGES);
    shares
}
