use std::time::Duration;

use async_trait::async_trait;
use ghpower_core::{config::GithubConfig, GhpowerError, Username};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::error::{FetchError, RateLimit};
use crate::fetcher::ProfileFetcher;
use crate::snapshot::{GithubRepo, GithubUser, ProfileSnapshot};

const REPOS_PER_PAGE: usize = 100;

const CONTRIBUTIONS_QUERY: &str = "query($login: String!) { user(login: $login) { \
     contributionsCollection { contributionCalendar { totalContributions } } } }";

/// GitHub REST + GraphQL client.
pub struct GithubClient {
    http: reqwest::Client,
    api_base_url: String,
    graphql_url: String,
    token: Option<String>,
    max_repo_pages: u32,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> ghpower_core::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GhpowerError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            graphql_url: config.graphql_url.clone(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
            max_repo_pages: config.max_repo_pages.max(1),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let resp = self
            .authorize(self.http.get(url).query(query))
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;
        read_json(resp).await
    }

    pub async fn fetch_user(&self, username: &Username) -> Result<GithubUser, FetchError> {
        let url = format!("{}/users/{}", self.api_base_url, username);
        self.get_json(&url, &[]).await
    }

    /// Owned repositories, at most `max_repo_pages` pages of 100.
    pub async fn fetch_repos(&self, username: &Username) -> Result<Vec<GithubRepo>, FetchError> {
        let url = format!("{}/users/{}/repos", self.api_base_url, username);
        let mut repos = Vec::new();
        for page in 1..=self.max_repo_pages {
            let batch: Vec<GithubRepo> = self
                .get_json(
                    &url,
                    &[
                        ("per_page", REPOS_PER_PAGE.to_string()),
                        ("type", "owner".to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            let full_page = batch.len() == REPOS_PER_PAGE;
            repos.extend(batch);
            if !full_page {
                break;
            }
        }
        Ok(repos)
    }

    /// Contribution total for the last year. Requires a token; returns
    /// `Ok(None)` without one.
    pub async fn fetch_contributions(&self, username: &Username) -> Result<Option<u64>, FetchError> {
        if self.token.is_none() {
            return Ok(None);
        }
        let body = json!({
            "query": CONTRIBUTIONS_QUERY,
            "variables": { "login": username.as_str() },
        });
        let resp = self
            .authorize(self.http.post(&self.graphql_url).json(&body))
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;
        let value: Value = read_json(resp).await?;

        if let Some(errors) = value.get("errors") {
            debug!(%username, %errors, "GraphQL returned errors");
        }
        Ok(value
            .pointer("/data/user/contributionsCollection/contributionCalendar/totalContributions")
            .and_then(Value::as_u64))
    }
}

#[async_trait]
impl ProfileFetcher for GithubClient {
    #[instrument(skip(self), fields(username = %username))]
    async fn fetch_profile(&self, username: &Username) -> Result<ProfileSnapshot, FetchError> {
        let user = self.fetch_user(username).await?;
        let repos = self.fetch_repos(username).await?;

        // Contributions are optional: a failed GraphQL call leaves them unavailable.
        let contributions = match self.fetch_contributions(username).await {
            Ok(total) => total,
            Err(e) => {
                warn!(error = %e, "contribution query failed");
                None
            }
        };

        debug!(repos = repos.len(), ?contributions, "profile fetched");
        Ok(ProfileSnapshot {
            user,
            repos,
            contributions,
        })
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, FetchError> {
    let status = resp.status();
    let limit = RateLimit::from_headers(resp.headers());
    if limit.exhausted() {
        warn!(reset_at = ?limit.reset_at, "GitHub rate limit exhausted");
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::from_status(status, &limit, &body));
    }
    resp.json::<T>()
        .await
        .map_err(|e| FetchError::Transient(format!("unreadable response body: {e}")))
}
