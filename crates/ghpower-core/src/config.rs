use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18800;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_GRAPHQL: &str = "https://api.github.com/graphql";

/// Upper bound for `update_interval_secs` and `batch_delay_secs`: one week.
pub const MAX_SCHEDULER_SECS: u64 = 7 * 24 * 60 * 60;
/// Upper bound for `max_age_minutes`: one year.
pub const MAX_AGE_LIMIT_MINUTES: i64 = 365 * 24 * 60;

/// Top-level config (ghpower.toml + GHPOWER_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GhpowerConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// GitHub REST/GraphQL client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_api")]
    pub api_base_url: String,
    #[serde(default = "default_github_graphql")]
    pub graphql_url: String,
    /// Personal access token. Without it requests are anonymous (60/hour)
    /// and contribution totals are unavailable.
    pub token: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on `/users/{login}/repos` pages (100 repos each).
    #[serde(default = "default_max_repo_pages")]
    pub max_repo_pages: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_github_api(),
            graphql_url: default_github_graphql(),
            token: None,
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_repo_pages: default_max_repo_pages(),
        }
    }
}

/// Which cached usernames a refresh cycle picks up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Every cached username, regardless of age.
    All,
    /// Only usernames whose cached profile is older than `max_age_minutes`.
    #[default]
    Stale,
}

/// Background refresh scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between batches; keeps the cycle under the GitHub rate-limit window.
    #[serde(default = "default_batch_delay_secs")]
    pub batch_delay_secs: u64,
    #[serde(default)]
    pub refresh_mode: RefreshMode,
    #[serde(default = "default_max_age_minutes")]
    pub max_age_minutes: i64,
    /// Start the timer loop when the gateway boots.
    #[serde(default = "bool_true")]
    pub autostart: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval_secs(),
            batch_size: default_batch_size(),
            batch_delay_secs: default_batch_delay_secs(),
            refresh_mode: RefreshMode::default(),
            max_age_minutes: default_max_age_minutes(),
            autostart: true,
        }
    }
}

impl SchedulerConfig {
    /// Clamp values that would stall or spin the scheduler, or overflow
    /// timestamp arithmetic.
    pub fn validated(mut self) -> Self {
        if self.batch_size == 0 {
            tracing::warn!("scheduler.batch_size = 0, using 1");
            self.batch_size = 1;
        }
        if self.update_interval_secs == 0 {
            tracing::warn!("scheduler.update_interval_secs = 0, using 1");
            self.update_interval_secs = 1;
        }
        if self.update_interval_secs > MAX_SCHEDULER_SECS {
            tracing::warn!(
                value = self.update_interval_secs,
                "scheduler.update_interval_secs too large, using one week"
            );
            self.update_interval_secs = MAX_SCHEDULER_SECS;
        }
        if self.batch_delay_secs > MAX_SCHEDULER_SECS {
            tracing::warn!(
                value = self.batch_delay_secs,
                "scheduler.batch_delay_secs too large, using one week"
            );
            self.batch_delay_secs = MAX_SCHEDULER_SECS;
        }
        if self.max_age_minutes > MAX_AGE_LIMIT_MINUTES {
            tracing::warn!(
                value = self.max_age_minutes,
                "scheduler.max_age_minutes too large, using one year"
            );
            self.max_age_minutes = MAX_AGE_LIMIT_MINUTES;
        }
        self.max_age_minutes = self.max_age_minutes.max(0);
        self
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_github_api() -> String {
    DEFAULT_GITHUB_API.to_string()
}
fn default_github_graphql() -> String {
    DEFAULT_GITHUB_GRAPHQL.to_string()
}
fn default_user_agent() -> String {
    format!("ghpower/{}", env!("CARGO_PKG_VERSION"))
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_max_repo_pages() -> u32 {
    3
}
fn default_update_interval_secs() -> u64 {
    300
}
fn default_batch_size() -> usize {
    5
}
fn default_batch_delay_secs() -> u64 {
    2
}
fn default_max_age_minutes() -> i64 {
    30
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.ghpower/ghpower.db", home)
}

impl GhpowerConfig {
    /// Load config from a TOML file with GHPOWER_* env var overrides.
    ///
    /// Nested keys use a double underscore:
    /// `GHPOWER_SCHEDULER__BATCH_SIZE=10`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("GHPOWER_").split("__")),
        )
    }

    fn from_figment(figment: Figment) -> crate::error::Result<Self> {
        let mut config: GhpowerConfig = figment
            .extract()
            .map_err(|e| crate::error::GhpowerError::Config(e.to_string()))?;
        config.scheduler = config.scheduler.validated();
        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.ghpower/ghpower.toml", home)
}
