use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use ghpower_core::config::GhpowerConfig;
use ghpower_github::GithubClient;
use ghpower_store::SqliteProfileStore;
use tracing::{info, warn};

mod app;
mod http;

/// GitHub profile cache, leaderboards and power levels over HTTP.
#[derive(Parser, Debug)]
#[command(name = "ghpower-gateway", version)]
struct Cli {
    /// Config file (default: $GHPOWER_CONFIG, then ~/.ghpower/ghpower.toml).
    #[arg(long)]
    config: Option<String>,

    /// Do not start the refresh scheduler at boot.
    #[arg(long)]
    no_autostart: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ghpower_gateway=info,ghpower_scheduler=info,ghpower_leaderboard=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // config: --config > GHPOWER_CONFIG env > ~/.ghpower/ghpower.toml
    let config_path = cli.config.or_else(|| std::env::var("GHPOWER_CONFIG").ok());
    let config = GhpowerConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        GhpowerConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    let store = Arc::new(SqliteProfileStore::new(db)?);

    let github = GithubClient::new(&config.github)?;
    if !github.has_token() {
        warn!("no github.token configured, contribution totals will be unavailable");
    }

    let autostart = config.scheduler.autostart && !cli.no_autostart;
    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;

    let state = Arc::new(app::AppState::new(config, store, Arc::new(github)));

    // serve the cached data straight away instead of waiting for the first cycle
    match state.leaderboard.recompute_all() {
        Ok(n) => info!(profiles = n, "initial leaderboards ready"),
        Err(e) => warn!(error = %e, "initial leaderboard computation failed"),
    }

    if autostart {
        state.scheduler.start();
    } else {
        info!("scheduler autostart disabled");
    }

    let router = app::build_router(state.clone());
    info!("ghpower gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.scheduler.shutdown().await;
    info!("ghpower gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
