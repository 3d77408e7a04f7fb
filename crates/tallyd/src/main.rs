//! Tally Daemon - exam performance analytics and gamification service
//!
//! Aggregates question-level marks into topic statistics, maintains
//! streaks, points, badges, and the leaderboard, and serves them over HTTP.

use anyhow::{Context, Result};
use std::path::Path;
use tallyd::config::Config;
use tallyd::server::{self, AppState};
use tallyd::store::Store;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Tally daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load();

    if let Some(parent) = Path::new(&config.storage.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create data directory {}", parent.display()))?;
        }
    }

    let store = Store::open_at(&config.storage.db_path)
        .with_context(|| format!("failed to open store at {}", config.storage.db_path))?;
    info!("Store ready at {}", config.storage.db_path);

    let state = AppState::new(config, store);
    server::run(state).await
}
