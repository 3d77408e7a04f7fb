//! HTTP server setup
//!
//! Builds the axum router from the per-area route groups and serves it on
//! the configured bind address. All state lives behind one `AppState`
//! shared via Arc; the store sits behind an async mutex so handlers take
//! turns at the connection.

use crate::config::Config;
use crate::routes;
use crate::store::Store;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state handed to every request handler.
pub struct AppState {
    pub config: Config,
    pub store: Mutex<Store>,
    pub start_time: Instant,
}

pub type AppStateArc = Arc<AppState>;

impl AppState {
    pub fn new(config: Config, store: Store) -> AppStateArc {
        Arc::new(Self {
            config,
            store: Mutex::new(store),
            start_time: Instant::now(),
        })
    }
}

/// Serve the API until the process is stopped.
pub async fn run(state: AppStateArc) -> Result<()> {
    let bind_addr = state.config.server.bind_addr.clone();

    let app = Router::new()
        .merge(routes::health_routes())
        .merge(routes::submission_routes())
        .merge(routes::stats_routes())
        .merge(routes::streak_routes())
        .merge(routes::badge_routes())
        .merge(routes::points_routes())
        .merge(routes::leaderboard_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    let addr = listener.local_addr().context("Failed to read local addr")?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}
