mod config;
mod db;
mod error;
mod extractors;
mod routes;
mod state;

use axum::routing::get;
use axum::Router;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Config};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    // Sweep stale sessions at startup, then hourly in the background.
    // Lookups handle expiry lazily, so a missed sweep is harmless.
    sweep_sessions(&pool);
    let sweep_pool = pool.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        interval.tick().await; // the first tick fires immediately
        loop {
            interval.tick().await;
            sweep_sessions(&sweep_pool);
        }
    });

    // Build app state
    let state = AppState {
        db: pool,
        config: config.clone(),
    };

    // Build router
    let app = Router::new()
        .route("/", get(routes::home::index))
        .route("/assets/{*path}", get(routes::assets::serve))
        .merge(routes::auth::router())
        .merge(routes::posts::router())
        .merge(routes::comments::router())
        .merge(routes::categories::router())
        .merge(routes::reactions::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn sweep_sessions(pool: &state::DbPool) {
    match db::sessions::cleanup_expired(pool) {
        Ok(n) if n > 0 => tracing::info!("Removed {} expired sessions", n),
        Ok(_) => {}
        Err(e) => tracing::warn!("Failed to cleanup expired sessions: {}", e),
    }
}
