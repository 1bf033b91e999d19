// Trivia API - Web Server

use anyhow::{Context, Result};
use log::{error, info};
use trivia_api::api::{router, AppState};
use trivia_api::{Config, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    if !config.database_path.exists() {
        error!("database not found at {}", config.database_path.display());
        error!("run `trivia init` to create it first");
        std::process::exit(1);
    }

    let store = SqliteStore::open(&config.database_path)?;
    info!("database opened: {}", config.database_path.display());

    let app = router(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("trivia server {} listening on http://{}", trivia_api::VERSION, config.bind_addr);

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
