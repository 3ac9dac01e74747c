//! Sprout server binary.

mod auth;
mod config;
mod error;
mod push;
mod routes;
mod state;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sprout_storage::SqliteStore;

use crate::auth::AuthKeys;
use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    let store = SqliteStore::open(&config.database, config.pool_size).await?;
    info!(db = %config.database.display(), pool = config.pool_size, "database opened");

    if let Some(catalog) = &config.catalog {
        let seeded = store.seed_catalog_from_file(catalog).await?;
        info!(file = %catalog.display(), seeded, "catalog seed applied");
    }

    let auth = AuthKeys::new(&config.jwt_secret, &config.jwt_refresh_secret);
    let state = AppState::new(store, auth);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!(listen = %config.listen, "server running");

    axum::serve(listener, app).await?;

    Ok(())
}
