//! Sponsor Bridge API — entry point.
//!
//! Loads configuration, opens the SQLite pool (applying migrations) and
//! serves the REST API with its live notification stream.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use sponsor_bridge_api::api::{self, ApiState};
use sponsor_bridge_api::config::Config;
use sponsor_bridge_api::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;

    let state = Arc::new(ApiState::new(pool, &config));
    let app = api::app_router(state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");
    if !config.strict_status_transitions {
        info!("Strict status transitions disabled; any status change is accepted");
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
