use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use travel_crm::app::{self, AppState};
use travel_crm::auth::PgApiKeyResolver;
use travel_crm::config;
use travel_crm::database::DatabaseManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("travel_crm=info,tower_http=info")),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting travel CRM API in {:?} mode", config.environment);

    let pool = DatabaseManager::connect().await.context("connecting to database")?;
    if config.database.run_migrations {
        DatabaseManager::migrate(&pool).await.context("running migrations")?;
    }

    let resolver = Arc::new(PgApiKeyResolver::new(pool.clone()));
    let state = AppState::new(pool, resolver);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Travel CRM API listening on http://{}", bind_addr);

    app::serve(listener, state).await?;
    Ok(())
}
