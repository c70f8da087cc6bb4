//! Authgate API server

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use authgate_api::{create_router, AppState, Config};
use authgate_shared::{
    db::{create_pool, run_migrations},
    PgOAuthStateStore, PgUserStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present; real environment wins
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!(bind_address = %config.bind_address, "Starting authgate-api");

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!("Database ready");

    let users = Arc::new(PgUserStore::new(pool.clone()));
    let oauth_states = Arc::new(PgOAuthStateStore::new(pool));

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, users, oauth_states).context("failed to build OAuth client")?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!(address = %bind_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

/// `RUST_LOG` controls filtering; `LOG_FORMAT=json` switches to JSON lines
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("authgate_api=info,tower_http=info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
