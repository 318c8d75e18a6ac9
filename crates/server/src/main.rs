//! searcher server entry point.
//!
//! Boots the HTTP API over the document mirror: loads configuration, opens
//! the cache database, wires the sync engine, and starts the scheduled
//! resync task alongside the axum server.

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use searcher_client::{ApiClient, ApiClientConfig, SyncEngine};
use searcher_core::{AppConfig, CacheDb, TenantRegistry};

mod error;
mod handlers;
mod router;
mod scheduler;
mod state;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(
        db_path = %config.db_path.display(),
        tenants = config.tenants.len(),
        "configuration loaded"
    );

    let db = CacheDb::open(&config.db_path)
        .await
        .context("failed to open cache database")?;

    let registry = TenantRegistry::new(&config.tenants);
    let client = ApiClient::new(ApiClientConfig {
        timeout: config.timeout(),
        user_agent: config.user_agent.clone(),
    })
    .context("failed to build upstream client")?;

    let engine = SyncEngine::new(db, client, registry);

    scheduler::spawn(engine.clone(), config.sync_hours_utc.clone());

    let app = router::create_router(state::AppState::new(engine));

    let listener = TcpListener::bind(config.listen_addr.as_str())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "starting searcher server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
