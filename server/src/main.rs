// server/src/main.rs

mod api;

use anyhow::Context;
use chat_store::SqliteSessionStore;
use common_utils::AppConfig;
use orchestrator::Orchestrator;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("[Server] Initializing...");
    let config = AppConfig::from_env()?;

    info!("[Server] Opening conversation store at {}", config.database_path.display());
    let store = SqliteSessionStore::open(&config.database_path)
        .with_context(|| format!("cannot open {}", config.database_path.display()))?;

    let orchestrator = Orchestrator::from_config(&config, Arc::new(store))?;
    info!("[Server] Orchestrator initialized ({:?} variant).", orchestrator.variant());

    let app = api::router(Arc::new(orchestrator));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("[Server] API Gateway listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
