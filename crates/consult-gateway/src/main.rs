use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use consult_core::config::ConsultConfig;
use consult_gateway::app::{self, AppState};
use consult_store::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "consult_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("CONSULT_CONFIG").ok();
    let config = ConsultConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("config load failed ({e}), using defaults");
        ConsultConfig::default()
    });

    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = rusqlite::Connection::open(&config.database.path)?;
    consult_store::db::init_db(&conn)?;
    let store = Arc::new(SessionStore::new(conn));

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let state = Arc::new(AppState::new(config, store));
    let runtime_cache = Arc::clone(&state.runtime_cache);
    let router = app::build_router(Arc::clone(&state));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweep_handle = tokio::spawn(consult_runtime_cache::run_sweep_task(runtime_cache, shutdown_rx));

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("consult gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = sweep_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
