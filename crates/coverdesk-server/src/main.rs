use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use coverdesk_client::{BackendConfig, GoTrueClient, SupabaseClient};
use coverdesk_core::MemoryStore;
use coverdesk_server::auth::AdminCache;
use coverdesk_server::config::{ServerConfig, StoreKind};
use coverdesk_server::routes;
use coverdesk_server::state::{AppState, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("coverdesk=info".parse()?))
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    let backend = match BackendConfig::from_env() {
        Ok(backend) => Some(backend),
        Err(e) if config.store == StoreKind::Remote => return Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "No auth backend configured, admin endpoints disabled");
            None
        }
    };

    let store = match (config.store, &backend) {
        (StoreKind::Remote, Some(backend)) => Store::Remote(SupabaseClient::new(backend)?),
        _ => Store::Memory(MemoryStore::new()),
    };
    let auth = backend.as_ref().map(GoTrueClient::new).transpose()?;

    tracing::info!(store = store.kind(), admin = auth.is_some(), "Configured storage");

    let state = Arc::new(AppState {
        store,
        auth,
        admin_cache: AdminCache::new(config.admin_cache_ttl),
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
