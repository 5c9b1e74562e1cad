mod api_doc;
mod cache;
mod config;
mod datastore;
mod error;
mod handlers;
mod hooks;
mod models;
mod route_write;
mod routes;
mod state;

use anyhow::Context;
use std::sync::Arc;

use cache::MemoryRouteCache;
use config::{Config, StoreBackend};
use datastore::{Datastore, MemoryDatastore, SpannerDatastore};
use hooks::{AppListeners, LoggingListener};
use route_write::RouteWriter;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    tracing::info!("fnroutes starting");

    let config = Config::from_env()?;
    config.log_startup();

    let datastore: Arc<dyn Datastore> = match (&config.store_backend, &config.spanner) {
        (StoreBackend::Spanner, Some(spanner)) => {
            Arc::new(SpannerDatastore::from_config(spanner).await?)
        }
        (StoreBackend::Spanner, None) => anyhow::bail!("Spanner backend selected without Spanner settings"),
        (StoreBackend::Memory, _) => {
            tracing::warn!("Using the in-memory datastore; data is lost on restart");
            Arc::new(MemoryDatastore::new())
        }
    };

    let listeners = AppListeners::new().with(Arc::new(LoggingListener));
    let writer = RouteWriter::new(
        datastore.clone(),
        listeners,
        Arc::new(MemoryRouteCache::new()),
    );

    let addr = format!("{}:{}", config.service_host, config.service_port);
    let state = AppState {
        datastore,
        writer: Arc::new(writer),
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, handlers::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("fnroutes stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
