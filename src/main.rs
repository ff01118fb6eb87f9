use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinelog_api::{
    config::Config,
    db::{
        create_redis_client, DocumentStore, FileStorage, LocalStore, MemoryDocumentStore,
        RedisDocumentStore, RemoteStore,
    },
    routes::{create_router, AppState},
    services::{CatalogService, ConnectionMonitor, HttpProbe, TmdbProvider},
    watchlist::{AuthSession, Reconciler},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cinelog_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let provider = TmdbProvider::new(config.tmdb_api_key.clone(), config.tmdb_api_url.clone());
    let catalog = CatalogService::new(Arc::new(provider));

    let documents: Arc<dyn DocumentStore> = match &config.redis_url {
        Some(url) => {
            let client = create_redis_client(url)?;
            Arc::new(RedisDocumentStore::connect(client).await?)
        }
        None => {
            tracing::warn!("REDIS_URL not set, account watchlists are kept in memory only");
            Arc::new(MemoryDocumentStore::new())
        }
    };
    let (remote, writer) = RemoteStore::new(documents).await;

    let local = LocalStore::new(Arc::new(FileStorage::new(&config.data_dir)));
    let reconciler = Reconciler::new(local, remote);

    // No auth provider runs in-process; the session resolves as a guest
    let session = AuthSession::new();
    let session_handle = reconciler.attach(&session);
    session.sign_out();

    let probe = HttpProbe::new(config.liveness_url(), config.liveness_timeout())?;
    let monitor = ConnectionMonitor::new(Arc::new(probe), config.liveness_interval());
    let monitor_handle = monitor.start();

    let state = Arc::new(AppState {
        catalog,
        reconciler: reconciler.clone(),
        session,
        monitor,
    });
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor_handle.stop().await;
    session_handle.shutdown().await;
    reconciler.flush().await;
    writer.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
