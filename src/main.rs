use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::sync::{oneshot, watch};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movie_explorer::{
    api::{create_router, AppState},
    bootstrap::Bootstrap,
    catalog::{ApiKeySource, CatalogClient, TmdbClient},
    config::Config,
    db::{
        create_pool, create_redis_client, DocumentStore, KeyValueCache, MemoryCache,
        MemoryDocumentStore, PgDocumentStore, RedisCache,
    },
    identity::{IdentityHub, IdentityState},
    store::MovieStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movie_explorer=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let catalog: Arc<dyn CatalogClient> = Arc::new(TmdbClient::new(
        config.tmdb_api_url.clone(),
        ApiKeySource::Env(config.tmdb_api_key_var.clone()),
    ));

    let documents: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url)
                .await
                .context("Failed to connect to document store")?;
            let store = PgDocumentStore::new(pool);
            store.migrate().await?;
            info!("Using PostgreSQL document store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, favorites and playlists are kept in memory");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    let cache: Arc<dyn KeyValueCache> = match &config.redis_url {
        Some(url) => {
            info!("Using Redis genre cache");
            Arc::new(RedisCache::new(create_redis_client(url)?))
        }
        None => Arc::new(MemoryCache::new()),
    };

    let store = MovieStore::new(catalog, documents, cache);

    // Identity observation: every event updates the store, the first one mounts
    let (identity_hub, identity_events) = IdentityHub::channel();
    let (identity_tx, identity_rx) = watch::channel(IdentityState::Pending);
    let (mounted_tx, mounted_rx) = oneshot::channel();

    let bootstrap = Bootstrap::new(store.clone(), identity_tx, move |state: &IdentityState| {
        let _ = mounted_tx.send(state.clone());
    });
    tokio::spawn(bootstrap.run(identity_events));

    // No persisted session is restored here; sign-ins arrive through /api/v1/session
    identity_hub.publish(None);

    let initial = mounted_rx
        .await
        .context("Identity observer stopped before the first resolution")?;
    info!(identity = ?initial, "Identity resolved");

    let app = create_router(AppState::new(store, identity_hub, identity_rx));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .context("Failed to bind to address")?;

    info!("Server running on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
