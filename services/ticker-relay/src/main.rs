use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ticker_relay::cache::TickerCache;
use ticker_relay::config::Config;
use ticker_relay::heartbeat::heartbeat_loop;
use ticker_relay::registry::ClientRegistry;
use ticker_relay::relay::RelayLoop;
use ticker_relay::server::{create_router, AppState};
use ticker_relay::store::PgSnapshotStore;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;
    tracing::info!(
        symbol = %config.symbol,
        ws_path = %config.ws_path,
        "starting tick relay service"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("connecting to the snapshot store")?;
    let store = Arc::new(PgSnapshotStore::new(pool, config.table.clone()));

    let registry = Arc::new(ClientRegistry::new());
    let cache = Arc::new(TickerCache::new());
    let shutdown = CancellationToken::new();

    let relay = RelayLoop::new(store, registry.clone(), cache.clone(), &config);
    let relay_task = tokio::spawn(relay.run(shutdown.clone()));
    let heartbeat_task = tokio::spawn(heartbeat_loop(
        registry.clone(),
        config.heartbeat_interval(),
        shutdown.clone(),
    ));

    let state = AppState {
        registry,
        cache,
        shutdown: shutdown.clone(),
    };
    let app = create_router(state, &config.ws_path);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown signal received");
                shutdown.cancel();
            }
        })
        .await?;

    // Let the background loops finish their in-flight work.
    shutdown.cancel();
    let _ = relay_task.await;
    let _ = heartbeat_task.await;

    Ok(())
}
