//! Rental engine server.
//!
//! Connects to `PostgreSQL`, runs migrations, spawns the expiry sweeper and
//! serves the HTTP API until Ctrl+C.

use rental_core::{build_router, AppState, Config, ExpirySweeper, PostgresRentalStore, RentalStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rental_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        postgres = %config.postgres.url,
        host = %config.server.host,
        port = config.server.port,
        "configuration loaded"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
        .connect(&config.postgres.url)
        .await?;
    let store = PostgresRentalStore::new(pool);
    store.migrate().await?;
    tracing::info!("migrations applied");

    let store: Arc<dyn RentalStore> = Arc::new(store);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let sweeper = ExpirySweeper::new(Arc::clone(&store), &config.sweeper, shutdown_rx);
    let sweeper_handle = tokio::spawn(sweeper.run());

    let app = build_router(AppState::new(store));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "rental engine listening");

    let shutdown = shutdown_tx.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        })
        .await?;

    // In case the server exited without a signal, stop the sweeper too.
    let _ = shutdown_tx.send(());
    let _ = sweeper_handle.await;
    tracing::info!("shut down cleanly");
    Ok(())
}
