use account_state::persistence::metadata_repository::{MetadataBackend, SqliteMetadataRepository};
use account_state::persistence::persister::{restore_metadata, run_metadata_persister};
use account_state::persistence::init_database;
use account_state::{AccountStore, StoreConfig};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Hosts one account store and keeps its metadata persisted until Ctrl-C.
/// Metadata is kept as untyped JSON records keyed by symbol.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_state=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = StoreConfig::from_env();
    info!(
        "Account state starting for {} (default leverage {}x, persist every {}s)",
        config.account_id, config.default_leverage, config.persist_interval_seconds
    );

    let pool = init_database(&config.database_url).await?;
    let backend: Arc<dyn MetadataBackend> = Arc::new(SqliteMetadataRepository::new(pool));

    let store = Arc::new(Mutex::new(AccountStore::<serde_json::Value>::with_default_leverage(
        config.default_leverage,
    )));
    restore_metadata(&store, backend.as_ref(), &config.account_id).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let persister = tokio::spawn(run_metadata_persister(
        store.clone(),
        backend.clone(),
        config.account_id.clone(),
        config.persist_interval(),
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, flushing metadata");

    let _ = shutdown_tx.send(true);
    persister.await?;

    Ok(())
}
