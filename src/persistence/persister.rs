//! Metadata persister
//!
//! Polls the store's pending flag and writes a metadata snapshot when it is
//! raised. The flag is cleared under the store lock together with taking the
//! snapshot, so a change that lands while the write is in flight raises it
//! again. A failed write re-raises the flag so the next cycle retries.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use super::metadata_repository::MetadataBackend;
use super::PersistenceError;
use crate::domain::errors::StoreError;
use crate::domain::services::account_store::AccountStore;

/// Write the metadata snapshot if the store has unsynced changes.
///
/// Returns whether a snapshot was written.
pub async fn persist_if_pending<M>(
    store: &Mutex<AccountStore<M>>,
    backend: &dyn MetadataBackend,
    account_id: &str,
) -> Result<bool, StoreError>
where
    M: Clone + Serialize + DeserializeOwned,
{
    let payload = {
        let mut guard = store.lock().await;
        if !guard.is_pending_persist() {
            return Ok(false);
        }
        guard.set_is_pending_persist(false);
        match serde_json::to_string(guard.get_all_symbol_metadata()) {
            Ok(payload) => payload,
            Err(e) => {
                guard.set_is_pending_persist(true);
                return Err(PersistenceError::from(e).into());
            }
        }
    };

    if let Err(e) = backend.save_snapshot(account_id, &payload).await {
        store.lock().await.set_is_pending_persist(true);
        warn!("Metadata write for {} failed, will retry: {}", account_id, e);
        return Err(e.into());
    }

    debug!("Persisted metadata for {}", account_id);
    Ok(true)
}

/// Load the account's last snapshot into the store without raising the
/// pending flag. Returns the number of symbols restored.
pub async fn restore_metadata<M>(
    store: &Mutex<AccountStore<M>>,
    backend: &dyn MetadataBackend,
    account_id: &str,
) -> Result<usize, StoreError>
where
    M: Clone + Serialize + DeserializeOwned,
{
    let Some(payload) = backend.load_snapshot(account_id).await? else {
        info!("No stored metadata for {}", account_id);
        return Ok(0);
    };

    let metadata: HashMap<String, M> =
        serde_json::from_str(&payload).map_err(PersistenceError::from)?;
    let restored = metadata.len();
    store.lock().await.set_all_symbol_metadata(metadata);

    info!("Restored metadata for {} symbols of {}", restored, account_id);
    Ok(restored)
}

/// Persist on every tick until `shutdown` flips to true, then flush once more
pub async fn run_metadata_persister<M>(
    store: Arc<Mutex<AccountStore<M>>>,
    backend: Arc<dyn MetadataBackend>,
    account_id: String,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    M: Clone + Serialize + DeserializeOwned + Send,
{
    info!("Metadata persister started for {} (every {:?})", account_id, interval);

    let mut ticker = tokio::time::interval(interval);
    let mut consecutive_failures: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match persist_if_pending(&store, backend.as_ref(), &account_id).await {
                    Ok(_) => {
                        if consecutive_failures > 0 {
                            info!(
                                "Metadata persister recovered after {} failures",
                                consecutive_failures
                            );
                        }
                        consecutive_failures = 0;
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(
                            "Metadata persist cycle failed (consecutive failures: {}): {}",
                            consecutive_failures, e
                        );
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    if let Err(e) = persist_if_pending(&store, backend.as_ref(), &account_id).await {
        error!("Final metadata flush for {} failed: {}", account_id, e);
    }
    info!("Metadata persister stopped for {}", account_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::metadata_repository::InMemoryMetadataBackend;

    fn shared_store() -> Mutex<AccountStore<String>> {
        Mutex::new(AccountStore::new())
    }

    #[tokio::test]
    async fn test_nothing_written_when_not_pending() {
        let store = shared_store();
        let backend = InMemoryMetadataBackend::new();

        let written = persist_if_pending(&store, &backend, "acct").await.unwrap();

        assert!(!written);
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_write_clears_flag() {
        let store = shared_store();
        store.lock().await.set_symbol_metadata("BTCUSDT", "leader-a".to_string());
        let backend = InMemoryMetadataBackend::new();

        let written = persist_if_pending(&store, &backend, "acct").await.unwrap();

        assert!(written);
        assert!(!store.lock().await.is_pending_persist());
        assert_eq!(
            backend.load_snapshot("acct").await.unwrap().as_deref(),
            Some(r#"{"BTCUSDT":"leader-a"}"#)
        );
    }

    #[tokio::test]
    async fn test_failed_write_reraises_flag() {
        let store = shared_store();
        store.lock().await.set_symbol_metadata("BTCUSDT", "leader-a".to_string());
        let backend = InMemoryMetadataBackend::new();
        backend.set_fail_writes(true);

        let result = persist_if_pending(&store, &backend, "acct").await;

        assert!(matches!(result, Err(StoreError::Persistence(_))));
        assert!(store.lock().await.is_pending_persist());

        backend.set_fail_writes(false);
        assert!(persist_if_pending(&store, &backend, "acct").await.unwrap());
        assert!(!store.lock().await.is_pending_persist());
    }

    #[tokio::test]
    async fn test_restore_does_not_raise_flag() {
        let backend = InMemoryMetadataBackend::new();
        backend
            .save_snapshot("acct", r#"{"ETHUSDT":"leader-b"}"#)
            .await
            .unwrap();
        let store = shared_store();

        let restored = restore_metadata(&store, &backend, "acct").await.unwrap();

        assert_eq!(restored, 1);
        let guard = store.lock().await;
        assert_eq!(guard.get_symbol_metadata("ETHUSDT").map(String::as_str), Some("leader-b"));
        assert!(!guard.is_pending_persist());
    }

    #[tokio::test]
    async fn test_restore_missing_snapshot() {
        let backend = InMemoryMetadataBackend::new();
        let store = shared_store();
        assert_eq!(restore_metadata(&store, &backend, "acct").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_restore_corrupt_snapshot_fails() {
        let backend = InMemoryMetadataBackend::new();
        backend.save_snapshot("acct", "not json").await.unwrap();
        let store = shared_store();

        let result = restore_metadata(&store, &backend, "acct").await;
        assert!(matches!(result, Err(StoreError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_persister_flushes_on_shutdown() {
        let store = Arc::new(shared_store());
        let backend = Arc::new(InMemoryMetadataBackend::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_metadata_persister(
            store.clone(),
            backend.clone(),
            "acct".to_string(),
            Duration::from_secs(3600),
            shutdown_rx,
        ));

        // Let the immediate first tick pass with nothing pending
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.lock().await.set_symbol_metadata("SOLUSDT", "leader-c".to_string());

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(backend.write_count(), 1);
        assert!(!store.lock().await.is_pending_persist());
    }
}
