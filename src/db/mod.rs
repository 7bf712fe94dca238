//! Document store access.
//!
//! The store is the source of truth for all jokes. Two adapters implement
//! [`DocumentStore`]: CouchDB over HTTP and a single-table SQLite store used for
//! local development and tests.

mod couch;
mod repository;
mod sqlite;
mod store;

pub use couch::CouchStore;
pub use repository::*;
pub use sqlite::SqliteStore;
pub use store::*;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, StoreKind};
use crate::errors::AppError;

/// Open the configured store, wait for it to answer and make sure the collection exists.
pub async fn init_store(config: &Config) -> Result<Arc<dyn DocumentStore>, AppError> {
    let store: Arc<dyn DocumentStore> = match config.store {
        StoreKind::CouchDb => Arc::new(CouchStore::new(&config.couch_url, &config.db_name)?),
        StoreKind::Sqlite => Arc::new(SqliteStore::open(&config.sqlite_path).await?),
    };

    wait_for_store(store.as_ref(), config.startup_retries, config.startup_delay).await?;
    store.ensure_database().await?;

    Ok(store)
}

/// Probe the store until it answers, a fixed number of times with a fixed delay.
pub async fn wait_for_store(
    store: &dyn DocumentStore,
    retries: u32,
    delay: Duration,
) -> Result<(), AppError> {
    for attempt in 1..=retries {
        match store.ping().await {
            Ok(()) => {
                tracing::info!("Document store reachable after {} attempt(s)", attempt);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(
                    "Document store not reachable (attempt {}/{}): {}",
                    attempt,
                    retries,
                    e
                );
                if attempt < retries {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(AppError::Unavailable(format!(
        "Document store not reachable after {} retries",
        retries
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::models::WriteResult;

    /// Store that refuses the first `failures` pings.
    struct FlakyStore {
        failures: u32,
        pings: AtomicU32,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn ping(&self) -> Result<(), AppError> {
            let seen = self.pings.fetch_add(1, Ordering::SeqCst);
            if seen < self.failures {
                Err(AppError::Unavailable("connection refused".into()))
            } else {
                Ok(())
            }
        }

        async fn ensure_database(&self) -> Result<(), AppError> {
            Ok(())
        }

        async fn get(&self, _id: &str) -> Result<Option<Value>, AppError> {
            Ok(None)
        }

        async fn insert(&self, _doc: Value) -> Result<WriteResult, AppError> {
            Err(AppError::Internal("not supported".into()))
        }

        async fn list(&self) -> Result<Vec<Value>, AppError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_wait_for_store_succeeds_after_failures() {
        let store = FlakyStore {
            failures: 2,
            pings: AtomicU32::new(0),
        };

        wait_for_store(&store, 5, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(store.pings.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_wait_for_store_gives_up() {
        let store = FlakyStore {
            failures: u32::MAX,
            pings: AtomicU32::new(0),
        };

        let err = wait_for_store(&store, 3, Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
        assert_eq!(store.pings.load(Ordering::SeqCst), 3);
    }
}
