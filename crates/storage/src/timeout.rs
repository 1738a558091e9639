//! Bounded-time wrapper for any record store.
//!
//! [`TimeoutStore`] races every operation of an inner store against a
//! deadline. An elapsed deadline surfaces as [`StorageError::Timeout`] naming
//! the operation; it is never retried here.
//!
//! Dropping the inner future does not undo work it already handed off, so a
//! timed-out write may still take effect.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    backend::RecordStore,
    error::{StorageError, StorageResult},
    types::Collection,
};

/// Default per-operation deadline.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Record store decorator enforcing a per-operation timeout.
///
/// # Example
///
/// ```
/// use std::{sync::Arc, time::Duration};
///
/// use uptime_storage::{MemoryStore, TimeoutStore};
///
/// let store = TimeoutStore::new(Arc::new(MemoryStore::new()), Duration::from_millis(250));
/// assert_eq!(store.timeout(), Duration::from_millis(250));
/// ```
#[derive(Clone)]
pub struct TimeoutStore {
    inner: Arc<dyn RecordStore>,
    timeout: Duration,
}

impl TimeoutStore {
    /// Wraps `inner`, bounding each operation by `timeout`.
    #[must_use]
    pub fn new(inner: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// The configured per-operation deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = StorageResult<T>> + Send,
    ) -> StorageResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_elapsed) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "store operation timed out"
                );
                Err(StorageError::timeout(operation))
            },
        }
    }
}

impl std::fmt::Debug for TimeoutStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutStore").field("timeout", &self.timeout).finish_non_exhaustive()
    }
}

#[async_trait]
impl RecordStore for TimeoutStore {
    async fn create(&self, collection: Collection, key: &str, record: Bytes) -> StorageResult<()> {
        self.bounded("create", self.inner.create(collection, key, record)).await
    }

    async fn read(&self, collection: Collection, key: &str) -> StorageResult<Bytes> {
        self.bounded("read", self.inner.read(collection, key)).await
    }

    async fn update(&self, collection: Collection, key: &str, record: Bytes) -> StorageResult<()> {
        self.bounded("update", self.inner.update(collection, key, record)).await
    }

    async fn delete(&self, collection: Collection, key: &str) -> StorageResult<()> {
        self.bounded("delete", self.inner.delete(collection, key)).await
    }

    async fn list_keys(&self, collection: Collection) -> StorageResult<Vec<String>> {
        self.bounded("list_keys", self.inner.list_keys(collection)).await
    }
}
