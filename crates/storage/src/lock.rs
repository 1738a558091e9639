//! Per-key critical sections.
//!
//! [`KeyLocks`] hands out an async mutex per collection+key so that a
//! read-merge-write sequence on one record cannot interleave with another
//! writer of the same record, while operations on different keys proceed in
//! parallel.
//!
//! # Lock Ordering
//!
//! Callers that hold more than one guard at a time must acquire them in a
//! fixed global order. The service layer always locks a user before any of
//! that user's checks.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::Collection;

/// Registry size above which dead entries are pruned on the next insert.
const PRUNE_THRESHOLD: usize = 1024;

type LockMap = HashMap<(Collection, String), Weak<AsyncMutex<()>>>;

/// Shared registry of per-key async mutexes.
///
/// Entries are held weakly: once every guard and waiter for a key is gone the
/// mutex is freed, and its registry slot is pruned lazily.
///
/// # Cloning
///
/// Clones share the same registry.
///
/// # Example
///
/// ```
/// use uptime_storage::{Collection, KeyLocks};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let locks = KeyLocks::new();
/// let guard = locks.lock(Collection::Users, "5551234567").await;
/// // read, merge, write ...
/// drop(guard);
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct KeyLocks {
    inner: Arc<Mutex<LockMap>>,
}

/// Guard for one collection+key. The critical section ends when it drops.
#[derive(Debug)]
#[must_use = "the critical section ends as soon as the guard is dropped"]
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}

impl KeyLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `collection`/`key`.
    pub async fn lock(&self, collection: Collection, key: &str) -> KeyGuard {
        let mutex = self.mutex_for(collection, key);
        KeyGuard { _guard: mutex.lock_owned().await }
    }

    /// Number of registry slots, live or dead.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.inner.lock().len()
    }

    fn mutex_for(&self, collection: Collection, key: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock();
        let slot = (collection, key.to_owned());

        if let Some(existing) = map.get(&slot).and_then(Weak::upgrade) {
            return existing;
        }

        if map.len() >= PRUNE_THRESHOLD {
            map.retain(|_, weak| weak.strong_count() > 0);
        }

        let mutex = Arc::new(AsyncMutex::new(()));
        map.insert(slot, Arc::downgrade(&mutex));
        mutex
    }
}
