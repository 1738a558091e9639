//! Shared test utilities for record store testing.
//!
//! Feature-gated behind `testutil` so the helpers never leak into production
//! builds. Enable it from a downstream crate's `[dev-dependencies]`:
//!
//! ```toml
//! [dev-dependencies]
//! uptime-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! The main helper is [`FailingStore`], a wrapper that injects failures or
//! latency into chosen operations so multi-step callers can be tested against
//! partial failure.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::{
    backend::RecordStore,
    error::{StorageError, StorageResult},
    types::Collection,
};

/// Store operation selector for failure injection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`RecordStore::create`]
    Create,
    /// [`RecordStore::read`]
    Read,
    /// [`RecordStore::update`]
    Update,
    /// [`RecordStore::delete`]
    Delete,
    /// [`RecordStore::list_keys`]
    ListKeys,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Outcome {
    Fail,
    HangAfterApply,
}

#[derive(Debug)]
struct FailureRule {
    operation: Operation,
    collection: Collection,
    key: Option<String>,
    remaining: Option<usize>,
    outcome: Outcome,
}

impl FailureRule {
    fn matches(&self, operation: Operation, collection: Collection, key: Option<&str>) -> bool {
        self.operation == operation
            && self.collection == collection
            && self.key.as_deref().is_none_or(|k| Some(k) == key)
            && self.remaining != Some(0)
    }
}

/// A [`RecordStore`] wrapper that fails or delays selected operations.
///
/// Rules are shared between clones, so a test can keep one handle while the
/// code under test owns another behind an `Arc<dyn RecordStore>`.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use uptime_storage::{Collection, MemoryStore};
/// use uptime_storage::testutil::{FailingStore, Operation};
///
/// let store = FailingStore::new(MemoryStore::new());
/// store.fail(Operation::Delete, Collection::Checks, Some("c2"));
/// ```
#[derive(Clone, Debug)]
pub struct FailingStore<S> {
    inner: S,
    rules: Arc<Mutex<Vec<FailureRule>>>,
    delay: Option<Duration>,
    injected: Arc<AtomicUsize>,
}

impl<S: RecordStore> FailingStore<S> {
    /// Wraps `inner` with no failure rules.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            rules: Arc::new(Mutex::new(Vec::new())),
            delay: None,
            injected: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleeps for `delay` before every operation.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails every matching operation. `key: None` matches any key.
    pub fn fail(&self, operation: Operation, collection: Collection, key: Option<&str>) {
        self.push_rule(operation, collection, key, None, Outcome::Fail);
    }

    /// Applies every matching operation to the inner store, then never
    /// returns, like a write whose acknowledgement is lost.
    ///
    /// Pair with a [`TimeoutStore`](crate::TimeoutStore) to observe a write
    /// that lands although the caller saw a timeout.
    pub fn hang_after_apply(&self, operation: Operation, collection: Collection) {
        self.push_rule(operation, collection, None, None, Outcome::HangAfterApply);
    }

    /// Fails the next `times` matching operations, then passes through.
    pub fn fail_times(
        &self,
        operation: Operation,
        collection: Collection,
        key: Option<&str>,
        times: usize,
    ) {
        self.push_rule(operation, collection, key, Some(times), Outcome::Fail);
    }

    /// Removes every failure rule.
    pub fn clear(&self) {
        self.rules.lock().clear();
    }

    /// Number of failures injected so far.
    #[must_use]
    pub fn injected(&self) -> usize {
        self.injected.load(Ordering::SeqCst)
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn push_rule(
        &self,
        operation: Operation,
        collection: Collection,
        key: Option<&str>,
        remaining: Option<usize>,
        outcome: Outcome,
    ) {
        self.rules.lock().push(FailureRule {
            operation,
            collection,
            key: key.map(str::to_owned),
            remaining,
            outcome,
        });
    }

    /// Applies the delay and the first matching rule. `Ok(true)` means the
    /// operation must hang once applied.
    async fn check(
        &self,
        operation: Operation,
        collection: Collection,
        key: Option<&str>,
    ) -> StorageResult<bool> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut rules = self.rules.lock();
        let Some(rule) = rules.iter_mut().find(|r| r.matches(operation, collection, key)) else {
            return Ok(false);
        };
        if let Some(remaining) = rule.remaining.as_mut() {
            *remaining -= 1;
        }
        self.injected.fetch_add(1, Ordering::SeqCst);

        match rule.outcome {
            Outcome::HangAfterApply => Ok(true),
            Outcome::Fail => Err(StorageError::internal(format!(
                "injected {operation:?} failure on {collection}/{}",
                key.map_or("*", |k| collection.log_key(k))
            ))),
        }
    }
}

async fn settle<T>(hang: bool, result: T) -> T {
    if hang {
        std::future::pending::<()>().await;
    }
    result
}

#[async_trait]
impl<S: RecordStore> RecordStore for FailingStore<S> {
    async fn create(&self, collection: Collection, key: &str, record: Bytes) -> StorageResult<()> {
        let hang = self.check(Operation::Create, collection, Some(key)).await?;
        settle(hang, self.inner.create(collection, key, record).await).await
    }

    async fn read(&self, collection: Collection, key: &str) -> StorageResult<Bytes> {
        let hang = self.check(Operation::Read, collection, Some(key)).await?;
        settle(hang, self.inner.read(collection, key).await).await
    }

    async fn update(&self, collection: Collection, key: &str, record: Bytes) -> StorageResult<()> {
        let hang = self.check(Operation::Update, collection, Some(key)).await?;
        settle(hang, self.inner.update(collection, key, record).await).await
    }

    async fn delete(&self, collection: Collection, key: &str) -> StorageResult<()> {
        let hang = self.check(Operation::Delete, collection, Some(key)).await?;
        settle(hang, self.inner.delete(collection, key).await).await
    }

    async fn list_keys(&self, collection: Collection) -> StorageResult<Vec<String>> {
        let hang = self.check(Operation::ListKeys, collection, None).await?;
        settle(hang, self.inner.list_keys(collection).await).await
    }
}

/// Assert that a [`StorageResult`] is an error of the given
/// [`StorageError`] variant.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use uptime_storage::{Collection, StorageError, StorageResult, assert_storage_error};
///
/// let result: StorageResult<()> = Err(StorageError::not_found(Collection::Users, "x"));
/// assert_storage_error!(result, NotFound);
/// ```
#[macro_export]
macro_rules! assert_storage_error {
    ($result:expr, $variant:ident) => {{
        let result = $result;
        assert!(
            matches!(result, Err($crate::StorageError::$variant { .. })),
            "expected StorageError::{}, got: {:?}",
            stringify!($variant),
            result,
        );
    }};
    ($result:expr, $variant:ident, $msg:expr) => {{
        let result = $result;
        assert!(
            matches!(result, Err($crate::StorageError::$variant { .. })),
            "{}: expected StorageError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            result,
        );
    }};
}
