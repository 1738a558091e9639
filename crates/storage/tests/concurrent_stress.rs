//! Concurrent access stress tests for record stores.
//!
//! These tests exercise the stores and the per-key lock registry under
//! multi-threaded workloads to detect lost updates and create-over-create
//! races.

#![allow(clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use uptime_storage::{Collection, KeyLocks, MemoryStore, RecordStore, RecordStoreExt};

/// Number of concurrent tasks for most tests.
const CONCURRENCY: usize = 16;

/// Number of increments each task performs.
const OPS_PER_TASK: usize = 25;

#[derive(Debug, Serialize, Deserialize)]
struct Counter {
    value: usize,
}

// ---------------------------------------------------------------------------
// Test: read-merge-write under KeyLocks loses no update
// ---------------------------------------------------------------------------

/// Every task increments the same record `OPS_PER_TASK` times inside the
/// record's critical section. The final value must account for every
/// increment.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn locked_read_merge_write_loses_no_update() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let locks = KeyLocks::new();
    store.create_json(Collection::Users, "counter", &Counter { value: 0 }).await.expect("seed");

    let mut set = JoinSet::new();
    for _ in 0..CONCURRENCY {
        let store = Arc::clone(&store);
        let locks = locks.clone();
        set.spawn(async move {
            for _ in 0..OPS_PER_TASK {
                let _guard = locks.lock(Collection::Users, "counter").await;
                let mut counter: Counter =
                    store.read_json(Collection::Users, "counter").await.expect("read");
                tokio::task::yield_now().await;
                counter.value += 1;
                store.update_json(Collection::Users, "counter", &counter).await.expect("update");
            }
        });
    }
    while let Some(result) = set.join_next().await {
        result.expect("task should not panic");
    }

    let counter: Counter = store.read_json(Collection::Users, "counter").await.expect("read");
    assert_eq!(counter.value, CONCURRENCY * OPS_PER_TASK);
}

// ---------------------------------------------------------------------------
// Test: disjoint keys proceed independently
// ---------------------------------------------------------------------------

/// Each task owns its own key; all records must exist afterwards with the
/// writer's final value.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disjoint_keys_are_independent() {
    let store = MemoryStore::new();

    let mut set = JoinSet::new();
    for task in 0..CONCURRENCY {
        let store = store.clone();
        set.spawn(async move {
            let key = format!("k{task:03}");
            store.create_json(Collection::Checks, &key, &Counter { value: 0 }).await.expect("create");
            for i in 1..=OPS_PER_TASK {
                store.update_json(Collection::Checks, &key, &Counter { value: i }).await.expect("update");
            }
        });
    }
    while let Some(result) = set.join_next().await {
        result.expect("task should not panic");
    }

    assert_eq!(store.len(Collection::Checks), CONCURRENCY);
    for task in 0..CONCURRENCY {
        let counter: Counter =
            store.read_json(Collection::Checks, &format!("k{task:03}")).await.expect("read");
        assert_eq!(counter.value, OPS_PER_TASK);
    }
}

// ---------------------------------------------------------------------------
// Test: create/delete churn on one key never corrupts the record
// ---------------------------------------------------------------------------

/// Tasks race to create and delete one key. Every observed error must be a
/// `Conflict` or `NotFound`, and a surviving record must be a complete write.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn create_delete_churn_yields_only_expected_errors() {
    let store = MemoryStore::new();

    let mut set = JoinSet::new();
    for task in 0..CONCURRENCY {
        let store = store.clone();
        set.spawn(async move {
            for i in 0..OPS_PER_TASK {
                let result = if (task + i) % 2 == 0 {
                    store.create_json(Collection::Tokens, "churn", &Counter { value: task }).await
                } else {
                    store.delete(Collection::Tokens, "churn").await
                };
                if let Err(e) = result {
                    assert!(e.is_conflict() || e.is_not_found(), "unexpected error: {e}");
                }
            }
        });
    }
    while let Some(result) = set.join_next().await {
        result.expect("task should not panic");
    }

    let survivor: Result<Counter, _> = store.read_json(Collection::Tokens, "churn").await;
    if let Ok(counter) = survivor {
        assert!(counter.value < CONCURRENCY);
    }
}
