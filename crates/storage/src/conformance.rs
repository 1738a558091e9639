//! Conformance test suite for [`RecordStore`] implementations.
//!
//! Every backend runs the same async checks so the service layer can swap
//! backends without changing behavior.
//!
//! # Usage
//!
//! ```no_run
//! use uptime_storage::{MemoryStore, conformance};
//!
//! #[tokio::test]
//! async fn crud_read_missing_is_not_found() {
//!     conformance::crud_read_missing_is_not_found(&MemoryStore::new()).await;
//! }
//! ```

use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinSet;

use crate::{assert_storage_error, backend::RecordStore, types::Collection};

// ============================================================================
// CRUD
// ============================================================================

/// `read` on a missing key fails with `NotFound`.
pub async fn crud_read_missing_is_not_found<S: RecordStore + ?Sized>(store: &S) {
    assert_storage_error!(store.read(Collection::Users, "missing").await, NotFound);
}

/// `create` then `read` returns the stored bytes.
pub async fn crud_create_then_read<S: RecordStore + ?Sized>(store: &S) {
    store.create(Collection::Users, "u1", Bytes::from("v1")).await.expect("create");
    let record = store.read(Collection::Users, "u1").await.expect("read");
    assert_eq!(record, Bytes::from("v1"));
}

/// A second `create` on the same key fails and leaves the first record intact.
pub async fn crud_create_existing_conflicts<S: RecordStore + ?Sized>(store: &S) {
    store.create(Collection::Tokens, "t1", Bytes::from("first")).await.expect("create");
    assert_storage_error!(
        store.create(Collection::Tokens, "t1", Bytes::from("second")).await,
        Conflict
    );
    let record = store.read(Collection::Tokens, "t1").await.expect("read");
    assert_eq!(record, Bytes::from("first"), "conflicting create must not overwrite");
}

/// `update` replaces the whole record.
pub async fn crud_update_replaces_record<S: RecordStore + ?Sized>(store: &S) {
    store.create(Collection::Checks, "c1", Bytes::from(r#"{"a":1,"b":2}"#)).await.expect("create");
    store.update(Collection::Checks, "c1", Bytes::from(r#"{"a":3}"#)).await.expect("update");
    let record = store.read(Collection::Checks, "c1").await.expect("read");
    assert_eq!(record, Bytes::from(r#"{"a":3}"#));
}

/// `update` on a missing key fails with `NotFound` and does not create it.
pub async fn crud_update_missing_is_not_found<S: RecordStore + ?Sized>(store: &S) {
    assert_storage_error!(store.update(Collection::Checks, "ghost", Bytes::new()).await, NotFound);
    assert_storage_error!(store.read(Collection::Checks, "ghost").await, NotFound);
}

/// `delete` removes the record.
pub async fn crud_delete_removes_record<S: RecordStore + ?Sized>(store: &S) {
    store.create(Collection::Users, "u2", Bytes::from("v")).await.expect("create");
    store.delete(Collection::Users, "u2").await.expect("delete");
    assert_storage_error!(store.read(Collection::Users, "u2").await, NotFound);
}

/// `delete` on a missing key fails with `NotFound`.
pub async fn crud_delete_missing_is_not_found<S: RecordStore + ?Sized>(store: &S) {
    assert_storage_error!(store.delete(Collection::Users, "ghost").await, NotFound);
}

/// The same key in two collections addresses two records.
pub async fn crud_collections_are_flat_namespaces<S: RecordStore + ?Sized>(store: &S) {
    store.create(Collection::Users, "shared", Bytes::from("user")).await.expect("create user");
    store.create(Collection::Checks, "shared", Bytes::from("check")).await.expect("create check");
    store.delete(Collection::Users, "shared").await.expect("delete user");
    let record = store.read(Collection::Checks, "shared").await.expect("read check");
    assert_eq!(record, Bytes::from("check"));
}

// ============================================================================
// Keys
// ============================================================================

/// `list_keys` returns exactly the live keys of one collection.
pub async fn keys_list_returns_live_keys<S: RecordStore + ?Sized>(store: &S) {
    for key in ["a", "b", "c"] {
        store.create(Collection::Tokens, key, Bytes::from("x")).await.expect("create");
    }
    store.create(Collection::Users, "z", Bytes::from("x")).await.expect("create other");
    store.delete(Collection::Tokens, "b").await.expect("delete");

    let mut keys = store.list_keys(Collection::Tokens).await.expect("list");
    keys.sort();
    assert_eq!(keys, vec!["a".to_owned(), "c".to_owned()]);
}

/// Path-like keys are rejected by every operation.
pub async fn keys_invalid_are_rejected<S: RecordStore + ?Sized>(store: &S) {
    assert_storage_error!(store.create(Collection::Users, "../x", Bytes::new()).await, InvalidKey);
    assert_storage_error!(store.read(Collection::Users, "a/b").await, InvalidKey);
    assert_storage_error!(store.update(Collection::Users, "", Bytes::new()).await, InvalidKey);
    assert_storage_error!(store.delete(Collection::Users, "x.json").await, InvalidKey);
}

// ============================================================================
// Concurrency
// ============================================================================

/// Concurrent creates of one key produce exactly one winner.
pub async fn concurrent_create_has_single_winner(store: Arc<dyn RecordStore>) {
    const CONTENDERS: usize = 16;

    let mut set = JoinSet::new();
    for task in 0..CONTENDERS {
        let store = Arc::clone(&store);
        set.spawn(async move {
            let record = Bytes::from(format!("task{task}"));
            (task, store.create(Collection::Users, "5551234567", record).await)
        });
    }

    let mut winners = Vec::new();
    let mut conflicts = 0usize;
    while let Some(joined) = set.join_next().await {
        let (task, result) = joined.expect("task should not panic");
        match result {
            Ok(()) => winners.push(task),
            Err(e) if e.is_conflict() => conflicts += 1,
            Err(e) => panic!("unexpected error from task {task}: {e}"),
        }
    }

    assert_eq!(winners.len(), 1, "exactly one create should succeed");
    assert_eq!(conflicts, CONTENDERS - 1);

    let record = store.read(Collection::Users, "5551234567").await.expect("read");
    assert_eq!(record, Bytes::from(format!("task{}", winners[0])), "winner's record must survive");
}

/// Runs every conformance check against fresh stores from `make`.
pub async fn run_all<F, Fut>(make: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Arc<dyn RecordStore>>,
{
    crud_read_missing_is_not_found(make().await.as_ref()).await;
    crud_create_then_read(make().await.as_ref()).await;
    crud_create_existing_conflicts(make().await.as_ref()).await;
    crud_update_replaces_record(make().await.as_ref()).await;
    crud_update_missing_is_not_found(make().await.as_ref()).await;
    crud_delete_removes_record(make().await.as_ref()).await;
    crud_delete_missing_is_not_found(make().await.as_ref()).await;
    crud_collections_are_flat_namespaces(make().await.as_ref()).await;
    keys_list_returns_live_keys(make().await.as_ref()).await;
    keys_invalid_are_rejected(make().await.as_ref()).await;
    concurrent_create_has_single_winner(make().await).await;
}
