//! Check operations through the router: validation, quota, ownership.

#![allow(clippy::expect_used, clippy::panic, clippy::unwrap_used)]

mod common;

use std::{sync::Arc, time::Duration};

use common::{
    ADA, GRACE, check_id, check_payload, harness, harness_with_quota, slow_harness, with_payload,
    with_query,
};
use serde_json::json;
use tokio::task::JoinSet;
use uptime_service::{Check, User};
use uptime_storage::{Collection, RecordStore, RecordStoreExt};

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_check_links_owner() {
    let h = harness();
    let token = h.user_with_token(ADA).await;

    let response = h.create_check(&token).await;
    assert_eq!(response.status, 200, "{:?}", response.body);
    assert_eq!(response.body["id"], check_id(0).as_str());
    assert_eq!(response.body["userPhone"], ADA);
    assert_eq!(response.body["successCodes"], json!([200, 201]));

    let user = h.get_user(ADA, &token).await;
    assert_eq!(user.body["checks"], json!([check_id(0)]));
}

#[tokio::test]
async fn owner_comes_from_token_not_payload() {
    let h = harness();
    let token = h.user_with_token(ADA).await;
    h.user_with_token(GRACE).await;

    let mut payload = check_payload();
    payload["userPhone"] = json!(GRACE);
    let response = h.call(with_payload("checks", "post", payload, Some(&token))).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["userPhone"], ADA);
}

#[tokio::test]
async fn create_check_rejects_invalid_inputs() {
    let h = harness();
    let token = h.user_with_token(ADA).await;
    let cases = [
        ("protocol", json!("ftp")),
        ("url", json!("  ")),
        ("method", json!("patch")),
        ("successCodes", json!([])),
        ("successCodes", json!("200")),
        ("timeoutSeconds", json!(0)),
        ("timeoutSeconds", json!(6)),
    ];
    for (field, value) in cases {
        let mut payload = check_payload();
        payload[field] = value.clone();
        let response = h.call(with_payload("checks", "post", payload, Some(&token))).await;
        assert_eq!(response.status, 400, "{field} = {value}");
        assert_eq!(response.error_message(), Some("Missing required inputs, or inputs are invalid"));
    }
}

#[tokio::test]
async fn create_check_requires_valid_token() {
    let h = harness();
    h.user_with_token(ADA).await;

    let missing = h.call(with_payload("checks", "post", check_payload(), None)).await;
    assert_eq!(missing.status, 403);
    let unknown = h.create_check("zzzzzzzzzzzzzzzzzzzz").await;
    assert_eq!(unknown.status, 403);
}

#[tokio::test]
async fn create_check_for_deleted_owner_is_forbidden() {
    let h = harness();
    let token = h.user_with_token(ADA).await;
    h.store.delete(Collection::Users, ADA).await.unwrap();

    assert_eq!(h.create_check(&token).await.status, 403);
    assert!(h.store.inner().is_empty(Collection::Checks));
}

// ---------------------------------------------------------------------------
// Quota
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quota_boundary() {
    let h = harness_with_quota(5);
    let token = h.user_with_token(ADA).await;

    for n in 0..4 {
        assert_eq!(h.create_check(&token).await.status, 200, "check {n}");
    }
    assert_eq!(h.create_check(&token).await.status, 200, "fifth check fits the quota");

    let sixth = h.create_check(&token).await;
    assert_eq!(sixth.status, 400);
    assert_eq!(sixth.error_message(), Some("The user already has the maximum number of checks (5)"));
    assert_eq!(h.store.inner().len(Collection::Checks), 5);
}

/// Per-operation store latency for the race tests. Long enough that
/// unsynchronized requests would all read the owner before any writes it.
const RACE_DELAY: Duration = Duration::from_millis(5);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_never_exceed_quota() {
    let h = Arc::new(slow_harness(3, RACE_DELAY));
    let token = Arc::new(h.user_with_token(ADA).await);

    let mut set = JoinSet::new();
    for _ in 0..12 {
        let h = Arc::clone(&h);
        let token = Arc::clone(&token);
        set.spawn(async move { h.create_check(&token).await.status });
    }
    let mut created = 0;
    while let Some(status) = set.join_next().await {
        match status.unwrap() {
            200 => created += 1,
            400 => {},
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(created, 3);
    let user: User = h.store.read_json(Collection::Users, ADA).await.unwrap();
    assert_eq!(user.checks.len(), 3);
    assert_eq!(h.store.inner().len(Collection::Checks), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_user_updates_never_drop_check_links() {
    let h = Arc::new(slow_harness(10, RACE_DELAY));
    let token = Arc::new(h.user_with_token(ADA).await);

    let mut set = JoinSet::new();
    for n in 0..6 {
        let h1 = Arc::clone(&h);
        let token1 = Arc::clone(&token);
        set.spawn(async move { ("create", h1.create_check(&token1).await.status) });

        let h = Arc::clone(&h);
        let token = Arc::clone(&token);
        set.spawn(async move {
            let payload = json!({"phone": ADA, "firstName": format!("Ada{n}")});
            ("update", h.call(with_payload("users", "put", payload, Some(&token))).await.status)
        });
    }
    while let Some(joined) = set.join_next().await {
        let (kind, status) = joined.unwrap();
        assert_eq!(status, 200, "{kind}");
    }

    let user: User = h.store.read_json(Collection::Users, ADA).await.unwrap();
    let mut linked = user.checks.clone();
    linked.sort();
    let mut stored = h.store.inner().list_keys(Collection::Checks).await.unwrap();
    stored.sort();
    assert_eq!(linked.len(), 6, "every created check stays linked");
    assert_eq!(linked, stored);
    let names: Vec<String> = (0..6).map(|n| format!("Ada{n}")).collect();
    assert!(names.contains(&user.first_name), "last update wins: {}", user.first_name);
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_check_with_other_users_token_is_forbidden() {
    let h = harness();
    let ada = h.user_with_token(ADA).await;
    let grace = h.user_with_token(GRACE).await;
    h.create_check(&ada).await;

    let id = check_id(0);
    let own = h.call(with_query("checks", "get", json!({"id": &id}), Some(&ada))).await;
    assert_eq!(own.status, 200);
    let other = h.call(with_query("checks", "get", json!({"id": &id}), Some(&grace))).await;
    assert_eq!(other.status, 403);
}

#[tokio::test]
async fn get_check_missing_or_malformed() {
    let h = harness();
    let token = h.user_with_token(ADA).await;
    let missing = h.call(with_query("checks", "get", json!({"id": check_id(9)}), Some(&token))).await;
    assert_eq!(missing.status, 404);
    let malformed = h.call(with_query("checks", "get", json!({"id": "nope"}), Some(&token))).await;
    assert_eq!(malformed.status, 400);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_check_merges_supplied_fields() {
    let h = harness();
    let token = h.user_with_token(ADA).await;
    h.create_check(&token).await;

    let response = h
        .call(with_payload(
            "checks",
            "put",
            json!({"id": check_id(0), "protocol": "http", "timeoutSeconds": 5}),
            Some(&token),
        ))
        .await;
    assert_eq!(response.status, 200, "{:?}", response.body);

    let stored: Check = h.store.read_json(Collection::Checks, &check_id(0)).await.unwrap();
    assert_eq!(stored.protocol, uptime_service::Protocol::Http);
    assert_eq!(stored.timeout_seconds, 5);
    assert_eq!(stored.url, "example.com/health");
}

#[tokio::test]
async fn update_check_validation() {
    let h = harness();
    let token = h.user_with_token(ADA).await;
    h.create_check(&token).await;

    let nothing = h.call(with_payload("checks", "put", json!({"id": check_id(0)}), Some(&token))).await;
    assert_eq!(nothing.status, 400);
    assert_eq!(nothing.error_message(), Some("Missing fields to update"));

    let malformed = h
        .call(with_payload(
            "checks",
            "put",
            json!({"id": check_id(0), "url": "ok.example", "method": "fetch"}),
            Some(&token),
        ))
        .await;
    assert_eq!(malformed.status, 400);
    assert_eq!(malformed.error_message(), Some("Invalid field: method"));

    let missing = h
        .call(with_payload("checks", "put", json!({"id": check_id(7), "url": "x"}), Some(&token)))
        .await;
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn update_check_requires_owner_token() {
    let h = harness();
    let ada = h.user_with_token(ADA).await;
    let grace = h.user_with_token(GRACE).await;
    h.create_check(&ada).await;

    let response = h
        .call(with_payload("checks", "put", json!({"id": check_id(0), "url": "evil"}), Some(&grace)))
        .await;
    assert_eq!(response.status, 403);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_check_unlinks_owner() {
    let h = harness();
    let token = h.user_with_token(ADA).await;
    h.create_check(&token).await;
    h.create_check(&token).await;

    let response =
        h.call(with_query("checks", "delete", json!({"id": check_id(0)}), Some(&token))).await;
    assert_eq!(response.status, 200, "{:?}", response.body);

    let user = h.get_user(ADA, &token).await;
    assert_eq!(user.body["checks"], json!([check_id(1)]));
    let again =
        h.call(with_query("checks", "delete", json!({"id": check_id(0)}), Some(&token))).await;
    assert_eq!(again.status, 404);
}

#[tokio::test]
async fn delete_check_requires_owner_token() {
    let h = harness();
    let ada = h.user_with_token(ADA).await;
    let grace = h.user_with_token(GRACE).await;
    h.create_check(&ada).await;

    let response =
        h.call(with_query("checks", "delete", json!({"id": check_id(0)}), Some(&grace))).await;
    assert_eq!(response.status, 403);
    assert_eq!(h.store.inner().len(Collection::Checks), 1);
}
