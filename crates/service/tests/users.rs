//! User lifecycle through the router.

#![allow(clippy::expect_used, clippy::panic, clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use common::{ADA, GRACE, PASSWORD, harness, signup_payload, with_payload, with_query};
use serde_json::json;
use tokio::task::JoinSet;
use uptime_storage::{Collection, RecordStoreExt, testutil::Operation};

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn signup_then_repeat_conflicts() {
    let h = harness();

    let first = h.signup(ADA).await;
    assert_eq!(first.status, 200);
    assert_eq!(first.body, json!({}));

    let second = h.signup(ADA).await;
    assert_eq!(second.status, 400);
    assert_eq!(second.error_message(), Some("A user with that phone number already exists"));
}

#[tokio::test]
async fn signup_stores_trimmed_fields_and_digest() {
    let h = harness();
    let mut payload = signup_payload(" 5551234567 ");
    payload["firstName"] = json!("  Ada  ");
    assert_eq!(h.call(with_payload("users", "post", payload, None)).await.status, 200);

    let stored: serde_json::Value = h.store.read_json(Collection::Users, ADA).await.unwrap();
    assert_eq!(stored["firstName"], "Ada");
    assert_eq!(stored["phone"], ADA);
    assert_eq!(stored["checks"], json!([]));
    assert_ne!(stored["hashedPassword"], PASSWORD);
}

#[tokio::test]
async fn signup_rejects_invalid_fields() {
    let h = harness();
    let cases = [
        ("firstName", json!("   ")),
        ("lastName", json!(null)),
        ("phone", json!("555123456")),
        ("phone", json!("555123456x")),
        ("password", json!("")),
        ("tosAgreement", json!(false)),
        ("tosAgreement", json!("true")),
    ];
    for (field, value) in cases {
        let mut payload = signup_payload(ADA);
        payload[field] = value.clone();
        let response = h.call(with_payload("users", "post", payload, None)).await;
        assert_eq!(response.status, 400, "{field} = {value}");
        assert_eq!(response.error_message(), Some("Missing required fields"));
    }
}

#[tokio::test]
async fn concurrent_signups_have_one_winner() {
    let h = Arc::new(harness());
    let mut set = JoinSet::new();
    for _ in 0..8 {
        let h = Arc::clone(&h);
        set.spawn(async move { h.signup(ADA).await.status });
    }

    let mut statuses = Vec::new();
    while let Some(status) = set.join_next().await {
        statuses.push(status.unwrap());
    }
    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == 400).count(), 7);
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_user_strips_digest() {
    let h = harness();
    let token = h.user_with_token(ADA).await;

    let response = h.get_user(ADA, &token).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["phone"], ADA);
    assert_eq!(response.body["lastName"], "Lovelace");
    assert!(response.body.get("hashedPassword").is_none());
}

#[tokio::test]
async fn get_user_requires_matching_token() {
    let h = harness();
    let ada = h.user_with_token(ADA).await;
    let grace = h.user_with_token(GRACE).await;

    assert_eq!(h.get_user(ADA, &grace).await.status, 403);
    assert_eq!(h.call(with_query("users", "get", json!({"phone": ADA}), None)).await.status, 403);
    assert_eq!(h.get_user(ADA, "zzzzzzzzzzzzzzzzzzzz").await.status, 403);
    assert_eq!(h.get_user(ADA, &ada).await.status, 200);
}

#[tokio::test]
async fn get_user_with_malformed_phone_is_validation() {
    let h = harness();
    let token = h.user_with_token(ADA).await;
    let response = h.call(with_query("users", "get", json!({}), Some(&token))).await;
    assert_eq!(response.status, 400);
    assert_eq!(h.get_user("12345", &token).await.status, 400);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_user_merges_fields_and_rehashes_password() {
    let h = harness();
    let token = h.user_with_token(ADA).await;

    let response = h
        .call(with_payload(
            "users",
            "put",
            json!({"phone": ADA, "lastName": "King", "password": "analytical"}),
            Some(&token),
        ))
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["firstName"], "Ada");
    assert_eq!(response.body["lastName"], "King");

    let old = h
        .call(with_payload("tokens", "post", json!({"phone": ADA, "password": PASSWORD}), None))
        .await;
    assert_eq!(old.status, 400);
    h.login(ADA, "analytical").await;
}

#[tokio::test]
async fn update_user_requires_a_field() {
    let h = harness();
    let token = h.user_with_token(ADA).await;
    let response = h.call(with_payload("users", "put", json!({"phone": ADA}), Some(&token))).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.error_message(), Some("Missing fields to update"));
}

#[tokio::test]
async fn update_user_rejects_malformed_optional_field() {
    let h = harness();
    let token = h.user_with_token(ADA).await;
    let response = h
        .call(with_payload(
            "users",
            "put",
            json!({"phone": ADA, "firstName": "Augusta", "lastName": 42}),
            Some(&token),
        ))
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.error_message(), Some("Invalid field: lastName"));

    let unchanged = h.get_user(ADA, &token).await;
    assert_eq!(unchanged.body["firstName"], "Ada");
}

#[tokio::test]
async fn update_user_requires_matching_token() {
    let h = harness();
    h.user_with_token(ADA).await;
    let grace = h.user_with_token(GRACE).await;
    let response = h
        .call(with_payload("users", "put", json!({"phone": ADA, "firstName": "X"}), Some(&grace)))
        .await;
    assert_eq!(response.status, 403);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_user_removes_user_and_checks() {
    let h = harness();
    let token = h.user_with_token(ADA).await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        let response = h.create_check(&token).await;
        assert_eq!(response.status, 200);
        ids.push(response.body["id"].as_str().unwrap().to_owned());
    }

    let response = h.call(with_query("users", "delete", json!({"phone": ADA}), Some(&token))).await;
    assert_eq!(response.status, 200, "{:?}", response.body);

    assert!(h.store.inner().is_empty(Collection::Users));
    assert!(h.store.inner().is_empty(Collection::Checks));
    assert_eq!(h.get_user(ADA, &token).await.status, 403, "token revoked with its user");
}

#[tokio::test]
async fn old_tokens_cannot_act_for_a_new_account_on_the_same_phone() {
    let h = harness();
    let old = h.user_with_token(ADA).await;
    let grace = h.user_with_token(GRACE).await;
    let response = h.call(with_query("users", "delete", json!({"phone": ADA}), Some(&old))).await;
    assert_eq!(response.status, 200);

    assert_eq!(h.call(with_query("tokens", "get", json!({"id": &old}), None)).await.status, 404);
    assert_eq!(h.signup(ADA).await.status, 200);
    assert_eq!(h.get_user(ADA, &old).await.status, 403);
    assert_eq!(h.create_check(&old).await.status, 403);

    let fresh = h.login(ADA, PASSWORD).await;
    assert_eq!(h.get_user(ADA, &fresh).await.status, 200);
    assert_eq!(h.get_user(GRACE, &grace).await.status, 200, "other users keep their tokens");
}

#[tokio::test]
async fn delete_user_reports_unrevoked_tokens() {
    let h = harness();
    let token = h.user_with_token(ADA).await;
    h.store.fail(Operation::ListKeys, Collection::Tokens, None);

    let response = h.call(with_query("users", "delete", json!({"phone": ADA}), Some(&token))).await;
    assert_eq!(response.status, 500);
    assert_eq!(response.error_message(), Some("Could not access the store"));
    assert!(h.store.inner().is_empty(Collection::Users), "user is still deleted");
}

#[tokio::test]
async fn delete_user_requires_matching_token() {
    let h = harness();
    h.user_with_token(ADA).await;
    let grace = h.user_with_token(GRACE).await;
    let response = h.call(with_query("users", "delete", json!({"phone": ADA}), Some(&grace))).await;
    assert_eq!(response.status, 403);
    assert_eq!(h.store.inner().len(Collection::Users), 2);
}
