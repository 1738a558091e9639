//! Shared harness for service integration tests.

#![allow(dead_code, clippy::expect_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use serde_json::{Value, json};
use uptime_authn::{
    HmacSha256Hasher, PasswordHasher, TokenManager,
    testutil::{ManualClock, SequenceIdGenerator},
};
use uptime_service::{Orchestrator, Request, Response, Router};
use uptime_storage::{KeyLocks, MemoryStore, testutil::FailingStore};

pub const ADA: &str = "5551234567";
pub const GRACE: &str = "5559876543";
pub const PASSWORD: &str = "hunter2";

/// Ids handed out to checks, in creation order.
pub fn check_id(n: usize) -> String {
    format!("chk{n:017}")
}

pub struct Harness {
    pub router: Router,
    pub orchestrator: Arc<Orchestrator>,
    pub store: FailingStore<MemoryStore>,
    pub clock: ManualClock,
}

pub fn harness() -> Harness {
    harness_with_quota(5)
}

pub fn harness_with_quota(max_checks: usize) -> Harness {
    harness_over(FailingStore::new(MemoryStore::new()), max_checks)
}

/// A harness whose every store operation first sleeps for `delay`, so
/// concurrent requests interleave between their reads and writes.
pub fn slow_harness(max_checks: usize, delay: Duration) -> Harness {
    harness_over(FailingStore::new(MemoryStore::new()).with_delay(delay), max_checks)
}

fn harness_over(store: FailingStore<MemoryStore>, max_checks: usize) -> Harness {
    let hasher: Arc<dyn PasswordHasher> = Arc::new(HmacSha256Hasher::new("thisIsASecret"));
    let locks = KeyLocks::new();
    let clock = ManualClock::default();

    let tokens = TokenManager::builder()
        .store(Arc::new(store.clone()))
        .hasher(Arc::clone(&hasher))
        .clock(Arc::new(clock.clone()))
        .ids(Arc::new(SequenceIdGenerator::new("tok")))
        .locks(locks.clone())
        .build();
    let orchestrator = Arc::new(
        Orchestrator::builder()
            .store(Arc::new(store.clone()))
            .tokens(Arc::new(tokens))
            .hasher(hasher)
            .ids(Arc::new(SequenceIdGenerator::new("chk")))
            .locks(locks)
            .max_checks(max_checks)
            .build(),
    );
    Harness { router: Router::new(Arc::clone(&orchestrator)), orchestrator, store, clock }
}

pub fn with_payload(path: &str, method: &str, payload: Value, token: Option<&str>) -> Request {
    Request::builder().path(path).method(method).payload(payload.into()).maybe_token(token).build()
}

pub fn with_query(path: &str, method: &str, query: Value, token: Option<&str>) -> Request {
    Request::builder().path(path).method(method).query(query.into()).maybe_token(token).build()
}

pub fn signup_payload(phone: &str) -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "phone": phone,
        "password": PASSWORD,
        "tosAgreement": true,
    })
}

pub fn check_payload() -> Value {
    json!({
        "protocol": "https",
        "url": "example.com/health",
        "method": "get",
        "successCodes": [200, 201],
        "timeoutSeconds": 3,
    })
}

impl Harness {
    pub async fn call(&self, request: Request) -> Response {
        self.router.handle(&request).await
    }

    pub async fn signup(&self, phone: &str) -> Response {
        self.call(with_payload("users", "post", signup_payload(phone), None)).await
    }

    /// Signs `phone` up and returns a fresh token id for it.
    pub async fn user_with_token(&self, phone: &str) -> String {
        assert_eq!(self.signup(phone).await.status, 200, "signup {phone}");
        self.login(phone, PASSWORD).await
    }

    pub async fn login(&self, phone: &str, password: &str) -> String {
        let response = self
            .call(with_payload("tokens", "post", json!({"phone": phone, "password": password}), None))
            .await;
        assert_eq!(response.status, 200, "login {phone}: {:?}", response.body);
        response.body["id"].as_str().expect("token id").to_owned()
    }

    pub async fn create_check(&self, token: &str) -> Response {
        self.call(with_payload("checks", "post", check_payload(), Some(token))).await
    }

    pub async fn get_user(&self, phone: &str, token: &str) -> Response {
        self.call(with_query("users", "get", json!({"phone": phone}), Some(token))).await
    }
}
