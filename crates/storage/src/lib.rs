//! Keyed record store abstraction for the uptime monitor.
//!
//! This crate provides the [`RecordStore`] trait and the backends that persist
//! users, session tokens, and health checks. Every record is addressed by a
//! [`Collection`] and a string key; collections are flat namespaces.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    uptime-service                           │
//! │     (validation, authorization, quota, owner ↔ checks)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    uptime-authn                             │
//! │          (token issue / extend / revoke / verify)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    uptime-storage                           │
//! │         RecordStore trait  ·  KeyLocks  ·  TimeoutStore     │
//! │        (create, read, update, delete, list_keys)            │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryStore  │                FileStore                     │
//! │  (testing)   │     (one JSON file per collection/key)       │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use uptime_storage::{Collection, MemoryStore, RecordStoreExt};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!
//!     store.create_json(Collection::Users, "5551234567", &serde_json::json!({"a": 1})).await?;
//!     let value: serde_json::Value = store.read_json(Collection::Users, "5551234567").await?;
//!     assert_eq!(value["a"], 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Consistency
//!
//! Each single-key operation is atomic. There are no multi-key transactions:
//! callers that maintain links between records serialize their
//! read-merge-write sequences with [`KeyLocks`].
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables [`testutil`] (failure-injecting store, assertion macros) and
//!   [`conformance`] (shared backend test suite).

#![deny(unsafe_code)]

pub mod backend;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod conformance;
pub mod error;
pub mod file;
pub mod lock;
pub mod memory;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;
pub mod timeout;
pub mod types;

// Re-export primary types at crate root for convenience
pub use backend::{RecordStore, RecordStoreExt};
pub use error::{BoxError, StorageError, StorageResult};
pub use file::FileStore;
pub use lock::{KeyGuard, KeyLocks};
pub use memory::MemoryStore;
pub use timeout::{DEFAULT_STORE_TIMEOUT, TimeoutStore};
pub use types::{Collection, MAX_KEY_LEN, REDACTED_KEY, validate_key};
