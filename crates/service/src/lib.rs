//! # Uptime Monitor Service
//!
//! Request orchestration for the uptime monitor: users sign up, obtain
//! session tokens, and register health checks against URLs.
//!
//! ```text
//! Request ──► Router ──► Orchestrator ──► TokenManager ──┐
//!                            │                           ▼
//!                            └────────────────────► RecordStore
//! ```
//!
//! The [`Router`] maps a decoded [`Request`] to one [`Orchestrator`]
//! operation and the outcome to a [`Response`]. The orchestrator validates
//! input, authorizes through the token manager, enforces the per-user check
//! quota, and keeps each user's `checks` list in step with the check records.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use uptime_service::{App, Request, ServiceConfig};
//! use uptime_storage::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = App::start(&ServiceConfig::default(), Arc::new(MemoryStore::new()));
//!
//!     let signup = Request::builder()
//!         .path("users")
//!         .method("post")
//!         .payload(
//!             json!({
//!                 "firstName": "Ada",
//!                 "lastName": "Lovelace",
//!                 "phone": "5551234567",
//!                 "password": "hunter2",
//!                 "tosAgreement": true,
//!             })
//!             .into(),
//!         )
//!         .build();
//!     assert_eq!(app.handle(&signup).await.status, 200);
//!     app.shutdown().await;
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Wired service with optional token reaper.
pub mod app;
/// Check operations.
pub mod checks;
/// Service configuration.
pub mod config;
/// Error types.
pub mod error;
/// Typed request field access.
pub mod fields;
/// Persisted entities.
pub mod model;
/// Orchestrator wiring and shared helpers.
pub mod orchestrator;
/// Request and response types.
pub mod request;
/// Request dispatch.
pub mod router;
/// Token operations.
pub mod tokens;
/// User operations.
pub mod users;

// Re-export key types for convenience
pub use app::App;
pub use config::{ENV_VAR, Environment, ServiceConfig};
pub use error::{ConfigError, Result, ServiceError};
pub use fields::{Field, Fields};
pub use model::{Check, HttpMethod, Protocol, User, UserView, normalize_phone};
pub use orchestrator::Orchestrator;
pub use request::{Request, Response};
pub use router::Router;
