//! # Uptime Monitor Authentication
//!
//! Session token lifecycle for the uptime monitor.
//!
//! This crate provides:
//! - **Token manager**: issue, fetch, extend, revoke, and verify bearer tokens
//! - **Password hashing**: HMAC-SHA256 digests keyed by a configured secret
//! - **Token reaper**: optional background sweep of expired tokens
//!
//! ## Expiry
//!
//! A token is valid while `now < expires`. It can be extended only while
//! valid; an expired token authorizes nothing and stays expired.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use uptime_authn::{HmacSha256Hasher, TokenManager};
//! use uptime_storage::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = TokenManager::builder()
//!     .store(Arc::new(MemoryStore::new()))
//!     .hasher(Arc::new(HmacSha256Hasher::new("thisIsASecret")))
//!     .build();
//!
//! let token = tokens.issue("5551234567", "hunter2").await?;
//! let extended = tokens.extend(&token.id).await?;
//! assert!(extended.expires >= token.expires);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **`testutil`**: Enables [`testutil`] (manual clock, deterministic ids,
//!   assertion macros).

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Time source.
pub mod clock;
mod credentials;
/// Token error types.
pub mod error;
/// Password digests.
pub mod hasher;
/// Record id generation.
pub mod id;
/// Token lifecycle operations.
pub mod manager;
/// Background sweep of expired tokens.
pub mod reaper;
/// Test helpers.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;
/// Session token record.
pub mod token;

// Re-export key types for convenience
pub use clock::{Clock, SystemClock};
pub use error::{AuthError, Result};
pub use hasher::{HmacSha256Hasher, PasswordHasher};
pub use id::{ID_LEN, IdGenerator, RandomIdGenerator, is_valid_id};
pub use manager::{DEFAULT_TOKEN_TTL, MAX_ID_ATTEMPTS, TokenManager};
pub use reaper::TokenReaper;
pub use token::Token;
