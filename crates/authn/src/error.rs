//! Authentication error types.
//!
//! This module defines errors that can occur while issuing, extending,
//! revoking, or sweeping session tokens.

use thiserror::Error;
use uptime_storage::StorageError;

/// Token lifecycle errors.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases without a
/// semver-breaking change. Downstream match expressions must include a
/// wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Phone is unknown or the password does not match its digest.
    ///
    /// The two cases are deliberately indistinguishable to callers.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No token is stored under the id.
    ///
    /// Token ids are bearer credentials, so they stay out of `Display`.
    #[error("Token not found")]
    TokenNotFound {
        /// The id that was looked up.
        id: String,
    },

    /// The token exists but `now >= expires`.
    #[error("Token expired")]
    TokenExpired {
        /// Id of the expired token.
        id: String,
    },

    /// The password hasher could not produce a digest.
    #[error("Hashing failed: {0}")]
    Hashing(String),

    /// No unused token id was found within the retry budget.
    #[error("Token id space exhausted after {attempts} attempts")]
    IdExhausted {
        /// Number of ids tried.
        attempts: usize,
    },

    /// Storage backend error.
    ///
    /// Wraps the original [`StorageError`] to preserve the full error source
    /// chain for structured logging.
    #[error("Token storage error: {0}")]
    Storage(
        /// The underlying storage error.
        #[source]
        StorageError,
    ),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::Storage(err)
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
