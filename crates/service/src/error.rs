//! Service and configuration error types.
//!
//! [`ServiceError`] is what every orchestrator operation returns. Its
//! [`status`](ServiceError::status) and
//! [`public_message`](ServiceError::public_message) drive the response; the
//! `Display` output carries detail for logs only.

use thiserror::Error;
use uptime_authn::AuthError;
use uptime_storage::StorageError;

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Outcome kinds of a failed request.
///
/// # Non-exhaustive
///
/// New variants may be added without a semver-breaking change. Downstream
/// match expressions must include a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// A required field is missing or a supplied field is malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The key being created already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The addressed resource does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// Kind of resource: `user`, `token`, or `check`.
        resource: &'static str,
    },

    /// The token is missing, invalid, expired, or bound to someone else.
    #[error("Forbidden")]
    Forbidden,

    /// The owner already holds the configured maximum number of checks.
    #[error("Check quota of {max} exceeded")]
    QuotaExceeded {
        /// Configured per-user maximum.
        max: usize,
    },

    /// Unknown phone or wrong password on token issue.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Extension of a token that has already expired.
    #[error("Token expired")]
    TokenExpired,

    /// The route exists but does not handle the method.
    #[error("Method not allowed: {method}")]
    MethodNotAllowed {
        /// The method as received.
        method: String,
    },

    /// A cross-entity link was found broken.
    #[error("Internal consistency violation: {0}")]
    InternalConsistency(String),

    /// A check was stored but could not be linked to its owner.
    #[error("Check {check_id} was created but not linked to its owner")]
    OrphanedCheck {
        /// Id of the unlinked check.
        check_id: String,
    },

    /// A user was deleted but some of their checks were not.
    #[error("User {phone} deleted, but {} check(s) remain: {failed:?}", .failed.len())]
    CascadeIncomplete {
        /// Phone of the deleted user.
        phone: String,
        /// Ids of the checks whose deletion failed.
        failed: Vec<String>,
    },

    /// Unexpected failure outside the store, such as hashing.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Store failure, including timeouts. Never retried.
    #[error("Storage error: {0}")]
    Storage(
        /// The underlying storage error.
        #[source]
        StorageError,
    ),
}

impl ServiceError {
    /// HTTP-style status code for this outcome.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::Conflict(_)
            | Self::QuotaExceeded { .. }
            | Self::InvalidCredentials
            | Self::TokenExpired => 400,
            Self::Forbidden => 403,
            Self::NotFound { .. } => 404,
            Self::MethodNotAllowed { .. } => 405,
            Self::InternalConsistency(_)
            | Self::OrphanedCheck { .. }
            | Self::CascadeIncomplete { .. }
            | Self::Internal(_)
            | Self::Storage(_) => 500,
        }
    }

    /// Short description safe to return to the caller.
    ///
    /// Never includes store paths or source errors.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Conflict(message) => message.clone(),
            Self::NotFound { resource } => format!("The specified {resource} does not exist"),
            Self::Forbidden => "Missing required token in header, or token is invalid".to_owned(),
            Self::QuotaExceeded { max } => {
                format!("The user already has the maximum number of checks ({max})")
            },
            Self::InvalidCredentials => {
                "Could not find the specified user, or the password did not match".to_owned()
            },
            Self::TokenExpired => {
                "The token has already expired, and cannot be extended".to_owned()
            },
            Self::MethodNotAllowed { .. } => "Method not allowed".to_owned(),
            Self::InternalConsistency(_) => "Stored records are inconsistent".to_owned(),
            Self::OrphanedCheck { .. } => {
                "Could not update the user with the new check".to_owned()
            },
            Self::CascadeIncomplete { failed, .. } => format!(
                "The user was deleted, but {} of their checks could not be deleted",
                failed.len()
            ),
            Self::Internal(_) => "Internal error".to_owned(),
            Self::Storage(StorageError::Timeout { .. }) => "The store timed out".to_owned(),
            Self::Storage(_) => "Could not access the store".to_owned(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Storage(err)
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ServiceError::InvalidCredentials,
            AuthError::TokenNotFound { .. } => ServiceError::NotFound { resource: "token" },
            AuthError::TokenExpired { .. } => ServiceError::TokenExpired,
            AuthError::Storage(e) => ServiceError::Storage(e),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required text field is empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the field.
        field: &'static str,
    },

    /// A numeric or duration field is below its minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the field.
        field: &'static str,
        /// Smallest accepted value.
        min: String,
        /// Rejected value.
        value: String,
    },

    /// The configuration document could not be parsed.
    #[error("Invalid configuration document: {0}")]
    Parse(
        /// The underlying parse error.
        #[source]
        serde_json::Error,
    ),
}
