//! Storage error types and result alias.
//!
//! Every [`RecordStore`](crate::RecordStore) implementation maps its internal
//! failures onto [`StorageError`].
//!
//! # Error Types
//!
//! - [`StorageError::NotFound`] - Key does not exist in the collection
//! - [`StorageError::Conflict`] - Create on a key that already exists
//! - [`StorageError::InvalidKey`] - Key contains characters a backend cannot address
//! - [`StorageError::Serialization`] - Record encoding/decoding failures
//! - [`StorageError::Io`] - The durable medium rejected the operation
//! - [`StorageError::Internal`] - Backend-specific internal errors
//! - [`StorageError::Timeout`] - Operation exceeded its time limit
//!
//! # Example
//!
//! ```
//! use uptime_storage::{Collection, StorageError, StorageResult};
//!
//! fn lookup(key: &str) -> StorageResult<Vec<u8>> {
//!     Err(StorageError::not_found(Collection::Users, key))
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::types::Collection;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// Errors preserve their source chain via the `#[source]` attribute, so the
/// full context is available to logging while the `Display` output stays
/// short.
///
/// # Non-exhaustive
///
/// New variants may be added without a semver-breaking change. Downstream
/// match expressions must include a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The requested key was not found in the collection.
    #[error("Record not found: {collection}/{}", shown_key(.collection, .key))]
    NotFound {
        /// Collection that was searched.
        collection: Collection,
        /// The key that was not found.
        key: String,
    },

    /// A create targeted a key that already holds a record.
    #[error("Record already exists: {collection}/{}", shown_key(.collection, .key))]
    Conflict {
        /// Collection that was written.
        collection: Collection,
        /// The key that already exists.
        key: String,
    },

    /// The key cannot be used to address a record.
    #[error("Invalid key: {key:?}")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },

    /// Serialization or deserialization error.
    ///
    /// Stored bytes could not be decoded into the requested record type, or a
    /// record could not be encoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error that caused serialization to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// The durable medium failed (filesystem, device).
    #[error("I/O error: {message}")]
    Io {
        /// Description of the failed operation.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: Option<BoxError>,
    },

    /// Internal storage backend error.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error that caused this internal failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Operation timed out.
    ///
    /// The operation may or may not have been applied; callers must not assume
    /// either outcome.
    #[error("Operation timeout: {operation}")]
    Timeout {
        /// Name of the store operation that timed out.
        operation: &'static str,
    },
}

fn shown_key<'a>(collection: &Collection, key: &'a str) -> &'a str {
    collection.log_key(key)
}

impl StorageError {
    /// Creates a new `NotFound` error for the given collection and key.
    #[must_use]
    pub fn not_found(collection: Collection, key: impl Into<String>) -> Self {
        Self::NotFound { collection, key: key.into() }
    }

    /// Creates a new `Conflict` error for the given collection and key.
    #[must_use]
    pub fn conflict(collection: Collection, key: impl Into<String>) -> Self {
        Self::Conflict { collection, key: key.into() }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Io` error with a message and source error.
    #[must_use]
    pub fn io_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Io { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Timeout` error for the named operation.
    #[must_use]
    pub fn timeout(operation: &'static str) -> Self {
        Self::Timeout { operation }
    }

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
