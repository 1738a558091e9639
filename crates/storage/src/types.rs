//! Common types used across storage operations.
//!
//! Records are addressed by a [`Collection`] and a string key. Collections are
//! flat namespaces; keys never nest.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Maximum accepted key length in bytes.
pub const MAX_KEY_LEN: usize = 128;

/// Logical namespace of records of one entity type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// User accounts, keyed by phone number.
    Users,
    /// Session tokens, keyed by token id.
    Tokens,
    /// Health-check definitions, keyed by check id.
    Checks,
}

impl Collection {
    /// Every collection, in a stable order.
    pub const ALL: [Collection; 3] = [Collection::Users, Collection::Tokens, Collection::Checks];

    /// Returns the collection's namespace name.
    ///
    /// # Examples
    ///
    /// ```
    /// use uptime_storage::Collection;
    ///
    /// assert_eq!(Collection::Checks.as_str(), "checks");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Tokens => "tokens",
            Self::Checks => "checks",
        }
    }

    /// `key` as it may appear in spans, logs, and error messages.
    ///
    /// Token keys are bearer credentials and are replaced with
    /// [`REDACTED_KEY`].
    ///
    /// # Examples
    ///
    /// ```
    /// use uptime_storage::{Collection, REDACTED_KEY};
    ///
    /// assert_eq!(Collection::Users.log_key("5551234567"), "5551234567");
    /// assert_eq!(Collection::Tokens.log_key("abc"), REDACTED_KEY);
    /// ```
    #[must_use]
    pub fn log_key(self, key: &str) -> &str {
        match self {
            Self::Tokens => REDACTED_KEY,
            Self::Users | Self::Checks => key,
        }
    }
}

/// Placeholder logged in place of a token key.
pub const REDACTED_KEY: &str = "<redacted>";

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates that `key` can address a record in every backend.
///
/// Keys must be non-empty, at most [`MAX_KEY_LEN`] bytes, and consist only of
/// ASCII alphanumerics, `-` and `_`. The file backend uses keys as file names,
/// so separators and dots are rejected.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] if the key is rejected.
///
/// # Examples
///
/// ```
/// use uptime_storage::validate_key;
///
/// assert!(validate_key("5551234567").is_ok());
/// assert!(validate_key("../etc/passwd").is_err());
/// ```
pub fn validate_key(key: &str) -> StorageResult<()> {
    let well_formed = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if well_formed { Ok(()) } else { Err(StorageError::invalid_key(key)) }
}
