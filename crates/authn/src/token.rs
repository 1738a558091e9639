//! Session token record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bearer credential bound to one phone until `expires`.
///
/// `expires` is persisted as milliseconds since the Unix epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Random id, also the storage key.
    pub id: String,
    /// Phone of the user the token acts for.
    pub phone: String,
    /// Instant after which the token no longer authorizes anything.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires: DateTime<Utc>,
}

impl Token {
    /// Whether the token is still usable at `now` (`now < expires`).
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires
    }

    /// Whether the token authorizes `phone` at `now`.
    #[must_use]
    pub fn authorizes(&self, phone: &str, now: DateTime<Utc>) -> bool {
        self.phone == phone && self.is_valid_at(now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn token(expires: DateTime<Utc>) -> Token {
        Token { id: "abcdefghij0123456789".into(), phone: "5551234567".into(), expires }
    }

    #[test]
    fn test_validity_is_strict_at_expiry() {
        let expires = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let t = token(expires);
        assert!(t.is_valid_at(expires - TimeDelta::milliseconds(1)));
        assert!(!t.is_valid_at(expires));
        assert!(!t.is_valid_at(expires + TimeDelta::milliseconds(1)));
    }

    #[test]
    fn test_authorizes_checks_phone() {
        let expires = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let t = token(expires);
        let before = expires - TimeDelta::seconds(1);
        assert!(t.authorizes("5551234567", before));
        assert!(!t.authorizes("5550000000", before));
    }

    #[test]
    fn test_expires_serializes_as_epoch_millis() {
        let expires = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let json = serde_json::to_value(token(expires)).unwrap();
        assert_eq!(json["expires"], 1_700_000_000_123_i64);
        assert_eq!(json["phone"], "5551234567");

        let back: Token = serde_json::from_value(json).unwrap();
        assert_eq!(back.expires, expires);
    }
}
