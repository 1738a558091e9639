//! Persisted entities and their wire views.
//!
//! Records are stored as camelCase JSON, one document per key:
//!
//! | Collection | Key | Record |
//! |---|---|---|
//! | `users` | phone | [`User`] |
//! | `tokens` | token id | [`uptime_authn::Token`] |
//! | `checks` | check id | [`Check`] |

use serde::{Deserialize, Serialize};

/// Number of digits in a canonical phone number.
pub const PHONE_LEN: usize = 10;

/// Canonical form of a phone number: surrounding whitespace trimmed, exactly
/// [`PHONE_LEN`] ASCII digits. Anything else is `None`.
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    let phone = raw.trim();
    (phone.len() == PHONE_LEN && phone.bytes().all(|b| b.is_ascii_digit()))
        .then(|| phone.to_owned())
}

/// A registered account, keyed by phone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Canonical phone, also the storage key.
    pub phone: String,
    /// Digest from the configured password hasher.
    pub hashed_password: String,
    /// Always `true` for stored users.
    pub tos_agreement: bool,
    /// Ids of the checks this user owns, in creation order.
    #[serde(default)]
    pub checks: Vec<String>,
}

/// A [`User`] without its password digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Canonical phone.
    pub phone: String,
    /// Terms-of-service acceptance.
    pub tos_agreement: bool,
    /// Owned check ids.
    pub checks: Vec<String>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            tos_agreement: user.tos_agreement,
            checks: user.checks,
        }
    }
}

/// Scheme used to reach a monitored URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Protocol {
    /// Parses the lowercase wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }
}

/// Request method a check issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Parses the lowercase wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Smallest accepted check timeout, in seconds.
pub const MIN_TIMEOUT_SECONDS: u64 = 1;
/// Largest accepted check timeout, in seconds.
pub const MAX_TIMEOUT_SECONDS: u64 = 5;

/// A monitored endpoint owned by one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    /// Random id, also the storage key.
    pub id: String,
    /// Phone of the owning user.
    pub user_phone: String,
    /// Scheme.
    pub protocol: Protocol,
    /// Host and path, without scheme.
    pub url: String,
    /// Method to issue.
    pub method: HttpMethod,
    /// Status codes that count as "up".
    pub success_codes: Vec<u16>,
    /// Seconds to wait for a response.
    pub timeout_seconds: u64,
}
