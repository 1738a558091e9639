//! Password digests.
//!
//! The default [`HmacSha256Hasher`] keys an HMAC-SHA256 with the configured
//! hashing secret and hex encodes the tag. Verification recomputes the MAC and
//! compares it in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{AuthError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Turns passwords into opaque digests and checks them.
pub trait PasswordHasher: Send + Sync + std::fmt::Debug {
    /// Digest of `password`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if no digest can be produced.
    fn hash(&self, password: &str) -> Result<String>;

    /// Whether `password` produces `digest`. Malformed digests never verify.
    fn verify(&self, password: &str, digest: &str) -> bool;
}

/// HMAC-SHA256 [`PasswordHasher`] keyed by a secret.
///
/// The secret is zeroed on drop and never printed by `Debug`.
pub struct HmacSha256Hasher {
    secret: Zeroizing<Vec<u8>>,
}

impl HmacSha256Hasher {
    /// Creates a hasher keyed by `secret`.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self { secret: Zeroizing::new(secret.as_ref().to_vec()) }
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| AuthError::Hashing(e.to_string()))
    }
}

impl std::fmt::Debug for HmacSha256Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSha256Hasher").finish_non_exhaustive()
    }
}

impl PasswordHasher for HmacSha256Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(password.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn verify(&self, password: &str, digest: &str) -> bool {
        let Ok(expected) = hex::decode(digest) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(password.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}
