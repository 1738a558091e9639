//! Token lifecycle: issue, fetch, extend, revoke, verify, sweep.
//!
//! [`TokenManager`] owns expiry semantics. Expiry is lazy: a token past its
//! `expires` instant stays in the store until it is revoked or swept, but no
//! operation accepts it.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use uptime_storage::{Collection, KeyLocks, RecordStore, RecordStoreExt, StorageError};

use crate::{
    clock::{Clock, SystemClock},
    credentials::StoredCredentials,
    error::{AuthError, Result},
    hasher::PasswordHasher,
    id::{IdGenerator, RandomIdGenerator},
    token::Token,
};

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Attempts made to find an unused token id before giving up.
pub const MAX_ID_ATTEMPTS: usize = 3;

/// Issues and validates session tokens against a [`RecordStore`].
///
/// Cloning is cheap; clones share the store, the collaborators, and the
/// per-token lock registry.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use uptime_authn::{HmacSha256Hasher, TokenManager};
/// use uptime_storage::MemoryStore;
///
/// # async fn example() -> uptime_authn::Result<()> {
/// let tokens = TokenManager::builder()
///     .store(Arc::new(MemoryStore::new()))
///     .hasher(Arc::new(HmacSha256Hasher::new("thisIsASecret")))
///     .build();
///
/// let token = tokens.issue("5551234567", "hunter2").await?;
/// assert!(tokens.verify(&token.id, "5551234567").await);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TokenManager {
    store: Arc<dyn RecordStore>,
    hasher: Arc<dyn PasswordHasher>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    locks: KeyLocks,
}

#[bon::bon]
impl TokenManager {
    /// Creates a token manager.
    ///
    /// `ids` defaults to [`RandomIdGenerator`], `clock` to [`SystemClock`],
    /// and `ttl` to [`DEFAULT_TOKEN_TTL`].
    #[builder]
    pub fn new(
        store: Arc<dyn RecordStore>,
        hasher: Arc<dyn PasswordHasher>,
        ids: Option<Arc<dyn IdGenerator>>,
        clock: Option<Arc<dyn Clock>>,
        #[builder(default = DEFAULT_TOKEN_TTL)] ttl: Duration,
        locks: Option<KeyLocks>,
    ) -> Self {
        Self {
            store,
            hasher,
            ids: ids.unwrap_or_else(|| Arc::new(RandomIdGenerator)),
            clock: clock.unwrap_or_else(|| Arc::new(SystemClock)),
            ttl,
            locks: locks.unwrap_or_default(),
        }
    }
}

impl TokenManager {
    /// The configured token lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The clock used for every expiry decision.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Issues a token for `phone` if `password` matches the stored digest.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] if the user is unknown or the
    ///   password does not verify
    /// - [`AuthError::IdExhausted`] if every generated id was already taken
    /// - [`AuthError::Storage`] on any other store failure
    #[tracing::instrument(skip(self, password))]
    pub async fn issue(&self, phone: &str, password: &str) -> Result<Token> {
        let creds: StoredCredentials = match self.store.read_json(Collection::Users, phone).await {
            Ok(creds) => creds,
            Err(StorageError::NotFound { .. } | StorageError::InvalidKey { .. }) => {
                tracing::debug!("token requested for unknown user");
                return Err(AuthError::InvalidCredentials);
            },
            Err(e) => return Err(e.into()),
        };
        if creds.phone != phone || !self.hasher.verify(password, &creds.hashed_password) {
            tracing::debug!("token requested with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let token = Token {
                id: self.ids.generate(),
                phone: phone.to_owned(),
                expires: self.expiry_from(self.clock.now()),
            };
            match self.store.create_json(Collection::Tokens, &token.id, &token).await {
                Ok(()) => return Ok(token),
                Err(e) if e.is_conflict() => {
                    tracing::debug!(attempt, "token id collision, retrying");
                },
                Err(e) => return Err(e.into()),
            }
        }
        Err(AuthError::IdExhausted { attempts: MAX_ID_ATTEMPTS })
    }

    /// Loads a token by id, valid or not.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenNotFound`] if no such token is stored, or
    /// [`AuthError::Storage`] if the store fails.
    #[tracing::instrument(skip(self, id))]
    pub async fn fetch(&self, id: &str) -> Result<Token> {
        match self.store.read_json(Collection::Tokens, id).await {
            Ok(token) => Ok(token),
            Err(StorageError::NotFound { .. } | StorageError::InvalidKey { .. }) => {
                Err(AuthError::TokenNotFound { id: id.to_owned() })
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Resets a still-valid token's expiry to `now + ttl`.
    ///
    /// An expired token is left untouched.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenNotFound`] if no such token is stored
    /// - [`AuthError::TokenExpired`] if `now >= expires`
    /// - [`AuthError::Storage`] on store failure
    #[tracing::instrument(skip(self, id))]
    pub async fn extend(&self, id: &str) -> Result<Token> {
        let _guard = self.locks.lock(Collection::Tokens, id).await;

        let mut token = self.fetch(id).await?;
        let now = self.clock.now();
        if !token.is_valid_at(now) {
            return Err(AuthError::TokenExpired { id: id.to_owned() });
        }

        token.expires = self.expiry_from(now);
        self.store.update_json(Collection::Tokens, id, &token).await.map_err(|e| match e {
            StorageError::NotFound { .. } => AuthError::TokenNotFound { id: id.to_owned() },
            e => e.into(),
        })?;
        Ok(token)
    }

    /// Deletes a token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenNotFound`] if no such token is stored, or
    /// [`AuthError::Storage`] if the store fails.
    #[tracing::instrument(skip(self, id))]
    pub async fn revoke(&self, id: &str) -> Result<()> {
        let _guard = self.locks.lock(Collection::Tokens, id).await;

        match self.store.delete(Collection::Tokens, id).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound { .. } | StorageError::InvalidKey { .. }) => {
                Err(AuthError::TokenNotFound { id: id.to_owned() })
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Whether token `id` exists, is bound to `phone`, and has not expired.
    ///
    /// Never fails: store errors are logged and treated as `false`.
    #[tracing::instrument(skip(self, id))]
    pub async fn verify(&self, id: &str, phone: &str) -> bool {
        match self.authenticate(id).await {
            Some(token) if token.phone == phone => true,
            Some(_) => {
                tracing::debug!("token bound to a different phone");
                false
            },
            None => false,
        }
    }

    /// The token stored under `id` if it is valid now.
    ///
    /// Used where ownership is derived from the token rather than supplied
    /// by the caller. Store errors are logged and yield `None`.
    #[tracing::instrument(skip(self, id))]
    pub async fn authenticate(&self, id: &str) -> Option<Token> {
        let token = match self.fetch(id).await {
            Ok(token) => token,
            Err(AuthError::TokenNotFound { .. }) => {
                tracing::debug!("unknown token");
                return None;
            },
            Err(e) => {
                tracing::warn!(error = %e, "token lookup failed during verification");
                return None;
            },
        };

        if token.is_valid_at(self.clock.now()) {
            Some(token)
        } else {
            tracing::debug!(expires = %token.expires, "token expired");
            None
        }
    }

    /// Deletes every token with `now >= expires` and returns how many were
    /// removed.
    ///
    /// Tokens that disappear or fail to decode mid-sweep are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the token keys cannot be listed or an
    /// expired token cannot be deleted.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        self.remove_where(|token| !token.is_valid_at(now)).await
    }

    /// Deletes every token bound to `phone`, expired or not, and returns how
    /// many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the token keys cannot be listed or a
    /// matching token cannot be deleted.
    #[tracing::instrument(skip(self))]
    pub async fn revoke_all(&self, phone: &str) -> Result<usize> {
        self.remove_where(|token| token.phone == phone).await
    }

    /// Scans every stored token, deleting those `doomed` selects. Each token
    /// is re-read and deleted under its own lock.
    async fn remove_where(&self, doomed: impl Fn(&Token) -> bool + Send + Sync) -> Result<usize> {
        let mut removed = 0usize;

        for id in self.store.list_keys(Collection::Tokens).await? {
            let _guard = self.locks.lock(Collection::Tokens, &id).await;

            let token = match self.fetch(&id).await {
                Ok(token) => token,
                Err(AuthError::TokenNotFound { .. }) => continue,
                Err(AuthError::Storage(e @ StorageError::Serialization { .. })) => {
                    tracing::warn!(error = %e, "skipping undecodable token");
                    continue;
                },
                Err(e) => return Err(e),
            };
            if !doomed(&token) {
                continue;
            }

            match self.store.delete(Collection::Tokens, &id).await {
                Ok(()) => removed += 1,
                Err(e) if e.is_not_found() => {},
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    /// `now + ttl`, truncated to the millisecond precision tokens persist at.
    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .trunc_subsecs(3)
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use uptime_storage::MemoryStore;

    use super::*;
    use crate::{
        hasher::HmacSha256Hasher,
        testutil::{ManualClock, SequenceIdGenerator},
    };

    const PHONE: &str = "5551234567";

    async fn seeded_manager() -> (TokenManager, MemoryStore, ManualClock) {
        let store = MemoryStore::new();
        let hasher = HmacSha256Hasher::new("thisIsASecret");
        let user = serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "phone": PHONE,
            "hashedPassword": hasher.hash("hunter2").unwrap(),
            "tosAgreement": true,
            "checks": [],
        });
        store.create_json(Collection::Users, PHONE, &user).await.unwrap();

        let clock = ManualClock::default();
        let manager = TokenManager::builder()
            .store(Arc::new(store.clone()))
            .hasher(Arc::new(hasher))
            .clock(Arc::new(clock.clone()))
            .ids(Arc::new(SequenceIdGenerator::new("tok")))
            .build();
        (manager, store, clock)
    }

    #[tokio::test]
    async fn test_issue_binds_phone_and_ttl() {
        let (manager, _, clock) = seeded_manager().await;
        let token = manager.issue(PHONE, "hunter2").await.unwrap();

        assert_eq!(token.phone, PHONE);
        assert_eq!(token.expires, clock.now() + TimeDelta::hours(1));
        assert_eq!(manager.fetch(&token.id).await.unwrap(), token);
    }

    #[tokio::test]
    async fn test_issue_rejects_unknown_user_and_wrong_password() {
        let (manager, _, _) = seeded_manager().await;
        assert!(matches!(
            manager.issue("5550000000", "hunter2").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(manager.issue(PHONE, "wrong").await, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_issue_retries_id_collision() {
        let (manager, store, _) = seeded_manager().await;
        // The sequence generator's first id is already taken.
        store.create(Collection::Tokens, "tok00000000000000000", "{}".into()).await.unwrap();

        let token = manager.issue(PHONE, "hunter2").await.unwrap();
        assert_eq!(token.id, "tok00000000000000001");
    }

    #[tokio::test]
    async fn test_expiry_has_millisecond_precision() {
        let (manager, _, _) = seeded_manager().await;
        let now = DateTime::from_timestamp_nanos(1_700_000_000_123_456_789);
        let expires = manager.expiry_from(now);
        assert_eq!(expires.timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
