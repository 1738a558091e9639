//! The orchestrator: validation, authorization, quota, and owner ↔ checks
//! consistency on top of the record store and the token manager.
//!
//! Operations are split by resource across [`users`](crate::users),
//! [`tokens`](crate::tokens), and [`checks`](crate::checks).
//!
//! # Locking
//!
//! Every read-merge-write runs inside a per-key critical section from a
//! shared [`KeyLocks`] registry. When an operation needs both a user and a
//! check, it always locks the user first.

use std::sync::Arc;

use uptime_authn::{
    HmacSha256Hasher, IdGenerator, PasswordHasher, RandomIdGenerator, Token, TokenManager,
};
use uptime_storage::{Collection, KeyLocks, RecordStore, RecordStoreExt, TimeoutStore};

use crate::{
    config::{DEFAULT_MAX_CHECKS, ServiceConfig},
    error::{Result, ServiceError},
    model::User,
};

/// Coordinates every request-level operation.
///
/// Cloning is cheap; clones share the store, token manager, and locks.
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) tokens: Arc<TokenManager>,
    pub(crate) hasher: Arc<dyn PasswordHasher>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) locks: KeyLocks,
    pub(crate) max_checks: usize,
}

#[bon::bon]
impl Orchestrator {
    /// Creates an orchestrator from explicit collaborators.
    ///
    /// `tokens` must read users from the same `store`. `ids` defaults to
    /// [`RandomIdGenerator`]; `locks` defaults to a fresh registry.
    #[builder]
    pub fn new(
        store: Arc<dyn RecordStore>,
        tokens: Arc<TokenManager>,
        hasher: Arc<dyn PasswordHasher>,
        ids: Option<Arc<dyn IdGenerator>>,
        locks: Option<KeyLocks>,
        #[builder(default = DEFAULT_MAX_CHECKS)] max_checks: usize,
    ) -> Self {
        Self {
            store,
            tokens,
            hasher,
            ids: ids.unwrap_or_else(|| Arc::new(RandomIdGenerator)),
            locks: locks.unwrap_or_default(),
            max_checks,
        }
    }
}

impl Orchestrator {
    /// Wires an orchestrator from configuration.
    ///
    /// `store` is wrapped in a [`TimeoutStore`] bounded by
    /// [`ServiceConfig::store_timeout`]; the token manager and the
    /// orchestrator share it and one lock registry.
    #[must_use]
    pub fn from_config(config: &ServiceConfig, store: Arc<dyn RecordStore>) -> Self {
        let store: Arc<dyn RecordStore> = Arc::new(TimeoutStore::new(store, config.store_timeout()));
        let hasher: Arc<dyn PasswordHasher> =
            Arc::new(HmacSha256Hasher::new(config.hashing_secret()));
        let locks = KeyLocks::new();

        let tokens = TokenManager::builder()
            .store(Arc::clone(&store))
            .hasher(Arc::clone(&hasher))
            .ttl(config.token_ttl())
            .locks(locks.clone())
            .build();

        Self::builder()
            .store(store)
            .tokens(Arc::new(tokens))
            .hasher(hasher)
            .locks(locks)
            .max_checks(config.max_checks())
            .build()
    }

    /// The token manager used for authorization.
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Per-user check quota.
    #[must_use]
    pub fn max_checks(&self) -> usize {
        self.max_checks
    }

    /// Fails with [`ServiceError::Forbidden`] unless `token` authorizes `phone`.
    pub(crate) async fn authorize(&self, token: Option<&str>, phone: &str) -> Result<()> {
        let Some(token) = token else {
            tracing::debug!("request without token");
            return Err(ServiceError::Forbidden);
        };
        if self.tokens.verify(token, phone).await {
            Ok(())
        } else {
            tracing::debug!("token does not authorize phone");
            Err(ServiceError::Forbidden)
        }
    }

    /// The valid token behind `token`, or [`ServiceError::Forbidden`].
    pub(crate) async fn authenticate(&self, token: Option<&str>) -> Result<Token> {
        let Some(token) = token else {
            tracing::debug!("request without token");
            return Err(ServiceError::Forbidden);
        };
        self.tokens.authenticate(token).await.ok_or(ServiceError::Forbidden)
    }

    /// Loads a user, mapping a missing record to `NotFound`.
    pub(crate) async fn read_user(&self, phone: &str) -> Result<User> {
        self.store.read_json(Collection::Users, phone).await.map_err(|e| {
            if e.is_not_found() {
                ServiceError::NotFound { resource: "user" }
            } else {
                e.into()
            }
        })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tokens", &self.tokens)
            .field("max_checks", &self.max_checks)
            .finish_non_exhaustive()
    }
}
