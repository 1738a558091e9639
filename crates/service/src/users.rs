//! User operations.

use tokio::task::JoinSet;
use uptime_storage::{Collection, RecordStoreExt, StorageError};

use crate::{
    error::{Result, ServiceError},
    fields::Fields,
    model::{User, UserView, normalize_phone},
    orchestrator::Orchestrator,
};

const MISSING_REQUIRED: &str = "Missing required fields";
const MISSING_PHONE: &str = "Missing required field";
const NOTHING_TO_UPDATE: &str = "Missing fields to update";
const PHONE_TAKEN: &str = "A user with that phone number already exists";

impl Orchestrator {
    /// Registers a new user.
    ///
    /// Requires non-blank `firstName`, `lastName` and `password`, a
    /// 10-digit `phone`, and `tosAgreement: true`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if a required field is missing or malformed
    /// - [`ServiceError::Conflict`] if the phone is already registered
    #[tracing::instrument(skip_all)]
    pub async fn create_user(&self, fields: &Fields) -> Result<()> {
        let first_name = fields.text("firstName").required(MISSING_REQUIRED)?;
        let last_name = fields.text("lastName").required(MISSING_REQUIRED)?;
        let phone = fields.phone("phone").required(MISSING_REQUIRED)?;
        let password = fields.text("password").required(MISSING_REQUIRED)?;
        if !fields.boolean("tosAgreement").required(MISSING_REQUIRED)? {
            return Err(ServiceError::validation(MISSING_REQUIRED));
        }

        let user = User {
            first_name,
            last_name,
            hashed_password: self.hasher.hash(&password)?,
            phone,
            tos_agreement: true,
            checks: Vec::new(),
        };
        match self.store.create_json(Collection::Users, &user.phone, &user).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_conflict() => Err(ServiceError::Conflict(PHONE_TAKEN.to_owned())),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns a user without the password digest.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if `phone` is malformed
    /// - [`ServiceError::Forbidden`] unless `token` authorizes `phone`
    /// - [`ServiceError::NotFound`] if no such user exists
    #[tracing::instrument(skip(self, token))]
    pub async fn get_user(&self, phone: &str, token: Option<&str>) -> Result<UserView> {
        let phone = normalize_phone(phone).ok_or_else(|| ServiceError::validation(MISSING_PHONE))?;
        self.authorize(token, &phone).await?;
        Ok(self.read_user(&phone).await?.into())
    }

    /// Updates any of `firstName`, `lastName`, `password` for the user at
    /// `phone`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if `phone` is malformed, no optional
    ///   field is supplied, or a supplied field is malformed
    /// - [`ServiceError::Forbidden`] unless `token` authorizes `phone`
    /// - [`ServiceError::NotFound`] if no such user exists
    #[tracing::instrument(skip_all)]
    pub async fn update_user(&self, fields: &Fields, token: Option<&str>) -> Result<UserView> {
        let phone = fields.phone("phone").required(MISSING_PHONE)?;
        let first_name = fields.text("firstName").optional("firstName")?;
        let last_name = fields.text("lastName").optional("lastName")?;
        let password = fields.text("password").optional("password")?;
        if first_name.is_none() && last_name.is_none() && password.is_none() {
            return Err(ServiceError::validation(NOTHING_TO_UPDATE));
        }
        self.authorize(token, &phone).await?;

        let _user_guard = self.locks.lock(Collection::Users, &phone).await;
        let mut user = self.read_user(&phone).await?;
        if let Some(first_name) = first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            user.last_name = last_name;
        }
        if let Some(password) = password {
            user.hashed_password = self.hasher.hash(&password)?;
        }
        self.store.update_json(Collection::Users, &phone, &user).await.map_err(|e| {
            if e.is_not_found() { ServiceError::NotFound { resource: "user" } } else { e.into() }
        })?;
        Ok(user.into())
    }

    /// Deletes the user at `phone`, revokes their tokens, and then deletes
    /// every check they own.
    ///
    /// Check deletions run concurrently and are all attempted even when some
    /// fail. Token revocation keeps old sessions from acting for a later
    /// account with the same phone.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if `phone` is malformed
    /// - [`ServiceError::Forbidden`] unless `token` authorizes `phone`
    /// - [`ServiceError::NotFound`] if no such user exists
    /// - [`ServiceError::CascadeIncomplete`] if the user was deleted but at
    ///   least one check was not
    /// - [`ServiceError::Storage`] if the user and checks were deleted but
    ///   the user's tokens could not be revoked
    #[tracing::instrument(skip(self, token))]
    pub async fn delete_user(&self, phone: &str, token: Option<&str>) -> Result<()> {
        let phone = normalize_phone(phone).ok_or_else(|| ServiceError::validation(MISSING_PHONE))?;
        self.authorize(token, &phone).await?;

        let _user_guard = self.locks.lock(Collection::Users, &phone).await;
        let user = self.read_user(&phone).await?;
        self.store.delete(Collection::Users, &phone).await.map_err(|e| {
            if e.is_not_found() { ServiceError::NotFound { resource: "user" } } else { e.into() }
        })?;

        let revoked = self.tokens.revoke_all(&phone).await;
        let failed = self.delete_checks(&user.checks).await;

        if !failed.is_empty() {
            tracing::error!(
                %phone,
                failed = ?failed,
                attempted = user.checks.len(),
                "user deleted but some owned checks were not"
            );
            return Err(ServiceError::CascadeIncomplete { phone, failed });
        }
        match revoked {
            Ok(count) => {
                tracing::debug!(count, "revoked deleted user's tokens");
                Ok(())
            },
            Err(e) => {
                tracing::error!(
                    %phone,
                    error = %e,
                    "user deleted but their tokens were not revoked"
                );
                Err(e.into())
            },
        }
    }

    /// Deletes `ids` concurrently and returns those whose deletion failed.
    ///
    /// Each deletion writes only its own slot; a task that panics leaves its
    /// slot empty and counts as failed.
    async fn delete_checks(&self, ids: &[String]) -> Vec<String> {
        let mut set = JoinSet::new();
        for (index, id) in ids.iter().enumerate() {
            let store = std::sync::Arc::clone(&self.store);
            let locks = self.locks.clone();
            let id = id.clone();
            set.spawn(async move {
                let _check_guard = locks.lock(Collection::Checks, &id).await;
                (index, store.delete(Collection::Checks, &id).await)
            });
        }

        let mut outcomes: Vec<Option<std::result::Result<(), StorageError>>> =
            std::iter::repeat_with(|| None).take(ids.len()).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if let Some(slot) = outcomes.get_mut(index) {
                        *slot = Some(outcome);
                    }
                },
                Err(e) => tracing::error!(error = %e, "check deletion task failed"),
            }
        }

        ids.iter()
            .zip(outcomes)
            .filter_map(|(id, outcome)| match outcome {
                Some(Ok(())) => None,
                Some(Err(e)) => {
                    tracing::warn!(check_id = %id, error = %e, "could not delete owned check");
                    Some(id.clone())
                },
                None => Some(id.clone()),
            })
            .collect()
    }
}
