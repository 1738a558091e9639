//! Check operations.
//!
//! A check and its owner's `checks` list are two records with no
//! transaction between them. Creation and deletion write both inside the
//! owner's critical section, and any failure between the two writes is
//! reported and logged rather than absorbed.

use uptime_authn::MAX_ID_ATTEMPTS;
use uptime_storage::{Collection, RecordStoreExt, StorageError};

use crate::{
    error::{Result, ServiceError},
    fields::Fields,
    model::{Check, User},
    orchestrator::Orchestrator,
    tokens::parse_id,
};

const INVALID_INPUTS: &str = "Missing required inputs, or inputs are invalid";
const MISSING_ID: &str = "Missing required field, or field is invalid";
const NOTHING_TO_UPDATE: &str = "Missing fields to update";

impl Orchestrator {
    /// Creates a check owned by the token's user.
    ///
    /// The owner comes from the token, never from the payload.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if any check field is missing or malformed
    /// - [`ServiceError::Forbidden`] if the token is missing or invalid, or its
    ///   user no longer exists
    /// - [`ServiceError::QuotaExceeded`] if the owner already has
    ///   `max_checks` checks
    /// - [`ServiceError::OrphanedCheck`] if the check was stored but the owner
    ///   could not be updated
    #[tracing::instrument(skip_all)]
    pub async fn create_check(&self, fields: &Fields, token: Option<&str>) -> Result<Check> {
        let protocol = fields.protocol("protocol").required(INVALID_INPUTS)?;
        let url = fields.text("url").required(INVALID_INPUTS)?;
        let method = fields.method("method").required(INVALID_INPUTS)?;
        let success_codes = fields.status_codes("successCodes").required(INVALID_INPUTS)?;
        let timeout_seconds = fields.timeout_seconds("timeoutSeconds").required(INVALID_INPUTS)?;

        let phone = self.authenticate(token).await?.phone;

        let _user_guard = self.locks.lock(Collection::Users, &phone).await;
        let mut owner = match self.read_user(&phone).await {
            Ok(owner) => owner,
            Err(ServiceError::NotFound { .. }) => {
                tracing::debug!("token outlived its user");
                return Err(ServiceError::Forbidden);
            },
            Err(e) => return Err(e),
        };
        if owner.checks.len() >= self.max_checks {
            return Err(ServiceError::QuotaExceeded { max: self.max_checks });
        }

        let check = self
            .insert_check(Check {
                id: String::new(),
                user_phone: phone.clone(),
                protocol,
                url,
                method,
                success_codes,
                timeout_seconds,
            })
            .await?;

        owner.checks.push(check.id.clone());
        if let Err(e) = self.store.update_json(Collection::Users, &phone, &owner).await {
            tracing::error!(
                check_id = %check.id,
                %phone,
                error = %e,
                "check created but owner could not be updated"
            );
            return Err(ServiceError::OrphanedCheck { check_id: check.id });
        }
        Ok(check)
    }

    /// Returns the check `id` if `token` authorizes its owner.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if `id` is malformed
    /// - [`ServiceError::NotFound`] if no such check exists
    /// - [`ServiceError::Forbidden`] unless `token` authorizes the owner
    #[tracing::instrument(skip(self, token))]
    pub async fn get_check(&self, id: &str, token: Option<&str>) -> Result<Check> {
        let id = parse_id(id)?;
        let check = self.read_check(&id).await?;
        self.authorize(token, &check.user_phone).await?;
        Ok(check)
    }

    /// Updates any of `protocol`, `url`, `method`, `successCodes`,
    /// `timeoutSeconds` on check `id`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if `id` is malformed, no optional field
    ///   is supplied, or a supplied field is malformed
    /// - [`ServiceError::NotFound`] if no such check exists
    /// - [`ServiceError::Forbidden`] unless `token` authorizes the owner
    #[tracing::instrument(skip_all)]
    pub async fn update_check(&self, fields: &Fields, token: Option<&str>) -> Result<Check> {
        let id = fields.id("id").required(MISSING_ID)?;
        let protocol = fields.protocol("protocol").optional("protocol")?;
        let url = fields.text("url").optional("url")?;
        let method = fields.method("method").optional("method")?;
        let success_codes = fields.status_codes("successCodes").optional("successCodes")?;
        let timeout_seconds = fields.timeout_seconds("timeoutSeconds").optional("timeoutSeconds")?;
        if protocol.is_none()
            && url.is_none()
            && method.is_none()
            && success_codes.is_none()
            && timeout_seconds.is_none()
        {
            return Err(ServiceError::validation(NOTHING_TO_UPDATE));
        }

        let owner = self.read_check(&id).await?.user_phone;
        self.authorize(token, &owner).await?;

        let _check_guard = self.locks.lock(Collection::Checks, &id).await;
        let mut check = self.read_check(&id).await?;
        if let Some(protocol) = protocol {
            check.protocol = protocol;
        }
        if let Some(url) = url {
            check.url = url;
        }
        if let Some(method) = method {
            check.method = method;
        }
        if let Some(success_codes) = success_codes {
            check.success_codes = success_codes;
        }
        if let Some(timeout_seconds) = timeout_seconds {
            check.timeout_seconds = timeout_seconds;
        }
        self.store.update_json(Collection::Checks, &id, &check).await.map_err(|e| {
            if e.is_not_found() { ServiceError::NotFound { resource: "check" } } else { e.into() }
        })?;
        Ok(check)
    }

    /// Deletes check `id` and removes it from its owner's `checks`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if `id` is malformed
    /// - [`ServiceError::NotFound`] if no such check exists
    /// - [`ServiceError::Forbidden`] unless `token` authorizes the owner
    /// - [`ServiceError::InternalConsistency`] if the check was deleted but
    ///   its owner is missing or does not list it
    #[tracing::instrument(skip(self, token))]
    pub async fn delete_check(&self, id: &str, token: Option<&str>) -> Result<()> {
        let id = parse_id(id)?;
        let phone = self.read_check(&id).await?.user_phone;
        self.authorize(token, &phone).await?;

        let _user_guard = self.locks.lock(Collection::Users, &phone).await;
        let _check_guard = self.locks.lock(Collection::Checks, &id).await;

        // Re-read under the locks: a concurrent delete may have won.
        self.read_check(&id).await?;
        self.store.delete(Collection::Checks, &id).await.map_err(|e| {
            if e.is_not_found() { ServiceError::NotFound { resource: "check" } } else { e.into() }
        })?;

        let mut owner: User = match self.store.read_json(Collection::Users, &phone).await {
            Ok(owner) => owner,
            Err(e) if e.is_not_found() => {
                tracing::error!(check_id = %id, %phone, "deleted check has no owner");
                return Err(ServiceError::InternalConsistency(format!(
                    "check {id} belonged to missing user {phone}"
                )));
            },
            Err(e) => {
                tracing::error!(check_id = %id, %phone, error = %e, "deleted check's owner unreadable");
                return Err(e.into());
            },
        };

        let Some(position) = owner.checks.iter().position(|c| *c == id) else {
            tracing::error!(check_id = %id, %phone, "deleted check missing from owner's checks");
            return Err(ServiceError::InternalConsistency(format!(
                "user {phone} does not list check {id}"
            )));
        };
        owner.checks.remove(position);

        if let Err(e) = self.store.update_json(Collection::Users, &phone, &owner).await {
            tracing::error!(
                check_id = %id,
                %phone,
                error = %e,
                "check deleted but owner could not be updated"
            );
            return Err(e.into());
        }
        Ok(())
    }

    async fn read_check(&self, id: &str) -> Result<Check> {
        self.store.read_json(Collection::Checks, id).await.map_err(|e| {
            if e.is_not_found() { ServiceError::NotFound { resource: "check" } } else { e.into() }
        })
    }

    /// Stores `check` under a fresh id, retrying id collisions.
    async fn insert_check(&self, mut check: Check) -> Result<Check> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            check.id = self.ids.generate();
            match self.store.create_json(Collection::Checks, &check.id, &check).await {
                Ok(()) => return Ok(check),
                Err(e) if e.is_conflict() => {
                    tracing::debug!(attempt, id = %check.id, "check id collision, retrying");
                },
                Err(e @ StorageError::Timeout { .. }) => {
                    tracing::error!(
                        check_id = %check.id,
                        phone = %check.user_phone,
                        "check creation timed out; the check may still have been stored"
                    );
                    return Err(e.into());
                },
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Internal(format!("no unused check id after {MAX_ID_ATTEMPTS} attempts")))
    }
}
