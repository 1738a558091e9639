//! Token operations, exposed directly from the token manager.

use uptime_authn::Token;

use crate::{
    error::{Result, ServiceError},
    fields::Fields,
    orchestrator::Orchestrator,
};

const MISSING_REQUIRED: &str = "Missing required fields";
const MISSING_ID: &str = "Missing required field, or field is invalid";
const MISSING_EXTEND: &str = "Missing required field(s), or field(s) are invalid";

impl Orchestrator {
    /// Issues a token for `phone` + `password`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if either field is missing or malformed
    /// - [`ServiceError::InvalidCredentials`] if the pair does not match a user
    #[tracing::instrument(skip_all)]
    pub async fn create_token(&self, fields: &Fields) -> Result<Token> {
        let phone = fields.phone("phone").required(MISSING_REQUIRED)?;
        let password = fields.text("password").required(MISSING_REQUIRED)?;
        Ok(self.tokens.issue(&phone, &password).await?)
    }

    /// Returns the token stored under `id`, expired or not.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if `id` is malformed
    /// - [`ServiceError::NotFound`] if no such token exists
    #[tracing::instrument(skip_all)]
    pub async fn get_token(&self, id: &str) -> Result<Token> {
        let id = parse_id(id)?;
        Ok(self.tokens.fetch(&id).await?)
    }

    /// Extends a still-valid token by one TTL. Requires `extend: true`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if `id` is malformed or `extend` is not `true`
    /// - [`ServiceError::NotFound`] if no such token exists
    /// - [`ServiceError::TokenExpired`] if the token has already expired
    #[tracing::instrument(skip_all)]
    pub async fn update_token(&self, fields: &Fields) -> Result<Token> {
        let id = fields.id("id").required(MISSING_EXTEND)?;
        if !fields.boolean("extend").required(MISSING_EXTEND)? {
            return Err(ServiceError::validation(MISSING_EXTEND));
        }
        Ok(self.tokens.extend(&id).await?)
    }

    /// Revokes the token stored under `id`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if `id` is malformed
    /// - [`ServiceError::NotFound`] if no such token exists
    #[tracing::instrument(skip_all)]
    pub async fn delete_token(&self, id: &str) -> Result<()> {
        let id = parse_id(id)?;
        Ok(self.tokens.revoke(&id).await?)
    }
}

/// Trims `raw` and checks it has the generated id shape.
pub(crate) fn parse_id(raw: &str) -> Result<String> {
    let id = raw.trim();
    if uptime_authn::is_valid_id(id) {
        Ok(id.to_owned())
    } else {
        Err(ServiceError::validation(MISSING_ID))
    }
}
