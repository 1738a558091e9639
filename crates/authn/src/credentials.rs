//! Read-only view of a stored user used for credential checks.

use serde::Deserialize;

/// The fields of a user record needed to verify a password.
///
/// Every other field of the record is ignored, so the user schema can grow
/// without touching this crate.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredCredentials {
    pub(crate) phone: String,
    pub(crate) hashed_password: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ignores_unrelated_user_fields() {
        let creds: StoredCredentials = serde_json::from_value(serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "phone": "5551234567",
            "hashedPassword": "00ff",
            "tosAgreement": true,
            "checks": []
        }))
        .unwrap();
        assert_eq!(creds.phone, "5551234567");
        assert_eq!(creds.hashed_password, "00ff");
    }
}
