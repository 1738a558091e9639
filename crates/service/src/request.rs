//! Decoded requests and their responses.

use serde_json::{Value, json};

use crate::{error::ServiceError, fields::Fields};

/// A request as handed over by the transport layer.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use uptime_service::Request;
///
/// let request = Request::builder()
///     .path("/users/")
///     .method("GET")
///     .query(json!({"phone": "5551234567"}).into())
///     .token("abcdefghij0123456789")
///     .build();
/// assert_eq!(request.route(), "users");
/// ```
#[derive(Clone, Debug, bon::Builder)]
pub struct Request {
    /// Path as received; surrounding slashes are ignored.
    #[builder(into)]
    pub path: String,
    /// Method name, matched case-insensitively.
    #[builder(into)]
    pub method: String,
    /// Query-string fields.
    #[builder(default)]
    pub query: Fields,
    /// Decoded body fields.
    #[builder(default)]
    pub payload: Fields,
    /// Value of the `token` header, if any.
    #[builder(into)]
    pub token: Option<String>,
}

impl Request {
    /// The path without leading or trailing slashes.
    #[must_use]
    pub fn route(&self) -> &str {
        self.path.trim_matches('/')
    }
}

/// Status code and JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,
    /// Resource, `{}`, or `{"Error": "..."}`.
    pub body: Value,
}

impl Response {
    /// 200 with `body`.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// 200 with `{}`.
    #[must_use]
    pub fn empty() -> Self {
        Self::ok(json!({}))
    }

    /// 404 with `{}`, for unknown routes.
    #[must_use]
    pub fn not_found() -> Self {
        Self { status: 404, body: json!({}) }
    }

    /// The error description, if this is a failure response.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("Error").and_then(Value::as_str)
    }
}

impl From<&ServiceError> for Response {
    fn from(err: &ServiceError) -> Self {
        Self { status: err.status(), body: json!({ "Error": err.public_message() }) }
    }
}
