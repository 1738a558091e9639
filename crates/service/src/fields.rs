//! Typed access to loosely-typed request fields.
//!
//! Every accessor distinguishes a missing field from a present but malformed
//! one, so optional fields can reject bad input instead of ignoring it.

use serde_json::{Map, Value};

use crate::{
    error::{Result, ServiceError},
    model::{HttpMethod, MAX_TIMEOUT_SECONDS, MIN_TIMEOUT_SECONDS, Protocol, normalize_phone},
};

/// Result of looking up one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Field<T> {
    /// Not supplied (absent or JSON `null`).
    Missing,
    /// Supplied but not acceptable.
    Invalid,
    /// Supplied and acceptable.
    Valid(T),
}

impl<T> Field<T> {
    /// The value, or a validation error carrying `message`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] unless the field is valid.
    pub fn required(self, message: &str) -> Result<T> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Missing | Self::Invalid => Err(ServiceError::validation(message)),
        }
    }

    /// `None` if missing, the value if valid.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] naming `name` if the field is
    /// present but malformed.
    pub fn optional(self, name: &str) -> Result<Option<T>> {
        match self {
            Self::Valid(value) => Ok(Some(value)),
            Self::Missing => Ok(None),
            Self::Invalid => Err(ServiceError::validation(format!("Invalid field: {name}"))),
        }
    }

    fn and_then<U>(self, f: impl FnOnce(T) -> Option<U>) -> Field<U> {
        match self {
            Self::Valid(value) => f(value).map_or(Field::Invalid, Field::Valid),
            Self::Missing => Field::Missing,
            Self::Invalid => Field::Invalid,
        }
    }
}

/// A bag of named JSON values from a query string or payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fields(Map<String, Value>);

impl Fields {
    /// An empty set of fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one field.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    fn get(&self, name: &str) -> Field<&Value> {
        match self.0.get(name) {
            None | Some(Value::Null) => Field::Missing,
            Some(value) => Field::Valid(value),
        }
    }

    /// A string, trimmed, that must be non-empty.
    #[must_use]
    pub fn text(&self, name: &str) -> Field<String> {
        self.get(name).and_then(|value| {
            let text = value.as_str()?.trim();
            (!text.is_empty()).then(|| text.to_owned())
        })
    }

    /// A phone number in canonical form.
    #[must_use]
    pub fn phone(&self, name: &str) -> Field<String> {
        self.get(name).and_then(|value| normalize_phone(value.as_str()?))
    }

    /// A JSON boolean.
    #[must_use]
    pub fn boolean(&self, name: &str) -> Field<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// A record id in the generated format, surrounding whitespace trimmed.
    #[must_use]
    pub fn id(&self, name: &str) -> Field<String> {
        self.text(name).and_then(|id| uptime_authn::is_valid_id(&id).then_some(id))
    }

    /// The field as an unvalidated string, if it is one.
    #[must_use]
    pub fn raw_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// One of the supported check protocols.
    #[must_use]
    pub fn protocol(&self, name: &str) -> Field<Protocol> {
        self.get(name).and_then(|value| Protocol::parse(value.as_str()?))
    }

    /// One of the supported check methods.
    #[must_use]
    pub fn method(&self, name: &str) -> Field<HttpMethod> {
        self.get(name).and_then(|value| HttpMethod::parse(value.as_str()?))
    }

    /// A non-empty list of HTTP status codes in `100..=599`.
    #[must_use]
    pub fn status_codes(&self, name: &str) -> Field<Vec<u16>> {
        self.get(name).and_then(|value| {
            let codes = value
                .as_array()?
                .iter()
                .map(|code| code.as_u64().filter(|c| (100..=599).contains(c)).map(|c| c as u16))
                .collect::<Option<Vec<_>>>()?;
            (!codes.is_empty()).then_some(codes)
        })
    }

    /// A whole number of seconds in the accepted check timeout range.
    #[must_use]
    pub fn timeout_seconds(&self, name: &str) -> Field<u64> {
        self.get(name).and_then(|value| {
            value.as_u64().filter(|s| (MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(s))
        })
    }
}

impl From<Map<String, Value>> for Fields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Value> for Fields {
    /// Non-object values yield no fields.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Fields {
        Fields::from(value)
    }

    #[test]
    fn test_text_trims_and_rejects_blank() {
        let f = fields(json!({"a": "  Ada ", "b": "   ", "c": 7, "d": null}));
        assert_eq!(f.text("a"), Field::Valid("Ada".to_owned()));
        assert_eq!(f.text("b"), Field::Invalid);
        assert_eq!(f.text("c"), Field::Invalid);
        assert_eq!(f.text("d"), Field::Missing);
        assert_eq!(f.text("zzz"), Field::Missing);
    }

    #[test]
    fn test_required_and_optional() {
        let f = fields(json!({"ok": "x", "bad": ""}));
        assert_eq!(f.text("ok").required("Missing required fields").unwrap(), "x");
        assert!(matches!(f.text("bad").required("m"), Err(ServiceError::Validation(m)) if m == "m"));
        assert_eq!(f.text("none").optional("none").unwrap(), None);
        assert!(matches!(f.text("bad").optional("bad"), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_boolean_requires_json_bool() {
        let f = fields(json!({"yes": true, "text": "true"}));
        assert_eq!(f.boolean("yes"), Field::Valid(true));
        assert_eq!(f.boolean("text"), Field::Invalid);
    }

    #[test]
    fn test_status_codes() {
        let f = fields(json!({
            "ok": [200, 301],
            "empty": [],
            "range": [200, 600],
            "float": [200.5],
            "scalar": 200,
        }));
        assert_eq!(f.status_codes("ok"), Field::Valid(vec![200, 301]));
        assert_eq!(f.status_codes("empty"), Field::Invalid);
        assert_eq!(f.status_codes("range"), Field::Invalid);
        assert_eq!(f.status_codes("float"), Field::Invalid);
        assert_eq!(f.status_codes("scalar"), Field::Invalid);
    }

    #[test]
    fn test_timeout_bounds() {
        let f = fields(json!({"zero": 0, "one": 1, "five": 5, "six": 6, "neg": -1, "frac": 2.5}));
        assert_eq!(f.timeout_seconds("zero"), Field::Invalid);
        assert_eq!(f.timeout_seconds("one"), Field::Valid(1));
        assert_eq!(f.timeout_seconds("five"), Field::Valid(5));
        assert_eq!(f.timeout_seconds("six"), Field::Invalid);
        assert_eq!(f.timeout_seconds("neg"), Field::Invalid);
        assert_eq!(f.timeout_seconds("frac"), Field::Invalid);
    }

    #[test]
    fn test_id_shape() {
        let f = fields(json!({"ok": " abcdefghij0123456789 ", "short": "abc", "path": "../../etc"}));
        assert_eq!(f.id("ok"), Field::Valid("abcdefghij0123456789".to_owned()));
        assert_eq!(f.id("short"), Field::Invalid);
        assert_eq!(f.id("path"), Field::Invalid);
    }

    #[test]
    fn test_non_object_payload_is_empty() {
        let f = Fields::from(json!(["not", "an", "object"]));
        assert_eq!(f, Fields::new());
    }
}
