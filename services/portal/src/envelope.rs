//! Request parameters and the JSON/JSONP response envelope

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

use crate::error::{PortalError, PortalResult};
use crate::validation::validate_callback;

/// Query parameters of one action call
#[derive(Debug, Clone, Default)]
pub struct ActionParams {
    inner: HashMap<String, String>,
}

impl From<HashMap<String, String>> for ActionParams {
    fn from(inner: HashMap<String, String>) -> Self {
        Self { inner }
    }
}

impl ActionParams {
    /// Raw value, `None` when the parameter was not sent
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    /// Value or empty string
    pub fn str(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Trimmed value, treating blank values as absent
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// True when the parameter was sent, even if empty
    pub fn has(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Non-blank value or a validation error with `message`
    pub fn require(&self, key: &str, message: &str) -> PortalResult<&str> {
        self.non_empty(key)
            .ok_or_else(|| PortalError::validation(message))
    }

    /// Parse a JSON-encoded parameter
    pub fn json<T: DeserializeOwned>(&self, key: &str) -> PortalResult<Option<T>> {
        match self.non_empty(key) {
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| PortalError::validation(format!("Invalid {}: {}", key, e))),
            None => Ok(None),
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.non_empty(key).and_then(|v| v.parse().ok())
    }

    /// `true`/`false` in any case; anything else is `None`
    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.non_empty(key)?.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

/// Successful envelope: `{"success": true}` merged with the payload fields
pub fn success(payload: Value) -> Value {
    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    match payload {
        Value::Object(fields) => body.extend(fields),
        Value::Null => {}
        other => {
            body.insert("data".to_string(), other);
        }
    }
    Value::Object(body)
}

/// Render a body as JSON, or as a JSONP call when `callback` is given
pub fn render(body: Value, callback: Option<&str>) -> Response {
    match callback.filter(|c| !c.is_empty()) {
        Some(callback) => match validate_callback(callback) {
            Ok(()) => (
                [(
                    header::CONTENT_TYPE,
                    "application/javascript; charset=utf-8",
                )],
                format!("{}({})", callback, body),
            )
                .into_response(),
            Err(_) => PortalError::InvalidCallback.into_response(),
        },
        None => axum::Json(body).into_response(),
    }
}

/// Envelope for a handler result
pub fn into_body(result: PortalResult<Value>) -> Value {
    match result {
        Ok(payload) => success(payload),
        Err(err) => err.to_body(),
    }
}

/// Shorthand used by handlers for a bare message
pub fn message(text: impl Into<String>) -> Value {
    json!({ "message": text.into() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ActionParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>()
            .into()
    }

    #[test]
    fn presence_differs_from_blankness() {
        let p = params(&[("comments", "")]);
        assert!(p.has("comments"));
        assert!(p.non_empty("comments").is_none());
        assert!(!p.has("category"));
    }

    #[test]
    fn require_reports_given_message() {
        let p = params(&[("internalId", "  ")]);
        let err = p.require("internalId", "Internal ID required").unwrap_err();
        assert_eq!(err.to_string(), "Internal ID required");
    }

    #[test]
    fn json_parameter_is_decoded() {
        let p = params(&[("config", r#"{"logEmailDelivery":false}"#)]);
        let value: Value = p.json("config").unwrap().unwrap();
        assert_eq!(value["logEmailDelivery"], false);
    }

    #[test]
    fn success_merges_object_payload() {
        let body = success(json!({"count": 2}));
        assert_eq!(body, json!({"success": true, "count": 2}));
        assert_eq!(success(json!([1])), json!({"success": true, "data": [1]}));
    }

    #[test]
    fn bool_parameter_parsing() {
        let p = params(&[("currentStatus", "TRUE"), ("other", "maybe")]);
        assert_eq!(p.bool("currentStatus"), Some(true));
        assert_eq!(p.bool("other"), None);
    }
}
