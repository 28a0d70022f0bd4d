//! Action handlers behind `/<endpoint>/exec`
//!
//! Each endpoint serves a fixed set of actions selected by the `action`
//! query parameter. Handlers return the payload fields that are merged
//! into the success envelope.

pub mod email;
pub mod explorer;
pub mod management;
pub mod portal;
pub mod submission;

use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;

use crate::envelope::ActionParams;
use crate::error::{PortalError, PortalResult};
use crate::state::AppState;

/// Deployments reachable under `/<endpoint>/exec`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Maintenance team portal
    Portal,
    /// Email templates and delivery
    Email,
    /// Read-only fault explorer
    Explorer,
    /// Resident directory and list management
    Management,
    /// Public fault submission form
    Submission,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Portal => "portal",
            Endpoint::Email => "email",
            Endpoint::Explorer => "explorer",
            Endpoint::Management => "management",
            Endpoint::Submission => "submission",
        }
    }
}

impl FromStr for Endpoint {
    type Err = PortalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "portal" => Ok(Endpoint::Portal),
            "email" => Ok(Endpoint::Email),
            "explorer" => Ok(Endpoint::Explorer),
            "management" => Ok(Endpoint::Management),
            "submission" => Ok(Endpoint::Submission),
            other => Err(PortalError::not_found(format!("Unknown endpoint: {}", other))),
        }
    }
}

/// Run one action of an endpoint
pub async fn dispatch(
    state: &AppState,
    endpoint: Endpoint,
    action: &str,
    params: &ActionParams,
) -> PortalResult<Value> {
    match endpoint {
        Endpoint::Portal => portal::dispatch(state, action, params).await,
        Endpoint::Email => email::dispatch(state, action, params).await,
        Endpoint::Explorer => explorer::dispatch(state, action, params).await,
        Endpoint::Management => management::dispatch(state, action, params).await,
        Endpoint::Submission => submission::dispatch(state, action, params).await,
    }
}

/// Serialize a report into payload fields
pub(crate) fn to_payload<T: Serialize>(value: &T) -> PortalResult<Value> {
    serde_json::to_value(value).map_err(|e| PortalError::Internal(e.into()))
}

/// Merge extra fields into an object payload
pub(crate) fn with_fields(payload: Value, extra: Value) -> Value {
    match (payload, extra) {
        (Value::Object(mut fields), Value::Object(more)) => {
            fields.extend(more);
            Value::Object(fields)
        }
        (payload, _) => payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoints_parse_from_path() {
        assert_eq!("email".parse::<Endpoint>().unwrap(), Endpoint::Email);
        assert_eq!(Endpoint::Management.as_str(), "management");
        let err = "billing".parse::<Endpoint>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown endpoint: billing");
    }

    #[test]
    fn extra_fields_are_merged() {
        let merged = with_fields(json!({"message": "ok"}), json!({"count": 1}));
        assert_eq!(merged, json!({"message": "ok", "count": 1}));
    }
}
