//! Error types for the portal service
//!
//! Every failure is reported inside the uniform response envelope,
//! `{"success": false, "error": ..., "message": ...}`, with status 200 so
//! that JSONP callers can still read it.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use common::{StoreError, mail::MailError};
use serde_json::{Value, json};
use thiserror::Error;

/// Custom error type for the portal service
#[derive(Error, Debug)]
pub enum PortalError {
    /// Missing or malformed input, reported verbatim
    #[error("{0}")]
    Validation(String),

    /// A looked-up record does not exist
    #[error("{0}")]
    NotFound(String),

    /// The `action` parameter names no handler
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The JSONP callback name is not a plain identifier
    #[error("Invalid callback name")]
    InvalidCallback,

    /// Workbook storage failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Mail delivery failure
    #[error(transparent)]
    Mail(#[from] MailError),

    /// Anything else
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        PortalError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        PortalError::NotFound(message.into())
    }

    /// The failure envelope for this error
    pub fn to_body(&self) -> Value {
        let message = self.to_string();
        json!({
            "success": false,
            "error": message,
            "message": message,
        })
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        Json(self.to_body()).into_response()
    }
}

/// Type alias for portal results
pub type PortalResult<T> = Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_message() {
        let err: PortalError = StoreError::SheetNotFound("FaultLog".into()).into();
        let body = err.to_body();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "FaultLog sheet not found");
        assert_eq!(body["message"], body["error"]);
    }

    #[test]
    fn unknown_action_names_the_action() {
        let err = PortalError::UnknownAction("frobnicate".into());
        assert_eq!(err.to_string(), "Unknown action: frobnicate");
    }
}
