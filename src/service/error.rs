//! Errors reported by the records service

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Shown when a failure carries nothing better
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Failure of a records service call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// The backend answered with an error body
    #[error("request rejected: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        status: Option<u16>,
        message: Option<String>,
        field_errors: BTreeMap<String, String>,
    },

    #[error("session is missing or expired")]
    Unauthorized,

    #[error("record not found")]
    NotFound,

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ServiceError {
    /// Build a rejection from an error response body of the form
    /// `{"message": "...", "errors": {"field": "msg" | ["msg", ...]}}`
    pub fn from_response_body(status: Option<u16>, body: &Value) -> Self {
        let message = body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        let field_errors = body
            .get("errors")
            .and_then(Value::as_object)
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|(field, msg)| first_message(msg).map(|m| (field.clone(), m)))
                    .collect()
            })
            .unwrap_or_default();

        ServiceError::Rejected {
            status,
            message,
            field_errors,
        }
    }

    /// Human-readable message, preferring the server's own
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            ServiceError::Unauthorized => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ServiceError::NotFound => "The requested record was not found.".to_string(),
            ServiceError::Timeout => "The request timed out. Please try again.".to_string(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    /// Server-reported per-field errors, if any
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ServiceError::Rejected { field_errors, .. } if !field_errors.is_empty() => {
                Some(field_errors)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout
        } else if err.is_decode() {
            ServiceError::UnexpectedResponse(err.to_string())
        } else {
            ServiceError::Network(err.to_string())
        }
    }
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_message),
        _ => None,
    }
}
