//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_payments::PaymentError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request that never reached the domain
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// The operation is not allowed in the resource's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A retryable fault persisted after the retry
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ApiError::InvalidState(_) => (StatusCode::CONFLICT, "invalid_state"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let (message, field) = match self {
            ApiError::Validation { field, message } => (message, field),
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::InvalidState(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unavailable(msg)
            | ApiError::Internal(msg) => (msg, None),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            field,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        let message = err.to_string();
        match err {
            PaymentError::Validation { field, .. } => ApiError::Validation {
                field: Some(field),
                message,
            },
            PaymentError::NotFound { .. } => ApiError::NotFound(message),
            PaymentError::InvalidState(_) => ApiError::InvalidState(message),
            PaymentError::Conflict(_) => ApiError::Conflict(message),
            PaymentError::Transient { .. } => ApiError::Unavailable(message),
            PaymentError::Internal(_) => ApiError::Internal(message),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors.field_errors();
        let mut names: Vec<&str> = fields.keys().map(|k| k.as_ref()).collect();
        names.sort_unstable();

        let message = names
            .iter()
            .filter_map(|name| {
                let first = fields.get(*name)?.first()?;
                let text = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                Some(format!("{}: {}", name, text))
            })
            .collect::<Vec<_>>()
            .join("; ");

        ApiError::Validation {
            field: names.first().map(|n| n.to_string()),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: PaymentError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_each_domain_error_gets_its_own_status() {
        assert_eq!(
            status_of(PaymentError::validation("months", "must be at least 1")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(PaymentError::not_found("PaymentPlan", "PLN-1")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(PaymentError::invalid_state("already paid")),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(PaymentError::conflict("stale version")), StatusCode::CONFLICT);
        assert_eq!(
            status_of(PaymentError::Transient {
                operation: "get_plan".to_string(),
                message: "timeout".to_string(),
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(PaymentError::Internal("bad row".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_keeps_field() {
        let api = ApiError::from(PaymentError::validation("advance_percent", "must be between 0 and 100"));
        match api {
            ApiError::Validation { field, message } => {
                assert_eq!(field.as_deref(), Some("advance_percent"));
                assert!(message.contains("between 0 and 100"));
            }
            other => panic!("Expected Validation, got {:?}", other),
        }
    }
}
