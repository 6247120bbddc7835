//! Payment domain errors

use thiserror::Error;

use core_kernel::{CalendarError, MoneyError, PortError};

/// Errors that can occur in the payment plan domain
///
/// Every variant renders a message specific enough to show to the user; the
/// HTTP layer maps each variant to its own status code.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Bad input to the schedule generator or to a manual edit
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A referenced plan, installment or proof does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The requested transition is not allowed from the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An I/O failure or timeout that is safe to retry
    #[error("Temporary failure during {operation}: {message}")]
    Transient { operation: String, message: String },

    /// The write lost a race against a concurrent change
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A non-retryable infrastructure fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        PaymentError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        PaymentError::InvalidState(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PaymentError::Conflict(message.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, PaymentError::Transient { .. })
    }

    /// Name of the offending field, for validation failures
    pub fn field(&self) -> Option<&str> {
        match self {
            PaymentError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<PortError> for PaymentError {
    fn from(error: PortError) -> Self {
        if error.is_transient() {
            let operation = match &error {
                PortError::Timeout { operation, .. } => operation.clone(),
                _ => "storage call".to_string(),
            };
            return PaymentError::Transient {
                operation,
                message: error.to_string(),
            };
        }

        match error {
            PortError::NotFound { entity_type, id } => PaymentError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Validation { message, field } => PaymentError::Validation {
                field: field.unwrap_or_else(|| "record".to_string()),
                message,
            },
            PortError::Conflict { message } => PaymentError::Conflict(message),
            other => PaymentError::Internal(other.to_string()),
        }
    }
}

impl From<MoneyError> for PaymentError {
    fn from(error: MoneyError) -> Self {
        PaymentError::validation("amount", error.to_string())
    }
}

impl From<CalendarError> for PaymentError {
    fn from(error: CalendarError) -> Self {
        PaymentError::validation("due_date", error.to_string())
    }
}
