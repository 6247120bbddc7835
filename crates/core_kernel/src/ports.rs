//! Ports and Adapters Infrastructure
//!
//! Shared vocabulary for the hexagonal boundary between the payment domain
//! and its external collaborators (relational store, object storage,
//! notification sink).
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            │  Domain services (plans,     │
//!            │  reconciliation, proofs)     │
//!            └──────────────┬───────────────┘
//!                           │ port traits
//!          ┌────────────────┼────────────────┐
//!          ▼                ▼                ▼
//!   Postgres adapter   Object storage   In-memory mock
//! ```
//!
//! Each domain crate defines its own port traits on top of the marker traits
//! here; adapters report failures through `PortError` so the domain can tell
//! retryable faults from permanent ones.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for port operations
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// The store rejected the data as invalid
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// The write conflicts with the current stored state
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
    },

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation did not complete within its deadline
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    /// The backing service is throttling us
    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        retry_after_secs: u64,
    },

    /// The backing service is unavailable
    #[error("Service unavailable: {service}")]
    ServiceUnavailable {
        service: String,
    },

    /// A stored row could not be mapped into a domain value
    #[error("Transformation error: {message}")]
    Transformation {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn transformation(message: impl Into<String>) -> Self {
        PortError::Transformation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        PortError::Timeout {
            operation: operation.into(),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Connection { .. }
                | PortError::Timeout { .. }
                | PortError::RateLimited { .. }
                | PortError::ServiceUnavailable { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, PortError::Conflict { .. })
    }
}

/// Marker trait for all domain ports
///
/// Ports are shared across request tasks, so they must be thread-safe.
pub trait DomainPort: Send + Sync + 'static {}

/// Deadline and retry settings applied to every port call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallPolicy {
    /// Deadline for a single port call in milliseconds
    pub timeout_ms: u64,
    /// Delay before the single retry of a transient failure, in milliseconds
    pub retry_backoff_ms: u64,
}

impl CallPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            retry_backoff_ms: 250,
        }
    }
}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthCheckResult {
    pub fn healthy(adapter_id: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: chrono::Utc::now(),
        }
    }

    pub fn unhealthy(adapter_id: impl Into<String>, latency_ms: u64, message: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Unhealthy,
            latency_ms,
            message: Some(message.into()),
            checked_at: chrono::Utc::now(),
        }
    }
}

/// Trait for adapters that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

/// Metadata about a port operation for auditing and tracing
#[derive(Debug, Clone, Default)]
pub struct OperationMetadata {
    /// Correlation ID for tracing across systems
    pub correlation_id: Option<String>,
    /// User or system that initiated the operation
    pub initiated_by: Option<String>,
    pub context: std::collections::HashMap<String, String>,
}

impl OperationMetadata {
    pub fn with_correlation_id(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            ..Default::default()
        }
    }

    pub fn initiated_by(mut self, actor: impl Into<String>) -> Self {
        self.initiated_by = Some(actor.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_error_not_found() {
        let error = PortError::not_found("PaymentPlan", "PLN-123");
        assert!(error.is_not_found());
        assert!(!error.is_transient());
        assert!(error.to_string().contains("PaymentPlan"));
    }

    #[test]
    fn test_port_error_transient() {
        assert!(PortError::timeout("get_plan", Duration::from_secs(5)).is_transient());
        assert!(PortError::RateLimited { retry_after_secs: 60 }.is_transient());
        assert!(!PortError::conflict("version mismatch").is_transient());
        assert!(!PortError::validation("bad amount").is_transient());
    }

    #[test]
    fn test_call_policy_durations() {
        let policy = CallPolicy {
            timeout_ms: 1500,
            retry_backoff_ms: 100,
        };
        assert_eq!(policy.timeout(), Duration::from_millis(1500));
        assert_eq!(policy.retry_backoff(), Duration::from_millis(100));
    }

    #[test]
    fn test_operation_metadata() {
        let metadata = OperationMetadata::with_correlation_id("req-123")
            .initiated_by("staff-7")
            .with_context("plan_id", "PLN-1");

        assert_eq!(metadata.correlation_id.as_deref(), Some("req-123"));
        assert_eq!(metadata.initiated_by.as_deref(), Some("staff-7"));
        assert_eq!(metadata.context.get("plan_id").map(String::as_str), Some("PLN-1"));
    }
}
