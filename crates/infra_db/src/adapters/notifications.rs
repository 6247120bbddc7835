//! Notification sinks
//!
//! `PostgresNotificationSink` keeps messages in the `notifications` table
//! for the UI to poll; `TracingNotificationSink` only logs them.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{error, info, instrument, warn};

use core_kernel::{DomainPort, NotificationId, PortError};
use domain_payments::{NotificationSink, Severity};

use crate::error::DatabaseError;

/// Writes notifications to the `notifications` table
#[derive(Debug, Clone)]
pub struct PostgresNotificationSink {
    pool: PgPool,
}

impl PostgresNotificationSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresNotificationSink {}

#[async_trait]
impl NotificationSink for PostgresNotificationSink {
    #[instrument(skip(self, message), fields(severity = %severity))]
    async fn notify(&self, message: &str, severity: Severity) -> Result<(), PortError> {
        let id: uuid::Uuid = NotificationId::new().into();
        sqlx::query(
            r#"
            INSERT INTO notifications (notification_id, message, severity, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(message)
        .bind(severity.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }
}

/// Logs notifications at a level matching their severity
#[derive(Debug, Clone, Default)]
pub struct TracingNotificationSink;

impl DomainPort for TracingNotificationSink {}

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify(&self, message: &str, severity: Severity) -> Result<(), PortError> {
        match severity {
            Severity::Info | Severity::Success => info!(severity = %severity, "{}", message),
            Severity::Warning => warn!(severity = %severity, "{}", message),
            Severity::Error => error!(severity = %severity, "{}", message),
        }
        Ok(())
    }
}
