//! Deadlines and retries around port calls

use std::future::Future;
use tracing::warn;

use core_kernel::{CallPolicy, PortError};
use crate::error::PaymentError;

/// Runs a port call under the policy's deadline
///
/// A call that outlives the deadline is dropped and reported as a transient
/// timeout; port errors are mapped into the domain taxonomy.
pub async fn with_deadline<T, F>(policy: &CallPolicy, operation: &str, call: F) -> Result<T, PaymentError>
where
    F: Future<Output = Result<T, PortError>>,
{
    match tokio::time::timeout(policy.timeout(), call).await {
        Ok(result) => result.map_err(PaymentError::from),
        Err(_) => Err(PortError::timeout(operation, policy.timeout()).into()),
    }
}

/// Runs `op`, retrying once after the policy's backoff if it fails transiently
pub async fn retry_transient<T, F, Fut>(policy: &CallPolicy, operation: &str, mut op: F) -> Result<T, PaymentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PaymentError>>,
{
    match op().await {
        Err(err) if err.is_transient() => {
            warn!(operation, error = %err, "Transient failure, retrying once");
            tokio::time::sleep(policy.retry_backoff()).await;
            op().await
        }
        other => other,
    }
}
