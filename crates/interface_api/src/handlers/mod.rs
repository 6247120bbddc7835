//! Request handlers

pub mod events;
pub mod health;
pub mod installments;
pub mod plans;
pub mod proofs;
pub mod schedule;

use domain_payments::{PaymentError, PlanDraft, PlanView};
use domain_payments::call::retry_transient;
use core_kernel::PaymentPlanId;

use crate::AppState;

/// Opens a plan draft, applies `edit` and saves it
///
/// The whole load-edit-save cycle is retried once on a transient failure.
pub(crate) async fn edit_draft<F>(
    state: &AppState,
    plan_id: PaymentPlanId,
    operation: &str,
    edit: F,
) -> Result<PlanView, PaymentError>
where
    F: Fn(&mut PlanDraft) -> Result<(), PaymentError> + Send + Sync,
{
    let service = &state.plan_service;
    let edit = &edit;
    retry_transient(&state.policy(), operation, || async move {
        let mut draft = service.open_draft(plan_id).await?;
        edit(&mut draft)?;
        service.save_draft(draft).await
    })
    .await
}
