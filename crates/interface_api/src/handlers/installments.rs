//! Installment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use core_kernel::{InstallmentId, Money, PaymentPlanId};
use domain_payments::call::retry_transient;
use domain_payments::{PaymentInstallment, PlanView};

use crate::dto::plans::{AddInstallmentRequest, EditInstallmentRequest, MarkPaidRequest};
use crate::error::ApiError;
use crate::handlers::edit_draft;
use crate::AppState;

/// Appends an installment to a plan
pub async fn add_installment(
    State(state): State<AppState>,
    Path(plan_id): Path<PaymentPlanId>,
    Json(request): Json<AddInstallmentRequest>,
) -> Result<(StatusCode, Json<PlanView>), ApiError> {
    request.validate()?;

    let view = edit_draft(&state, plan_id, "add_installment", |draft| {
        let amount = Money::new(request.amount, draft.plan().currency);
        draft
            .add_installment(amount, request.due_date, request.description.clone())
            .map(|_| ())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Changes amount, due date or description of an unpaid installment
pub async fn edit_installment(
    State(state): State<AppState>,
    Path((plan_id, number)): Path<(PaymentPlanId, u32)>,
    Json(request): Json<EditInstallmentRequest>,
) -> Result<Json<PlanView>, ApiError> {
    request.validate()?;

    let view = edit_draft(&state, plan_id, "edit_installment", |draft| {
        let edit = EditInstallmentRequest {
            amount: request.amount,
            due_date: request.due_date,
            description: request.description.clone(),
        }
        .into_edit(draft.plan().currency);
        draft.update_installment(number, edit)
    })
    .await?;
    Ok(Json(view))
}

/// Removes an installment from a draft plan and renumbers the rest
pub async fn remove_installment(
    State(state): State<AppState>,
    Path((plan_id, number)): Path<(PaymentPlanId, u32)>,
) -> Result<Json<PlanView>, ApiError> {
    let view = edit_draft(&state, plan_id, "remove_installment", |draft| {
        draft.remove_installment(number).map(|_| ())
    })
    .await?;
    Ok(Json(view))
}

/// Staff settlement without a proof of payment
pub async fn mark_paid(
    State(state): State<AppState>,
    Path(installment_id): Path<InstallmentId>,
    request: Option<Json<MarkPaidRequest>>,
) -> Result<Json<PaymentInstallment>, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;

    let service = &state.plan_service;
    let paid_date = request.paid_date;
    let reference = &request.payment_reference;
    let settled = retry_transient(&state.policy(), "mark_paid", || async move {
        service.mark_paid(installment_id, paid_date, reference.clone()).await
    })
    .await?;
    Ok(Json(settled))
}
