//! Schedule generation handlers

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use core_kernel::{Money, PaymentPlanId};
use domain_payments::{schedule, PlanView};

use crate::dto::plans::{GenerateScheduleRequest, PreviewScheduleRequest, SchedulePreviewResponse};
use crate::error::ApiError;
use crate::handlers::edit_draft;
use crate::AppState;

/// Computes a schedule without saving anything
pub async fn preview_schedule(
    Json(request): Json<PreviewScheduleRequest>,
) -> Result<Json<SchedulePreviewResponse>, ApiError> {
    request.validate()?;

    let params = &request.schedule;
    let drafts = schedule::generate(
        Money::new(params.total_amount, request.currency),
        params.months,
        params.advance_percent,
        params.start_date,
    )?;

    Ok(Json(SchedulePreviewResponse {
        currency: request.currency,
        total_amount: params.total_amount,
        installments: drafts.iter().map(Into::into).collect(),
    }))
}

/// Replaces a draft plan's installments with a generated schedule
pub async fn generate_schedule(
    State(state): State<AppState>,
    Path(plan_id): Path<PaymentPlanId>,
    Json(request): Json<GenerateScheduleRequest>,
) -> Result<Json<PlanView>, ApiError> {
    request.validate()?;

    let view = edit_draft(&state, plan_id, "generate_schedule", |draft| {
        let drafts = schedule::generate(
            Money::new(request.total_amount, draft.plan().currency),
            request.months,
            request.advance_percent,
            request.start_date,
        )?;
        draft.replace_with_schedule(drafts)
    })
    .await?;
    Ok(Json(view))
}
