//! Payment plan handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use core_kernel::{ClientProjectId, PaymentPlanId};
use domain_payments::call::retry_transient;
use domain_payments::{PaymentPlan, PlanQuery, PlanView};

use crate::dto::plans::{CreatePlanRequest, UpdateNotesRequest};
use crate::error::ApiError;
use crate::handlers::edit_draft;
use crate::AppState;

/// Creates an empty draft plan for a client project
pub async fn create_plan(
    State(state): State<AppState>,
    Json(request): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<PaymentPlan>), ApiError> {
    request.validate()?;

    let project = ClientProjectId::from_uuid(request.client_project_id);
    let (plan_type, currency) = (request.plan_type, request.currency);
    let service = &state.plan_service;
    let notes = &request.notes;
    let plan = retry_transient(&state.policy(), "create_plan", || async move {
        service.create_plan(project, plan_type, currency, notes.clone()).await
    })
    .await?;

    Ok((StatusCode::CREATED, Json(plan)))
}

/// Lists plans, optionally filtered by project, type and the current flag
pub async fn list_plans(
    State(state): State<AppState>,
    Query(query): Query<PlanQuery>,
) -> Result<Json<Vec<PaymentPlan>>, ApiError> {
    let service = &state.plan_service;
    let query = &query;
    let plans = retry_transient(&state.policy(), "list_plans", || async move {
        service.list_plans(query.clone()).await
    })
    .await?;
    Ok(Json(plans))
}

/// Plan with reconciled installments, proofs and totals
pub async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<PaymentPlanId>,
) -> Result<Json<PlanView>, ApiError> {
    let service = &state.plan_service;
    let view = retry_transient(&state.policy(), "view_plan", || async move {
        service.view_plan(plan_id).await
    })
    .await?;
    Ok(Json(view))
}

pub async fn update_notes(
    State(state): State<AppState>,
    Path(plan_id): Path<PaymentPlanId>,
    Json(request): Json<UpdateNotesRequest>,
) -> Result<Json<PlanView>, ApiError> {
    request.validate()?;

    let view = edit_draft(&state, plan_id, "update_notes", |draft| {
        draft.set_notes(request.notes.clone());
        Ok(())
    })
    .await?;
    Ok(Json(view))
}

/// Moves a draft plan to active
pub async fn activate_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<PaymentPlanId>,
) -> Result<Json<PlanView>, ApiError> {
    let service = &state.plan_service;
    let view = retry_transient(&state.policy(), "activate_plan", || async move {
        service.activate(plan_id).await
    })
    .await?;
    Ok(Json(view))
}

/// Archives the plan and returns its empty replacement draft
pub async fn supersede_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<PaymentPlanId>,
) -> Result<(StatusCode, Json<PaymentPlan>), ApiError> {
    let service = &state.plan_service;
    let replacement = retry_transient(&state.policy(), "supersede_plan", || async move {
        service.supersede(plan_id).await
    })
    .await?;
    Ok((StatusCode::CREATED, Json(replacement)))
}
