//! Proof of payment handlers

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use validator::Validate;

use core_kernel::{InstallmentId, PaymentProofId, UserId};
use domain_payments::call::retry_transient;
use domain_payments::{PaymentProof, ProofUpload};

use crate::dto::proofs::{ReviewProofRequest, UploadProofParams};
use crate::error::ApiError;
use crate::AppState;

/// Uploads a receipt for an installment; the request body is the file
pub async fn upload_proof(
    State(state): State<AppState>,
    Path(installment_id): Path<InstallmentId>,
    Query(params): Query<UploadProofParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<PaymentProof>), ApiError> {
    params.validate()?;
    if body.len() > state.max_upload_bytes {
        return Err(ApiError::Validation {
            field: Some("file".to_string()),
            message: format!("file exceeds the {} byte upload limit", state.max_upload_bytes),
        });
    }

    let linker = &state.proof_linker;
    let params = &params;
    let body = &body;
    let proof = retry_transient(&state.policy(), "submit_proof", || async move {
        linker
            .submit(
                installment_id,
                ProofUpload {
                    file_name: params.file_name.clone(),
                    content: body.to_vec(),
                    uploaded_by_role: params.uploaded_by_role,
                },
            )
            .await
    })
    .await?;

    Ok((StatusCode::CREATED, Json(proof)))
}

/// Lists an installment's proofs, newest first
pub async fn list_proofs(
    State(state): State<AppState>,
    Path(installment_id): Path<InstallmentId>,
) -> Result<Json<Vec<PaymentProof>>, ApiError> {
    let linker = &state.proof_linker;
    let proofs = retry_transient(&state.policy(), "list_proofs", || async move {
        linker.proofs_for(installment_id).await
    })
    .await?;
    Ok(Json(proofs))
}

/// Approves or rejects a pending proof
pub async fn review_proof(
    State(state): State<AppState>,
    Path(proof_id): Path<PaymentProofId>,
    Json(request): Json<ReviewProofRequest>,
) -> Result<Json<PaymentProof>, ApiError> {
    request.validate()?;

    let linker = &state.proof_linker;
    let decision = request.decision;
    let reviewer = UserId::from_uuid(request.reviewer_id);
    let notes = &request.notes;
    let proof = retry_transient(&state.policy(), "review_proof", || async move {
        linker.review(proof_id, decision, notes.clone(), reviewer).await
    })
    .await?;
    Ok(Json(proof))
}

/// Streams back the stored receipt file
pub async fn download_proof(
    State(state): State<AppState>,
    Path(proof_id): Path<PaymentProofId>,
) -> Result<Response, ApiError> {
    let linker = &state.proof_linker;
    let (proof, bytes) = retry_transient(&state.policy(), "download_proof", || async move {
        linker.download(proof_id).await
    })
    .await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        proof.file_name.replace(['"', '\\'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&proof.file_name).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type_for("transferencia.PDF"), "application/pdf");
        assert_eq!(content_type_for("recibo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("captura.png"), "image/png");
        assert_eq!(content_type_for("sin_extension"), "application/octet-stream");
    }
}
