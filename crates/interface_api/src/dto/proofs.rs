//! Proof of payment DTOs

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use domain_payments::{ReviewDecision, UploaderRole};

fn default_role() -> UploaderRole {
    UploaderRole::Client
}

/// Query string of a proof upload; the file itself is the request body
#[derive(Debug, Deserialize, Validate)]
pub struct UploadProofParams {
    #[validate(length(min = 1, max = 255, message = "File name must be 1-255 characters"))]
    pub file_name: String,
    #[serde(default = "default_role")]
    pub uploaded_by_role: UploaderRole,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewProofRequest {
    pub decision: ReviewDecision,
    #[validate(length(max = 2000, message = "Notes are limited to 2000 characters"))]
    pub notes: Option<String>,
    pub reviewer_id: Uuid,
}
