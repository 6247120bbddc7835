//! Proof-of-payment records
//!
//! A proof is an uploaded receipt attached to one installment. Staff review
//! it exactly once; approval settles the installment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{InstallmentId, PaymentProofId, UserId};
use crate::error::PaymentError;

/// Opaque handle to a stored artifact
///
/// Only the object storage adapter that issued it knows how to resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Review status of a proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProofStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofStatus::Pending => "pending",
            ProofStatus::Approved => "approved",
            ProofStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProofStatus::Pending),
            "approved" => Ok(ProofStatus::Approved),
            "rejected" => Ok(ProofStatus::Rejected),
            other => Err(PaymentError::validation(
                "status",
                format!("unknown proof status '{}'", other),
            )),
        }
    }
}

/// Staff decision on a pending proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for ProofStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => ProofStatus::Approved,
            ReviewDecision::Rejected => ProofStatus::Rejected,
        }
    }
}

/// Who uploaded a proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploaderRole {
    Client,
    Staff,
}

impl UploaderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploaderRole::Client => "client",
            UploaderRole::Staff => "staff",
        }
    }
}

impl FromStr for UploaderRole {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(UploaderRole::Client),
            "staff" => Ok(UploaderRole::Staff),
            other => Err(PaymentError::validation(
                "uploaded_by_role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}

/// An uploaded receipt for one installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub id: PaymentProofId,
    pub payment_installment_id: InstallmentId,
    pub file_path_ref: ArtifactRef,
    /// Original file name as uploaded
    pub file_name: String,
    pub upload_date: DateTime<Utc>,
    pub uploaded_by_role: UploaderRole,
    pub status: ProofStatus,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<UserId>,
}

impl PaymentProof {
    /// Creates a proof awaiting review
    pub fn new(
        id: PaymentProofId,
        payment_installment_id: InstallmentId,
        file_path_ref: ArtifactRef,
        file_name: impl Into<String>,
        uploaded_by_role: UploaderRole,
        upload_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            payment_installment_id,
            file_path_ref,
            file_name: file_name.into(),
            upload_date,
            uploaded_by_role,
            status: ProofStatus::Pending,
            review_notes: None,
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ProofStatus::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.status == ProofStatus::Approved
    }

    /// Records the review outcome
    ///
    /// Fails with `InvalidState` unless the proof is still pending.
    pub fn review(
        &mut self,
        decision: ReviewDecision,
        notes: Option<String>,
        reviewer: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        if !self.is_pending() {
            return Err(PaymentError::invalid_state(format!(
                "proof {} was already {}",
                self.id, self.status
            )));
        }
        self.status = decision.into();
        self.review_notes = notes;
        self.reviewed_at = Some(now);
        self.reviewed_by = Some(reviewer);
        Ok(())
    }
}
