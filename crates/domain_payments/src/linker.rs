//! Proof-of-payment submission and review
//!
//! Clients (or staff on their behalf) upload a receipt against an open
//! installment; staff approve or reject it. Approval settles the installment
//! in the same store write as the review.

use tracing::{info, instrument, warn};

use core_kernel::{InstallmentId, PaymentProofId, UserId};

use crate::call::with_deadline;
use crate::error::PaymentError;
use crate::feed::{ProofEvent, ProofEventFeed};
use crate::installment::InstallmentStatus;
use crate::ports::Severity;
use crate::proof::{PaymentProof, ReviewDecision, UploaderRole};
use crate::reconciler::PlanStatusReconciler;
use crate::service::{ensure_payable, notify_quietly, settle_in_place, PaymentPorts, ServiceSettings};

const PROOF_PREFIX: &str = "payment-proofs";

/// An uploaded receipt file
#[derive(Debug, Clone)]
pub struct ProofUpload {
    pub file_name: String,
    pub content: Vec<u8>,
    pub uploaded_by_role: UploaderRole,
}

/// Links uploaded receipts to installments and applies staff reviews
#[derive(Clone)]
pub struct PaymentProofLinker {
    ports: PaymentPorts,
    settings: ServiceSettings,
    feed: ProofEventFeed,
}

impl PaymentProofLinker {
    pub fn new(ports: PaymentPorts, settings: ServiceSettings, feed: ProofEventFeed) -> Self {
        Self { ports, settings, feed }
    }

    pub fn feed(&self) -> &ProofEventFeed {
        &self.feed
    }

    /// Submits a receipt for an open installment
    ///
    /// # Arguments
    ///
    /// * `installment_id` - Installment being paid
    /// * `upload` - File name, bytes and uploader role
    ///
    /// # Returns
    ///
    /// The pending proof. Fails with `InvalidState` for a paid installment
    /// and with `Conflict` while another proof awaits review. The stored file
    /// is removed again if the proof row cannot be written.
    #[instrument(skip(self, upload), fields(installment_id = %installment_id, file_name = %upload.file_name))]
    pub async fn submit(
        &self,
        installment_id: InstallmentId,
        upload: ProofUpload,
    ) -> Result<PaymentProof, PaymentError> {
        if upload.file_name.trim().is_empty() {
            return Err(PaymentError::validation("file_name", "must not be empty"));
        }
        if upload.content.is_empty() {
            return Err(PaymentError::validation("file", "uploaded file is empty"));
        }

        let policy = &self.settings.policy;
        let installment = with_deadline(
            policy,
            "get_installment",
            self.ports.plans.get_installment(installment_id, None),
        )
        .await?;
        let plan = with_deadline(
            policy,
            "get_plan",
            self.ports.plans.get_plan(installment.payment_plan_id, None),
        )
        .await?;
        ensure_payable(&plan)?;

        let existing = with_deadline(
            policy,
            "find_proofs",
            self.ports.proofs.find_proofs(&[installment_id], None),
        )
        .await?;
        let status = PlanStatusReconciler::derive_installment_status(&installment, &existing, self.settings.today());
        if status == InstallmentStatus::Paid {
            return Err(PaymentError::invalid_state(format!(
                "installment #{} is already paid",
                installment.installment_number
            )));
        }
        if existing.iter().any(PaymentProof::is_pending) {
            return Err(PaymentError::conflict(format!(
                "installment #{} already has a proof awaiting review",
                installment.installment_number
            )));
        }

        let proof_id = PaymentProofId::new();
        let path = format!(
            "{}/{}/{}/{}-{}",
            PROOF_PREFIX,
            plan.id,
            installment.id,
            proof_id,
            sanitize_file_name(&upload.file_name)
        );
        let artifact = with_deadline(policy, "upload", self.ports.storage.upload(&path, upload.content)).await?;

        let proof = PaymentProof::new(
            proof_id,
            installment.id,
            artifact,
            upload.file_name,
            upload.uploaded_by_role,
            self.settings.clock.now(),
        );
        let stored = match with_deadline(policy, "insert_proof", self.ports.proofs.insert_proof(&proof, None)).await {
            Ok(stored) => stored,
            Err(err) => {
                if let Err(cleanup) =
                    with_deadline(policy, "remove", self.ports.storage.remove(&proof.file_path_ref)).await
                {
                    warn!(artifact = %proof.file_path_ref, error = %cleanup, "Orphaned proof artifact");
                }
                return Err(err);
            }
        };
        info!(proof_id = %stored.id, "Payment proof submitted");

        notify_quietly(
            self.ports.notifier.as_ref(),
            policy,
            &format!(
                "Nuevo comprobante de pago para el pago #{}",
                installment.installment_number
            ),
            Severity::Info,
        )
        .await;
        self.feed.publish(ProofEvent::Submitted {
            proof_id: stored.id,
            installment_id: installment.id,
            plan_id: plan.id,
        });
        Ok(stored)
    }

    /// Approves or rejects a pending proof
    ///
    /// Approval marks the installment paid as of today in the business
    /// timezone. Rejection leaves the installment untouched and keeps the
    /// notes for the submitter. A proof that is no longer pending yields
    /// `InvalidState`; losing a race against a concurrent review yields
    /// `Conflict`.
    #[instrument(skip(self, notes), fields(proof_id = %proof_id, ?decision, reviewer = %reviewer))]
    pub async fn review(
        &self,
        proof_id: PaymentProofId,
        decision: ReviewDecision,
        notes: Option<String>,
        reviewer: UserId,
    ) -> Result<PaymentProof, PaymentError> {
        let policy = &self.settings.policy;
        let mut proof = with_deadline(policy, "get_proof", self.ports.proofs.get_proof(proof_id, None)).await?;
        proof.review(decision, notes, reviewer, self.settings.clock.now())?;

        let installment = with_deadline(
            policy,
            "get_installment",
            self.ports.plans.get_installment(proof.payment_installment_id, None),
        )
        .await?;
        let plan = with_deadline(
            policy,
            "get_plan",
            self.ports.plans.get_plan(installment.payment_plan_id, None),
        )
        .await?;

        let settlement = match decision {
            ReviewDecision::Approved => {
                let mut installments = with_deadline(
                    policy,
                    "get_installments",
                    self.ports.plans.get_installments(plan.id, None),
                )
                .await?;
                Some(settle_in_place(
                    &plan,
                    &mut installments,
                    installment.id,
                    self.settings.today(),
                    installment.payment_reference.clone(),
                )?)
            }
            ReviewDecision::Rejected => None,
        };

        let stored = with_deadline(
            policy,
            "record_review",
            self.ports.proofs.record_review(&proof, settlement.as_ref(), None),
        )
        .await?;
        info!(settled = settlement.is_some(), "Payment proof reviewed");

        let (message, severity) = match decision {
            ReviewDecision::Approved => (
                format!("Comprobante del pago #{} aprobado", installment.installment_number),
                Severity::Success,
            ),
            ReviewDecision::Rejected => (
                format!(
                    "Comprobante del pago #{} rechazado: {}",
                    installment.installment_number,
                    stored.review_notes.as_deref().unwrap_or("sin comentarios")
                ),
                Severity::Warning,
            ),
        };
        notify_quietly(self.ports.notifier.as_ref(), policy, &message, severity).await;
        self.feed.publish(ProofEvent::Reviewed {
            proof_id: stored.id,
            installment_id: installment.id,
            plan_id: plan.id,
            decision,
        });
        Ok(stored)
    }

    /// Returns a proof with the bytes of its stored file
    #[instrument(skip(self), fields(proof_id = %proof_id))]
    pub async fn download(&self, proof_id: PaymentProofId) -> Result<(PaymentProof, Vec<u8>), PaymentError> {
        let policy = &self.settings.policy;
        let proof = with_deadline(policy, "get_proof", self.ports.proofs.get_proof(proof_id, None)).await?;
        let bytes = with_deadline(policy, "download", self.ports.storage.download(&proof.file_path_ref)).await?;
        Ok((proof, bytes))
    }

    /// Lists an installment's proofs, newest first
    pub async fn proofs_for(&self, installment_id: InstallmentId) -> Result<Vec<PaymentProof>, PaymentError> {
        let policy = &self.settings.policy;
        with_deadline(
            policy,
            "get_installment",
            self.ports.plans.get_installment(installment_id, None),
        )
        .await?;
        with_deadline(
            policy,
            "find_proofs",
            self.ports.proofs.find_proofs(&[installment_id], None),
        )
        .await
    }
}

/// Keeps a file name safe to embed in a storage path
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}
