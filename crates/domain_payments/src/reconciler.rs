//! Installment and plan status reconciliation
//!
//! Installment status is derived from the due date, the proofs attached to
//! the installment and any manual settlement. Derivation runs on every read
//! with the caller's notion of "today", so an installment becomes overdue
//! without a background job.
//!
//! ```text
//! pending ──(due date passed)──▶ overdue
//!    │                              │
//!    └──(approved proof / manual)───┴──▶ paid (terminal)
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{InstallmentId, Money};
use crate::error::PaymentError;
use crate::installment::{InstallmentStatus, PaymentInstallment};
use crate::plan::{PaymentPlan, PlanStatus};
use crate::proof::PaymentProof;

/// One installment status transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub installment_id: InstallmentId,
    pub installment_number: u32,
    pub from: InstallmentStatus,
    pub to: InstallmentStatus,
}

/// A plan with statuses brought up to date
#[derive(Debug, Clone)]
pub struct ReconciledPlan {
    pub plan: PaymentPlan,
    /// Ordered by installment number
    pub installments: Vec<PaymentInstallment>,
    pub changes: Vec<StatusChange>,
}

/// Stateless status derivation
pub struct PlanStatusReconciler;

impl PlanStatusReconciler {
    /// Status an installment should have on `today`
    ///
    /// Paid stays paid. An approved proof settles the installment. An open
    /// installment whose due date is strictly before `today` is overdue, and
    /// any other open installment is pending whatever was stored.
    pub fn derive_installment_status(
        installment: &PaymentInstallment,
        proofs: &[PaymentProof],
        today: NaiveDate,
    ) -> InstallmentStatus {
        if installment.is_paid() {
            return InstallmentStatus::Paid;
        }
        let approved = proofs
            .iter()
            .any(|p| p.payment_installment_id == installment.id && p.is_approved());
        if approved {
            return InstallmentStatus::Paid;
        }
        if installment.due_date < today {
            InstallmentStatus::Overdue
        } else {
            InstallmentStatus::Pending
        }
    }

    /// Applies the derived status to one installment
    ///
    /// Returns the transition if the status changed. When an approved proof
    /// settles the installment, the paid date is the proof's review date.
    pub fn reconcile_installment(
        installment: &mut PaymentInstallment,
        proofs: &[PaymentProof],
        today: NaiveDate,
    ) -> Option<StatusChange> {
        let derived = Self::derive_installment_status(installment, proofs, today);
        if derived == installment.status {
            return None;
        }

        let change = StatusChange {
            installment_id: installment.id,
            installment_number: installment.installment_number,
            from: installment.status,
            to: derived,
        };

        if derived == InstallmentStatus::Paid && installment.paid_date.is_none() {
            installment.paid_date = proofs
                .iter()
                .filter(|p| p.payment_installment_id == installment.id && p.is_approved())
                .filter_map(|p| p.reviewed_at)
                .map(|at| at.date_naive())
                .min()
                .or(Some(today));
        }
        installment.status = derived;
        Some(change)
    }

    /// Staff settlement of an installment without a proof
    ///
    /// Fails with `InvalidState` if the installment is already paid.
    pub fn mark_paid(
        installment: &mut PaymentInstallment,
        paid_date: NaiveDate,
        reference: Option<String>,
    ) -> Result<StatusChange, PaymentError> {
        if installment.is_paid() {
            return Err(PaymentError::invalid_state(format!(
                "installment #{} is already paid",
                installment.installment_number
            )));
        }

        let change = StatusChange {
            installment_id: installment.id,
            installment_number: installment.installment_number,
            from: installment.status,
            to: InstallmentStatus::Paid,
        };
        installment.status = InstallmentStatus::Paid;
        installment.paid_date = Some(paid_date);
        installment.payment_reference = reference;
        Ok(change)
    }

    /// Plan-level status for the given installments
    ///
    /// Draft until activated or while empty, completed once every
    /// installment is paid, active otherwise.
    pub fn derive_plan_status(plan: &PaymentPlan, installments: &[PaymentInstallment]) -> PlanStatus {
        if plan.activated_at.is_none() || installments.is_empty() {
            return PlanStatus::Draft;
        }
        if installments.iter().all(PaymentInstallment::is_paid) {
            PlanStatus::Completed
        } else {
            PlanStatus::Active
        }
    }

    /// Reconciles a whole plan
    ///
    /// Every installment must belong to `plan`; a stray row is `NotFound`
    /// and nothing is dropped or invented. The plan total is recomputed from
    /// the installments.
    pub fn reconcile_plan(
        plan: PaymentPlan,
        mut installments: Vec<PaymentInstallment>,
        proofs: &[PaymentProof],
        today: NaiveDate,
    ) -> Result<ReconciledPlan, PaymentError> {
        if let Some(stray) = installments.iter().find(|i| i.payment_plan_id != plan.id) {
            return Err(PaymentError::not_found(
                "PaymentInstallment",
                format!("{} in plan {}", stray.id, plan.id),
            ));
        }

        installments.sort_by_key(|i| i.installment_number);

        let changes: Vec<StatusChange> = installments
            .iter_mut()
            .filter_map(|installment| Self::reconcile_installment(installment, proofs, today))
            .collect();

        let mut plan = plan;
        plan.total_amount = Money::sum(installments.iter().map(|i| &i.amount), plan.currency)?;
        plan.status = Self::derive_plan_status(&plan, &installments);

        if !changes.is_empty() {
            debug!(plan_id = %plan.id, changes = changes.len(), "Installment statuses reconciled");
        }

        Ok(ReconciledPlan {
            plan,
            installments,
            changes,
        })
    }
}
