//! Plan application service
//!
//! Orchestrates the store ports around the pure domain pieces: loads and
//! reconciles plans, commits drafts with a version check, activates and
//! supersedes plans, and records manual settlements.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{
    BusinessTimezone, CallPolicy, ClientProjectId, Clock, Currency, InstallmentId, PaymentPlanId, SystemClock,
};

use crate::aggregator::{aggregate, PlanSummary};
use crate::call::with_deadline;
use crate::draft::PlanDraft;
use crate::error::PaymentError;
use crate::installment::PaymentInstallment;
use crate::plan::{PaymentPlan, PlanType};
use crate::ports::{
    InstallmentSettlement, NotificationSink, ObjectStoragePort, PaymentPlanPort, PaymentProofPort, PlanQuery,
    Severity,
};
use crate::proof::PaymentProof;
use crate::reconciler::PlanStatusReconciler;

/// The adapters a service talks to
#[derive(Clone)]
pub struct PaymentPorts {
    pub plans: Arc<dyn PaymentPlanPort>,
    pub proofs: Arc<dyn PaymentProofPort>,
    pub storage: Arc<dyn ObjectStoragePort>,
    pub notifier: Arc<dyn NotificationSink>,
}

/// Clock, business timezone and call policy shared by the services
#[derive(Clone)]
pub struct ServiceSettings {
    pub clock: Arc<dyn Clock>,
    /// Timezone whose calendar decides "today" for overdue checks
    pub timezone: BusinessTimezone,
    pub policy: CallPolicy,
}

impl ServiceSettings {
    pub fn today(&self) -> NaiveDate {
        self.timezone.today(self.clock.as_ref())
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            timezone: BusinessTimezone::default(),
            policy: CallPolicy::default(),
        }
    }
}

/// A reconciled plan with everything the plan screens show
#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    pub plan: PaymentPlan,
    pub installments: Vec<PaymentInstallment>,
    /// Proofs for all installments, newest first
    pub proofs: Vec<PaymentProof>,
    pub summary: PlanSummary,
}

/// Sends a notification, logging instead of failing
pub(crate) async fn notify_quietly(
    notifier: &dyn NotificationSink,
    policy: &CallPolicy,
    message: &str,
    severity: Severity,
) {
    if let Err(e) = with_deadline(policy, "notify", notifier.notify(message, severity)).await {
        warn!(error = %e, %severity, "Notification could not be delivered");
    }
}

/// Service for payment plan lifecycle operations
#[derive(Clone)]
pub struct PaymentPlanService {
    ports: PaymentPorts,
    settings: ServiceSettings,
}

impl PaymentPlanService {
    pub fn new(ports: PaymentPorts, settings: ServiceSettings) -> Self {
        Self { ports, settings }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Creates an empty draft plan for a project
    ///
    /// Fails with `Conflict` if the project already has a current plan of
    /// the same type; supersede it instead.
    #[instrument(skip(self, notes), fields(client_project_id = %client_project_id, plan_type = %plan_type))]
    pub async fn create_plan(
        &self,
        client_project_id: ClientProjectId,
        plan_type: PlanType,
        currency: Currency,
        notes: Option<String>,
    ) -> Result<PaymentPlan, PaymentError> {
        let mut plan = PaymentPlan::new(client_project_id, plan_type, currency, self.settings.clock.now());
        plan.notes = notes;

        let created = with_deadline(
            &self.settings.policy,
            "create_plan",
            self.ports.plans.create_plan(&plan, None),
        )
        .await?;
        info!(plan_id = %created.id, "Payment plan created");
        Ok(created)
    }

    pub async fn list_plans(&self, query: PlanQuery) -> Result<Vec<PaymentPlan>, PaymentError> {
        with_deadline(&self.settings.policy, "find_plans", self.ports.plans.find_plans(query, None)).await
    }

    /// Loads a plan with reconciled installments, proofs and summary
    ///
    /// Statuses are derived for today in the business timezone; the derived
    /// values are returned, not written back.
    #[instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn view_plan(&self, plan_id: PaymentPlanId) -> Result<PlanView, PaymentError> {
        let policy = &self.settings.policy;
        let plan = with_deadline(policy, "get_plan", self.ports.plans.get_plan(plan_id, None)).await?;
        let installments = with_deadline(
            policy,
            "get_installments",
            self.ports.plans.get_installments(plan_id, None),
        )
        .await?;
        let ids: Vec<InstallmentId> = installments.iter().map(|i| i.id).collect();
        let proofs = with_deadline(policy, "find_proofs", self.ports.proofs.find_proofs(&ids, None)).await?;

        let reconciled =
            PlanStatusReconciler::reconcile_plan(plan, installments, &proofs, self.settings.today())?;
        let summary = aggregate(&reconciled.installments, reconciled.plan.currency)?;

        Ok(PlanView {
            plan: reconciled.plan,
            installments: reconciled.installments,
            proofs,
            summary,
        })
    }

    /// Opens a plan for editing at its current version
    ///
    /// The draft holds the stored installments, not the reconciled view, so
    /// derived overdue statuses never reach the store.
    pub async fn open_draft(&self, plan_id: PaymentPlanId) -> Result<PlanDraft, PaymentError> {
        let policy = &self.settings.policy;
        let plan = with_deadline(policy, "get_plan", self.ports.plans.get_plan(plan_id, None)).await?;
        let installments = with_deadline(
            policy,
            "get_installments",
            self.ports.plans.get_installments(plan_id, None),
        )
        .await?;
        PlanDraft::from_committed(plan, &installments)
    }

    /// Persists an edited draft
    ///
    /// The plan total and status are recomputed from the installments. The
    /// write only succeeds if nobody saved the plan since the draft was
    /// opened; otherwise `Conflict` is returned and nothing changes.
    #[instrument(skip(self, draft), fields(plan_id = %draft.plan().id, base_version = draft.base_version()))]
    pub async fn save_draft(&self, draft: PlanDraft) -> Result<PlanView, PaymentError> {
        let expected_version = draft.base_version();
        let (mut plan, installments) = draft.into_committed(self.settings.clock.now())?;
        plan.status = PlanStatusReconciler::derive_plan_status(&plan, &installments);

        let saved = with_deadline(
            &self.settings.policy,
            "save_plan",
            self.ports.plans.save_plan(&plan, &installments, expected_version, None),
        )
        .await?;
        info!(
            version = saved.version,
            installments = installments.len(),
            total = %saved.total_amount,
            "Payment plan saved"
        );

        self.view_plan(saved.id).await
    }

    /// Moves a draft plan to active
    #[instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn activate(&self, plan_id: PaymentPlanId) -> Result<PlanView, PaymentError> {
        let mut draft = self.open_draft(plan_id).await?;
        draft.activate(self.settings.clock.now())?;
        let view = self.save_draft(draft).await?;

        notify_quietly(
            self.ports.notifier.as_ref(),
            &self.settings.policy,
            &format!(
                "Plan de pagos activado: {} cuotas por {}",
                view.installments.len(),
                view.plan.total_amount
            ),
            Severity::Success,
        )
        .await;
        Ok(view)
    }

    /// Replaces the current plan with a new empty draft version
    ///
    /// The old plan and its installments are kept as history with
    /// `is_current_plan = false`.
    #[instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn supersede(&self, plan_id: PaymentPlanId) -> Result<PaymentPlan, PaymentError> {
        let policy = &self.settings.policy;
        let current = with_deadline(policy, "get_plan", self.ports.plans.get_plan(plan_id, None)).await?;
        if !current.is_current_plan {
            return Err(PaymentError::invalid_state(format!(
                "plan {} has already been superseded",
                plan_id
            )));
        }

        let replacement = current.next_version(self.settings.clock.now());
        let created = with_deadline(
            policy,
            "supersede_plan",
            self.ports.plans.supersede_plan(plan_id, &replacement, None),
        )
        .await?;
        info!(replacement_id = %created.id, "Payment plan superseded");
        Ok(created)
    }

    /// Staff settlement of an installment without a proof
    ///
    /// `paid_date` defaults to today in the business timezone.
    #[instrument(skip(self, reference), fields(installment_id = %installment_id))]
    pub async fn mark_paid(
        &self,
        installment_id: InstallmentId,
        paid_date: Option<NaiveDate>,
        reference: Option<String>,
    ) -> Result<PaymentInstallment, PaymentError> {
        let policy = &self.settings.policy;
        let target = with_deadline(
            policy,
            "get_installment",
            self.ports.plans.get_installment(installment_id, None),
        )
        .await?;
        let plan = with_deadline(
            policy,
            "get_plan",
            self.ports.plans.get_plan(target.payment_plan_id, None),
        )
        .await?;
        ensure_payable(&plan)?;

        let mut installments = with_deadline(
            policy,
            "get_installments",
            self.ports.plans.get_installments(plan.id, None),
        )
        .await?;
        let settlement = settle_in_place(
            &plan,
            &mut installments,
            installment_id,
            paid_date.unwrap_or_else(|| self.settings.today()),
            reference,
        )?;

        let settled = with_deadline(
            policy,
            "settle_installment",
            self.ports.plans.settle_installment(&settlement, None),
        )
        .await?;
        info!(plan_status = %settlement.plan_status, "Installment marked paid");

        notify_quietly(
            self.ports.notifier.as_ref(),
            policy,
            &format!("Pago #{} registrado como pagado", settled.installment_number),
            Severity::Success,
        )
        .await;
        Ok(settled)
    }
}

/// Rejects new payments on a plan that was never activated or was superseded
pub(crate) fn ensure_payable(plan: &PaymentPlan) -> Result<(), PaymentError> {
    if plan.activated_at.is_none() {
        return Err(PaymentError::invalid_state(format!(
            "plan {} has not been activated",
            plan.id
        )));
    }
    if !plan.is_current_plan {
        return Err(PaymentError::invalid_state(format!(
            "plan {} has been superseded",
            plan.id
        )));
    }
    Ok(())
}

/// Marks `installment_id` paid within `installments` and derives the plan status
pub(crate) fn settle_in_place(
    plan: &PaymentPlan,
    installments: &mut [PaymentInstallment],
    installment_id: InstallmentId,
    paid_date: NaiveDate,
    reference: Option<String>,
) -> Result<InstallmentSettlement, PaymentError> {
    let target = installments
        .iter_mut()
        .find(|i| i.id == installment_id)
        .ok_or_else(|| PaymentError::not_found("PaymentInstallment", installment_id))?;
    PlanStatusReconciler::mark_paid(target, paid_date, reference)?;
    let installment = target.clone();

    Ok(InstallmentSettlement {
        installment,
        plan_status: PlanStatusReconciler::derive_plan_status(plan, installments),
    })
}
