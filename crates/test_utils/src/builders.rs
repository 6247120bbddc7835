//! Test Data Builders
//!
//! Builder patterns for constructing domain values with sensible defaults.
//! Tests set only the fields they care about; free-text fields are filled
//! with `fake` data so nothing accidentally depends on them.

use chrono::{DateTime, NaiveDate, Utc};
use fake::faker::lorem::en::Word;
use fake::Fake;
use rust_decimal::Decimal;

use core_kernel::{ClientProjectId, Currency, InstallmentId, Money, PaymentPlanId, PaymentProofId, UserId};
use domain_payments::{
    ArtifactRef, InstallmentStatus, PaymentInstallment, PaymentPlan, PaymentProof, PlanStatus, PlanType,
    ProofStatus, UploaderRole,
};

use crate::fixtures::DateFixtures;

/// Builder for payment plans
pub struct PaymentPlanBuilder {
    client_project_id: ClientProjectId,
    plan_type: PlanType,
    currency: Currency,
    total: Decimal,
    status: PlanStatus,
    is_current: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    activated_at: Option<DateTime<Utc>>,
}

impl Default for PaymentPlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentPlanBuilder {
    /// A current draft construction plan in MXN
    pub fn new() -> Self {
        Self {
            client_project_id: ClientProjectId::new(),
            plan_type: PlanType::ConstructionPayment,
            currency: Currency::MXN,
            total: Decimal::ZERO,
            status: PlanStatus::Draft,
            is_current: true,
            notes: None,
            created_at: midday(DateFixtures::schedule_start()),
            activated_at: None,
        }
    }

    pub fn project(mut self, id: ClientProjectId) -> Self {
        self.client_project_id = id;
        self
    }

    pub fn plan_type(mut self, plan_type: PlanType) -> Self {
        self.plan_type = plan_type;
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn total(mut self, total: Decimal) -> Self {
        self.total = total;
        self
    }

    /// Marks the plan active as of its creation instant
    pub fn activated(mut self) -> Self {
        self.status = PlanStatus::Active;
        self.activated_at = Some(self.created_at);
        self
    }

    pub fn superseded(mut self) -> Self {
        self.is_current = false;
        self
    }

    /// Adds randomly worded notes
    pub fn with_notes(mut self) -> Self {
        let word: String = Word().fake();
        self.notes = Some(format!("Nota: {}", word));
        self
    }

    pub fn build(self) -> PaymentPlan {
        let mut plan = PaymentPlan::new(self.client_project_id, self.plan_type, self.currency, self.created_at);
        plan.total_amount = Money::new(self.total, self.currency);
        plan.status = self.status;
        plan.is_current_plan = self.is_current;
        plan.notes = self.notes;
        plan.activated_at = self.activated_at;
        plan
    }
}

/// Builder for installments
pub struct InstallmentBuilder {
    plan_id: PaymentPlanId,
    number: u32,
    amount: Money,
    due_date: NaiveDate,
    description: Option<String>,
    status: InstallmentStatus,
    paid_date: Option<NaiveDate>,
    reference: Option<String>,
}

impl InstallmentBuilder {
    /// Installment #1 of `plan_id`, pending, due on the schedule start
    pub fn new(plan_id: PaymentPlanId, amount: Money) -> Self {
        Self {
            plan_id,
            number: 1,
            amount,
            due_date: DateFixtures::schedule_start(),
            description: None,
            status: InstallmentStatus::Pending,
            paid_date: None,
            reference: None,
        }
    }

    pub fn number(mut self, number: u32) -> Self {
        self.number = number;
        self
    }

    pub fn due(mut self, due_date: NaiveDate) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the installment paid with a random transfer reference
    pub fn paid_on(mut self, paid_date: NaiveDate) -> Self {
        self.status = InstallmentStatus::Paid;
        self.paid_date = Some(paid_date);
        self.reference = Some(format!("SPEI-{}", (1000..9999).fake::<u32>()));
        self
    }

    /// Forces a stored status, as a stale row would carry it
    pub fn status(mut self, status: InstallmentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> PaymentInstallment {
        let description = self
            .description
            .unwrap_or_else(|| format!("Pago {}", self.number));
        let mut installment =
            PaymentInstallment::new(self.plan_id, self.number, self.amount, self.due_date, description);
        installment.status = self.status;
        installment.paid_date = self.paid_date;
        installment.payment_reference = self.reference;
        installment
    }
}

/// Builder for proofs of payment
pub struct ProofBuilder {
    installment_id: InstallmentId,
    file_name: String,
    role: UploaderRole,
    uploaded_at: DateTime<Utc>,
    status: ProofStatus,
    notes: Option<String>,
    reviewer: Option<UserId>,
}

impl ProofBuilder {
    /// A pending client upload with a random PDF name
    pub fn new(installment_id: InstallmentId) -> Self {
        let word: String = Word().fake();
        Self {
            installment_id,
            file_name: format!("{}.pdf", word),
            role: UploaderRole::Client,
            uploaded_at: midday(DateFixtures::review_day()),
            status: ProofStatus::Pending,
            notes: None,
            reviewer: None,
        }
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn by_staff(mut self) -> Self {
        self.role = UploaderRole::Staff;
        self
    }

    pub fn uploaded_at(mut self, at: DateTime<Utc>) -> Self {
        self.uploaded_at = at;
        self
    }

    pub fn approved(mut self) -> Self {
        self.status = ProofStatus::Approved;
        self.reviewer = Some(UserId::new());
        self
    }

    pub fn rejected(mut self, notes: impl Into<String>) -> Self {
        self.status = ProofStatus::Rejected;
        self.notes = Some(notes.into());
        self.reviewer = Some(UserId::new());
        self
    }

    pub fn build(self) -> PaymentProof {
        let id = PaymentProofId::new();
        let artifact = ArtifactRef::new(format!(
            "payment-proofs/{}/{}/{}",
            self.installment_id, id, self.file_name
        ));
        let mut proof = PaymentProof::new(
            id,
            self.installment_id,
            artifact,
            self.file_name,
            self.role,
            self.uploaded_at,
        );
        proof.status = self.status;
        proof.review_notes = self.notes;
        if self.reviewer.is_some() {
            proof.reviewed_at = Some(self.uploaded_at);
        }
        proof.reviewed_by = self.reviewer;
        proof
    }
}

fn midday(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(12, 0, 0).unwrap().and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_plan_builder_defaults() {
        let plan = PaymentPlanBuilder::new().total(dec!(5000)).build();
        assert!(plan.is_current_plan);
        assert!(plan.is_draft());
        assert_eq!(plan.total_amount, Money::new(dec!(5000), Currency::MXN));

        let active = PaymentPlanBuilder::new().activated().build();
        assert_eq!(active.status, PlanStatus::Active);
        assert!(active.activated_at.is_some());
    }

    #[test]
    fn test_paid_installment_has_date_and_reference() {
        let installment = InstallmentBuilder::new(PaymentPlanId::new(), Money::new(dec!(100), Currency::MXN))
            .number(3)
            .paid_on(DateFixtures::review_day())
            .build();

        assert!(installment.is_paid());
        assert_eq!(installment.paid_date, Some(DateFixtures::review_day()));
        assert!(installment.payment_reference.unwrap().starts_with("SPEI-"));
        assert_eq!(installment.description, "Pago 3");
    }

    #[test]
    fn test_rejected_proof_keeps_notes() {
        let proof = ProofBuilder::new(InstallmentId::new())
            .rejected("Monto incorrecto")
            .build();
        assert_eq!(proof.status, ProofStatus::Rejected);
        assert_eq!(proof.review_notes.as_deref(), Some("Monto incorrecto"));
        assert!(proof.reviewed_by.is_some());
        assert!(proof.file_name.ends_with(".pdf"));
    }
}
