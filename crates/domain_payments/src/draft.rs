//! Draft editing of a plan's installment list
//!
//! Staff edit a copy of the plan and its installments; nothing touches the
//! store until the draft is committed and saved with the version it was
//! loaded at. Every edit keeps installment numbers dense (`1..=n`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InstallmentId, Money};
use crate::error::PaymentError;
use crate::installment::{InstallmentStatus, PaymentInstallment};
use crate::plan::{PaymentPlan, PlanStatus};

/// An installment as it exists inside a draft
///
/// `id` is `None` until the draft is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentDraft {
    pub id: Option<InstallmentId>,
    pub installment_number: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub description: String,
    pub status: InstallmentStatus,
    pub paid_date: Option<NaiveDate>,
    pub payment_reference: Option<String>,
}

impl InstallmentDraft {
    pub fn new(
        installment_number: u32,
        amount: Money,
        due_date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            installment_number,
            amount,
            due_date,
            description: description.into(),
            status: InstallmentStatus::Pending,
            paid_date: None,
            payment_reference: None,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }
}

/// Status as it may be stored; overdue is only ever derived on read
fn stored_status(status: InstallmentStatus) -> InstallmentStatus {
    match status {
        InstallmentStatus::Overdue => InstallmentStatus::Pending,
        other => other,
    }
}

impl From<&PaymentInstallment> for InstallmentDraft {
    fn from(installment: &PaymentInstallment) -> Self {
        Self {
            id: Some(installment.id),
            installment_number: installment.installment_number,
            amount: installment.amount,
            due_date: installment.due_date,
            description: installment.description.clone(),
            status: stored_status(installment.status),
            paid_date: installment.paid_date,
            payment_reference: installment.payment_reference.clone(),
        }
    }
}

/// Field changes for one installment; `None` leaves the field as is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallmentEdit {
    pub amount: Option<Money>,
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
}

/// Editable copy of a plan
#[derive(Debug, Clone)]
pub struct PlanDraft {
    plan: PaymentPlan,
    installments: Vec<InstallmentDraft>,
}

impl PlanDraft {
    /// Starts a draft for a plan with no installments yet
    pub fn new(plan: PaymentPlan) -> Self {
        Self {
            plan,
            installments: Vec::new(),
        }
    }

    /// Loads a committed plan for editing
    ///
    /// Installments are ordered by number. Rows that belong to another plan
    /// are reported as `NotFound` rather than silently dropped.
    pub fn from_committed(
        plan: PaymentPlan,
        installments: &[PaymentInstallment],
    ) -> Result<Self, PaymentError> {
        if let Some(stray) = installments.iter().find(|i| i.payment_plan_id != plan.id) {
            return Err(PaymentError::not_found(
                "PaymentInstallment",
                format!("{} in plan {}", stray.id, plan.id),
            ));
        }

        let mut drafts: Vec<InstallmentDraft> = installments.iter().map(InstallmentDraft::from).collect();
        drafts.sort_by_key(|d| d.installment_number);
        Ok(Self {
            plan,
            installments: drafts,
        })
    }

    pub fn plan(&self) -> &PaymentPlan {
        &self.plan
    }

    pub fn installments(&self) -> &[InstallmentDraft] {
        &self.installments
    }

    /// Version of the stored plan this draft was loaded from
    pub fn base_version(&self) -> i64 {
        self.plan.version
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.plan.notes = notes;
    }

    /// Appends a pending installment and returns its number
    pub fn add_installment(
        &mut self,
        amount: Money,
        due_date: NaiveDate,
        description: impl Into<String>,
    ) -> Result<u32, PaymentError> {
        let description = description.into();
        self.check_amount(&amount)?;
        check_description(&description)?;

        let number = self.installments.len() as u32 + 1;
        self.installments
            .push(InstallmentDraft::new(number, amount, due_date, description));
        Ok(number)
    }

    /// Changes amount, due date or description of an unpaid installment
    pub fn update_installment(
        &mut self,
        installment_number: u32,
        edit: InstallmentEdit,
    ) -> Result<(), PaymentError> {
        if let Some(amount) = &edit.amount {
            self.check_amount(amount)?;
        }
        if let Some(description) = &edit.description {
            check_description(description)?;
        }

        let draft = self
            .installments
            .iter_mut()
            .find(|d| d.installment_number == installment_number)
            .ok_or_else(|| PaymentError::not_found("PaymentInstallment", format!("#{}", installment_number)))?;

        if draft.is_paid() {
            return Err(PaymentError::invalid_state(format!(
                "installment #{} is already paid",
                installment_number
            )));
        }

        if let Some(amount) = edit.amount {
            draft.amount = amount;
        }
        if let Some(due_date) = edit.due_date {
            draft.due_date = due_date;
        }
        if let Some(description) = edit.description {
            draft.description = description;
        }
        Ok(())
    }

    /// Removes an installment and renumbers the rest
    ///
    /// Only allowed before activation; once a plan is active its installments
    /// are history and can only be added to or edited.
    pub fn remove_installment(&mut self, installment_number: u32) -> Result<InstallmentDraft, PaymentError> {
        self.ensure_draft("remove installments from")?;

        let position = self
            .installments
            .iter()
            .position(|d| d.installment_number == installment_number)
            .ok_or_else(|| PaymentError::not_found("PaymentInstallment", format!("#{}", installment_number)))?;

        let removed = self.installments.remove(position);
        self.renumber();
        Ok(removed)
    }

    /// Replaces the whole list with a generated schedule
    pub fn replace_with_schedule(&mut self, schedule: Vec<InstallmentDraft>) -> Result<(), PaymentError> {
        self.ensure_draft("replace the schedule of")?;
        for draft in &schedule {
            self.check_amount(&draft.amount)?;
        }

        self.installments = schedule;
        self.renumber();
        Ok(())
    }

    /// Sum of all installment amounts
    pub fn total(&self) -> Result<Money, PaymentError> {
        Ok(Money::sum(
            self.installments.iter().map(|d| &d.amount),
            self.plan.currency,
        )?)
    }

    /// Checks amounts, currency and numbering
    pub fn validate(&self) -> Result<(), PaymentError> {
        for (index, draft) in self.installments.iter().enumerate() {
            let expected = index as u32 + 1;
            if draft.installment_number != expected {
                return Err(PaymentError::validation(
                    "installment_number",
                    format!("expected #{} but found #{}", expected, draft.installment_number),
                ));
            }
            self.check_amount(&draft.amount)?;
        }
        Ok(())
    }

    /// Moves the plan from draft to active
    ///
    /// Requires at least one installment. A schedule that is already fully
    /// paid goes straight to completed.
    pub fn activate(&mut self, now: DateTime<Utc>) -> Result<(), PaymentError> {
        self.ensure_draft("activate")?;
        if self.installments.is_empty() {
            return Err(PaymentError::validation(
                "installments",
                "at least one installment is required",
            ));
        }
        self.validate()?;

        self.plan.status = if self.installments.iter().all(InstallmentDraft::is_paid) {
            PlanStatus::Completed
        } else {
            PlanStatus::Active
        };
        self.plan.activated_at = Some(now);
        Ok(())
    }

    /// Produces the plan and installments to persist
    ///
    /// Assigns ids to new installments and recomputes the plan total. Open
    /// installments are committed as pending.
    pub fn into_committed(self, now: DateTime<Utc>) -> Result<(PaymentPlan, Vec<PaymentInstallment>), PaymentError> {
        self.validate()?;
        let total = self.total()?;

        let mut plan = self.plan;
        plan.total_amount = total;
        plan.updated_at = now;

        let installments = self
            .installments
            .into_iter()
            .map(|draft| PaymentInstallment {
                id: draft.id.unwrap_or_default(),
                payment_plan_id: plan.id,
                installment_number: draft.installment_number,
                amount: draft.amount,
                due_date: draft.due_date,
                description: draft.description,
                status: stored_status(draft.status),
                paid_date: draft.paid_date,
                payment_reference: draft.payment_reference,
            })
            .collect();

        Ok((plan, installments))
    }

    fn renumber(&mut self) {
        for (index, draft) in self.installments.iter_mut().enumerate() {
            draft.installment_number = index as u32 + 1;
        }
    }

    fn ensure_draft(&self, action: &str) -> Result<(), PaymentError> {
        if self.plan.status != PlanStatus::Draft {
            return Err(PaymentError::invalid_state(format!(
                "cannot {} a plan that is {}",
                action, self.plan.status
            )));
        }
        Ok(())
    }

    fn check_amount(&self, amount: &Money) -> Result<(), PaymentError> {
        if amount.currency() != self.plan.currency {
            return Err(PaymentError::validation(
                "amount",
                format!("expected {} but got {}", self.plan.currency, amount.currency()),
            ));
        }
        if !amount.is_positive() {
            return Err(PaymentError::validation("amount", "must be greater than zero"));
        }
        if !amount.has_currency_precision() {
            return Err(PaymentError::validation("amount", "too many decimal places"));
        }
        Ok(())
    }
}

fn check_description(description: &str) -> Result<(), PaymentError> {
    if description.trim().is_empty() {
        return Err(PaymentError::validation("description", "must not be empty"));
    }
    Ok(())
}
