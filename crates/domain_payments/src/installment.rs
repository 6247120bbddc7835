//! Scheduled installments
//!
//! Installments are plain records. Status changes go through the
//! reconciler, edits go through `PlanDraft`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{InstallmentId, Money, PaymentPlanId};
use crate::error::PaymentError;

/// Installment payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    /// Terminal
    Paid,
    Overdue,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Pending => "pending",
            InstallmentStatus::Paid => "paid",
            InstallmentStatus::Overdue => "overdue",
        }
    }

    /// Pending or overdue: still expecting money
    pub fn is_open(&self) -> bool {
        !matches!(self, InstallmentStatus::Paid)
    }
}

impl fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallmentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InstallmentStatus::Pending),
            "paid" => Ok(InstallmentStatus::Paid),
            "overdue" => Ok(InstallmentStatus::Overdue),
            other => Err(PaymentError::validation(
                "status",
                format!("unknown installment status '{}'", other),
            )),
        }
    }
}

/// One scheduled payment within a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInstallment {
    pub id: InstallmentId,
    pub payment_plan_id: PaymentPlanId,
    /// 1-based position, dense within the plan
    pub installment_number: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub description: String,
    pub status: InstallmentStatus,
    pub paid_date: Option<NaiveDate>,
    pub payment_reference: Option<String>,
}

impl PaymentInstallment {
    /// Creates a pending installment
    pub fn new(
        payment_plan_id: PaymentPlanId,
        installment_number: u32,
        amount: Money,
        due_date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: InstallmentId::new(),
            payment_plan_id,
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
