//! Payment plan aggregate root
//!
//! A plan belongs to a client project and owns its installments. Plans are
//! never deleted: a new version supersedes the old one by flipping
//! `is_current_plan`, and the old plan keeps its installments as history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClientProjectId, Currency, Money, PaymentPlanId};
use crate::error::PaymentError;

/// What the plan is paying for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    /// Architectural / design fees
    DesignPayment,
    /// Construction works
    ConstructionPayment,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::DesignPayment => "design_payment",
            PlanType::ConstructionPayment => "construction_payment",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "design_payment" => Ok(PlanType::DesignPayment),
            "construction_payment" => Ok(PlanType::ConstructionPayment),
            other => Err(PaymentError::validation(
                "plan_type",
                format!("unknown plan type '{}'", other),
            )),
        }
    }
}

/// Plan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Being edited by staff, not yet activated
    Draft,
    /// Activated with at least one unpaid installment
    Active,
    /// Every installment is paid
    Completed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PlanStatus::Draft),
            "active" => Ok(PlanStatus::Active),
            "completed" => Ok(PlanStatus::Completed),
            other => Err(PaymentError::validation(
                "status",
                format!("unknown plan status '{}'", other),
            )),
        }
    }
}

/// A payment plan for one client project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub id: PaymentPlanId,
    pub client_project_id: ClientProjectId,
    pub plan_type: PlanType,
    pub currency: Currency,
    /// Sum of installment amounts; recomputed before every persist
    pub total_amount: Money,
    pub status: PlanStatus,
    /// False once a newer plan version supersedes this one
    pub is_current_plan: bool,
    pub notes: Option<String>,
    /// Optimistic concurrency token, bumped by every stored write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl PaymentPlan {
    /// Creates an empty draft plan
    ///
    /// # Arguments
    ///
    /// * `client_project_id` - Project the plan bills
    /// * `plan_type` - Design or construction payments
    /// * `currency` - Currency every installment must use
    /// * `now` - Creation instant
    pub fn new(
        client_project_id: ClientProjectId,
        plan_type: PlanType,
        currency: Currency,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentPlanId::new(),
            client_project_id,
            plan_type,
            currency,
            total_amount: Money::zero(currency),
            status: PlanStatus::Draft,
            is_current_plan: true,
            notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
            activated_at: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_draft(&self) -> bool {
        self.status == PlanStatus::Draft
    }

    /// Builds the draft that will supersede this plan
    ///
    /// The replacement starts empty. Installments and notes stay with the
    /// archived plan.
    pub fn next_version(&self, now: DateTime<Utc>) -> PaymentPlan {
        PaymentPlan::new(self.client_project_id, self.plan_type, self.currency, now)
    }
}
