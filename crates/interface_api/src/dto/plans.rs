//! Plan, schedule and installment DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Currency, Money};
use domain_payments::{InstallmentDraft, InstallmentEdit, PlanType};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanRequest {
    pub client_project_id: Uuid,
    pub plan_type: PlanType,
    #[serde(default)]
    pub currency: Currency,
    #[validate(length(max = 2000, message = "Notes are limited to 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNotesRequest {
    #[validate(length(max = 2000, message = "Notes are limited to 2000 characters"))]
    pub notes: Option<String>,
}

/// Parameters of an advance-plus-monthly schedule
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateScheduleRequest {
    pub total_amount: Decimal,
    #[validate(range(max = 360, message = "Schedules are limited to 360 months"))]
    pub months: u32,
    pub advance_percent: Decimal,
    pub start_date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PreviewScheduleRequest {
    #[serde(default)]
    pub currency: Currency,
    #[serde(flatten)]
    #[validate(nested)]
    pub schedule: GenerateScheduleRequest,
}

#[derive(Debug, Serialize)]
pub struct ScheduleEntryResponse {
    pub installment_number: u32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub description: String,
}

impl From<&InstallmentDraft> for ScheduleEntryResponse {
    fn from(draft: &InstallmentDraft) -> Self {
        Self {
            installment_number: draft.installment_number,
            amount: draft.amount.amount(),
            due_date: draft.due_date,
            description: draft.description.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SchedulePreviewResponse {
    pub currency: Currency,
    pub total_amount: Decimal,
    pub installments: Vec<ScheduleEntryResponse>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddInstallmentRequest {
    pub amount: Decimal,
    pub due_date: NaiveDate,
    #[validate(length(min = 1, max = 500, message = "Description must be 1-500 characters"))]
    pub description: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct EditInstallmentRequest {
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 500, message = "Description must be 1-500 characters"))]
    pub description: Option<String>,
}

impl EditInstallmentRequest {
    /// Builds the domain edit, tagging amounts with the plan currency
    pub fn into_edit(self, currency: Currency) -> InstallmentEdit {
        InstallmentEdit {
            amount: self.amount.map(|a| Money::new(a, currency)),
            due_date: self.due_date,
            description: self.description,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct MarkPaidRequest {
    pub paid_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 200, message = "Reference must be 1-200 characters"))]
    pub payment_reference: Option<String>,
}
