//! PostgreSQL Payment Adapter
//!
//! Implements `PaymentPlanPort` and `PaymentProofPort` on top of
//! [`PlanRepository`] and [`ProofRepository`].
//!
//! # Overview
//!
//! The `PostgresPaymentAdapter` serves as the bridge between the domain's
//! port interfaces and the database layer. It:
//!
//! - Translates domain requests into repository operations
//! - Converts database rows back to domain models, reporting undecodable
//!   rows as `PortError::Transformation`
//! - Translates `DatabaseError` into `PortError`
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresPaymentAdapter;
//! use domain_payments::PaymentPlanPort;
//! use std::sync::Arc;
//!
//! let adapter = Arc::new(PostgresPaymentAdapter::new(pool));
//! let plans: Arc<dyn PaymentPlanPort> = adapter.clone();
//! let plan = plans.get_plan(plan_id, None).await?;
//! ```

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    ClientProjectId, Currency, DomainPort, HealthCheckResult, HealthCheckable, InstallmentId, Money,
    OperationMetadata, PaymentPlanId, PaymentProofId, PortError, UserId,
};
use domain_payments::{
    ArtifactRef, InstallmentSettlement, PaymentInstallment, PaymentPlan, PaymentPlanPort, PaymentProof,
    PaymentProofPort, PlanQuery,
};

use crate::repositories::{
    InstallmentRow, PlanFilter, PlanRepository, PlanRow, ProofRepository, ProofRow, SettleInstallment,
};

/// PostgreSQL-backed implementation of both payment store ports
///
/// # Health Checking
///
/// Health checks run `SELECT 1` against the pool and report the latency.
#[derive(Debug, Clone)]
pub struct PostgresPaymentAdapter {
    plans: PlanRepository,
    proofs: ProofRepository,
    pool: PgPool,
}

impl PostgresPaymentAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            plans: PlanRepository::new(pool.clone()),
            proofs: ProofRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn plan_repository(&self) -> &PlanRepository {
        &self.plans
    }

    pub fn proof_repository(&self) -> &ProofRepository {
        &self.proofs
    }

    /// Currency of the plan owning an installment
    async fn currency_of(&self, plan_id: uuid::Uuid) -> Result<Currency, PortError> {
        let row = self.plans.get(plan_id).await?;
        parse_currency(&row.currency)
    }
}

impl DomainPort for PostgresPaymentAdapter {}

#[async_trait]
impl HealthCheckable for PostgresPaymentAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy("postgres-payment-adapter", latency_ms),
            Err(e) => HealthCheckResult::unhealthy(
                "postgres-payment-adapter",
                latency_ms,
                format!("Database error: {}", e),
            ),
        }
    }
}

#[async_trait]
impl PaymentPlanPort for PostgresPaymentAdapter {
    #[instrument(skip(self, _metadata), fields(plan_id = %id))]
    async fn get_plan(
        &self,
        id: PaymentPlanId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<PaymentPlan, PortError> {
        debug!("Fetching plan by ID");
        let row = self.plans.get(id.into()).await?;
        row_to_plan(row)
    }

    #[instrument(skip(self, _metadata))]
    async fn find_plans(
        &self,
        query: PlanQuery,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<PaymentPlan>, PortError> {
        debug!("Finding plans with query: {:?}", query);
        let filter = PlanFilter {
            client_project_id: query.client_project_id.map(Into::into),
            plan_type: query.plan_type.map(|t| t.as_str().to_string()),
            current_only: query.current_only,
        };
        self.plans
            .find(&filter)
            .await?
            .into_iter()
            .map(row_to_plan)
            .collect()
    }

    #[instrument(skip(self, plan, _metadata), fields(plan_id = %plan.id))]
    async fn create_plan(
        &self,
        plan: &PaymentPlan,
        _metadata: Option<OperationMetadata>,
    ) -> Result<PaymentPlan, PortError> {
        debug!("Creating plan");
        let row = self.plans.insert(&plan_to_row(plan)).await.map_err(|e| match e {
            crate::DatabaseError::DuplicateEntry(_) => PortError::conflict(format!(
                "project {} already has a current {} plan",
                plan.client_project_id, plan.plan_type
            )),
            other => other.into(),
        })?;
        row_to_plan(row)
    }

    #[instrument(skip(self, _metadata), fields(plan_id = %plan_id))]
    async fn get_installments(
        &self,
        plan_id: PaymentPlanId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<PaymentInstallment>, PortError> {
        let plan = self.plans.get(plan_id.into()).await?;
        let currency = parse_currency(&plan.currency)?;
        self.plans
            .installments(plan.plan_id)
            .await?
            .into_iter()
            .map(|row| row_to_installment(row, currency))
            .collect()
    }

    #[instrument(skip(self, _metadata), fields(installment_id = %id))]
    async fn get_installment(
        &self,
        id: InstallmentId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<PaymentInstallment, PortError> {
        let row = self.plans.installment(id.into()).await?;
        let currency = self.currency_of(row.plan_id).await?;
        row_to_installment(row, currency)
    }

    #[instrument(skip(self, plan, installments, _metadata), fields(plan_id = %plan.id))]
    async fn save_plan(
        &self,
        plan: &PaymentPlan,
        installments: &[PaymentInstallment],
        expected_version: i64,
        _metadata: Option<OperationMetadata>,
    ) -> Result<PaymentPlan, PortError> {
        debug!(count = installments.len(), "Saving plan");
        let rows: Vec<InstallmentRow> = installments.iter().map(installment_to_row).collect();
        let saved = self.plans.save(&plan_to_row(plan), &rows, expected_version).await?;
        row_to_plan(saved)
    }

    #[instrument(skip(self, settlement, _metadata), fields(installment_id = %settlement.installment.id))]
    async fn settle_installment(
        &self,
        settlement: &InstallmentSettlement,
        _metadata: Option<OperationMetadata>,
    ) -> Result<PaymentInstallment, PortError> {
        let row = self.plans.settle(&settlement_to_row(settlement)?).await?;
        row_to_installment(row, settlement.installment.amount.currency())
    }

    #[instrument(skip(self, replacement, _metadata), fields(plan_id = %current, replacement_id = %replacement.id))]
    async fn supersede_plan(
        &self,
        current: PaymentPlanId,
        replacement: &PaymentPlan,
        _metadata: Option<OperationMetadata>,
    ) -> Result<PaymentPlan, PortError> {
        debug!("Superseding plan");
        let row = self.plans.supersede(current.into(), &plan_to_row(replacement)).await?;
        row_to_plan(row)
    }
}

#[async_trait]
impl PaymentProofPort for PostgresPaymentAdapter {
    #[instrument(skip(self, _metadata), fields(proof_id = %id))]
    async fn get_proof(
        &self,
        id: PaymentProofId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<PaymentProof, PortError> {
        let row = self.proofs.get(id.into()).await?;
        row_to_proof(row)
    }

    #[instrument(skip(self, installment_ids, _metadata), fields(count = installment_ids.len()))]
    async fn find_proofs(
        &self,
        installment_ids: &[InstallmentId],
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<PaymentProof>, PortError> {
        let ids: Vec<uuid::Uuid> = installment_ids.iter().map(|id| (*id).into()).collect();
        self.proofs
            .for_installments(&ids)
            .await?
            .into_iter()
            .map(row_to_proof)
            .collect()
    }

    #[instrument(skip(self, proof, _metadata), fields(proof_id = %proof.id))]
    async fn insert_proof(
        &self,
        proof: &PaymentProof,
        _metadata: Option<OperationMetadata>,
    ) -> Result<PaymentProof, PortError> {
        debug!("Inserting proof");
        let row = self.proofs.insert(&proof_to_row(proof)).await?;
        row_to_proof(row)
    }

    #[instrument(skip(self, proof, settlement, _metadata), fields(proof_id = %proof.id, settles = settlement.is_some()))]
    async fn record_review(
        &self,
        proof: &PaymentProof,
        settlement: Option<&InstallmentSettlement>,
        _metadata: Option<OperationMetadata>,
    ) -> Result<PaymentProof, PortError> {
        let settlement = settlement.map(settlement_to_row).transpose()?;
        let row = self
            .proofs
            .record_review(&proof_to_row(proof), settlement.as_ref())
            .await?;
        row_to_proof(row)
    }
}

// ============================================================================
// Row conversions
// ============================================================================

fn parse_currency(code: &str) -> Result<Currency, PortError> {
    code.parse()
        .map_err(|e| PortError::transformation(format!("currency '{}': {}", code, e)))
}

fn parse_column<T>(column: &str, value: &str) -> Result<T, PortError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| PortError::transformation(format!("{} '{}': {}", column, value, e)))
}

fn plan_to_row(plan: &PaymentPlan) -> PlanRow {
    PlanRow {
        plan_id: plan.id.into(),
        client_project_id: plan.client_project_id.into(),
        plan_type: plan.plan_type.as_str().to_string(),
        currency: plan.currency.code().to_string(),
        total_amount: plan.total_amount.amount(),
        status: plan.status.as_str().to_string(),
        is_current_plan: plan.is_current_plan,
        notes: plan.notes.clone(),
        version: plan.version,
        created_at: plan.created_at,
        updated_at: plan.updated_at,
        activated_at: plan.activated_at,
    }
}

fn row_to_plan(row: PlanRow) -> Result<PaymentPlan, PortError> {
    let currency = parse_currency(&row.currency)?;
    Ok(PaymentPlan {
        id: PaymentPlanId::from(row.plan_id),
        client_project_id: ClientProjectId::from(row.client_project_id),
        plan_type: parse_column("plan_type", &row.plan_type)?,
        currency,
        total_amount: Money::new(row.total_amount, currency),
        status: parse_column("plan status", &row.status)?,
        is_current_plan: row.is_current_plan,
        notes: row.notes,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
        activated_at: row.activated_at,
    })
}

fn installment_to_row(installment: &PaymentInstallment) -> InstallmentRow {
    InstallmentRow {
        installment_id: installment.id.into(),
        plan_id: installment.payment_plan_id.into(),
        installment_number: installment.installment_number as i32,
        amount: installment.amount.amount(),
        due_date: installment.due_date,
        description: installment.description.clone(),
        status: installment.status.as_str().to_string(),
        paid_date: installment.paid_date,
        payment_reference: installment.payment_reference.clone(),
    }
}

fn row_to_installment(row: InstallmentRow, currency: Currency) -> Result<PaymentInstallment, PortError> {
    let installment_number = u32::try_from(row.installment_number).map_err(|_| {
        PortError::transformation(format!("installment_number {} is negative", row.installment_number))
    })?;
    Ok(PaymentInstallment {
        id: InstallmentId::from(row.installment_id),
        payment_plan_id: PaymentPlanId::from(row.plan_id),
        installment_number,
        amount: Money::new(row.amount, currency),
        due_date: row.due_date,
        description: row.description,
        status: parse_column("installment status", &row.status)?,
        paid_date: row.paid_date,
        payment_reference: row.payment_reference,
    })
}

fn settlement_to_row(settlement: &InstallmentSettlement) -> Result<SettleInstallment, PortError> {
    let installment = &settlement.installment;
    let paid_date = installment
        .paid_date
        .ok_or_else(|| PortError::validation_field("settlement without a paid date", "paid_date"))?;
    Ok(SettleInstallment {
        installment_id: installment.id.into(),
        paid_date,
        payment_reference: installment.payment_reference.clone(),
        plan_status: settlement.plan_status.as_str().to_string(),
    })
}

fn proof_to_row(proof: &PaymentProof) -> ProofRow {
    ProofRow {
        proof_id: proof.id.into(),
        installment_id: proof.payment_installment_id.into(),
        file_path_ref: proof.file_path_ref.as_str().to_string(),
        file_name: proof.file_name.clone(),
        upload_date: proof.upload_date,
        uploaded_by_role: proof.uploaded_by_role.as_str().to_string(),
        status: proof.status.as_str().to_string(),
        review_notes: proof.review_notes.clone(),
        reviewed_at: proof.reviewed_at,
        reviewed_by: proof.reviewed_by.map(Into::into),
    }
}

fn row_to_proof(row: ProofRow) -> Result<PaymentProof, PortError> {
    Ok(PaymentProof {
        id: PaymentProofId::from(row.proof_id),
        payment_installment_id: InstallmentId::from(row.installment_id),
        file_path_ref: ArtifactRef::new(row.file_path_ref),
        file_name: row.file_name,
        upload_date: row.upload_date,
        uploaded_by_role: parse_column("uploaded_by_role", &row.uploaded_by_role)?,
        status: parse_column("proof status", &row.status)?,
        review_notes: row.review_notes,
        reviewed_at: row.reviewed_at,
        reviewed_by: row.reviewed_by.map(UserId::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use domain_payments::{InstallmentStatus, PlanStatus, PlanType, ProofStatus, UploaderRole};
    use rust_decimal_macros::dec;

    fn sample_plan() -> PaymentPlan {
        let mut plan = PaymentPlan::new(
            ClientProjectId::new(),
            PlanType::ConstructionPayment,
            Currency::MXN,
            Utc::now(),
        );
        plan.total_amount = Money::new(dec!(100000), Currency::MXN);
        plan
    }

    #[test]
    fn test_plan_row_conversion_preserves_fields() {
        let plan = sample_plan();
        let back = row_to_plan(plan_to_row(&plan)).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn test_unknown_status_is_a_transformation_error() {
        let mut row = plan_to_row(&sample_plan());
        row.status = "archived".to_string();
        let err = row_to_plan(row).unwrap_err();
        assert!(matches!(err, PortError::Transformation { .. }));
    }

    #[test]
    fn test_negative_installment_number_is_rejected() {
        let plan = sample_plan();
        let inst = PaymentInstallment::new(
            plan.id,
            1,
            Money::new(dec!(500), Currency::MXN),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "Anticipo (30%)",
        );
        let mut row = installment_to_row(&inst);
        row.installment_number = -1;
        assert!(row_to_installment(row, Currency::MXN).is_err());
    }

    #[test]
    fn test_installment_amount_takes_plan_currency() {
        let plan = sample_plan();
        let inst = PaymentInstallment::new(
            plan.id,
            2,
            Money::new(dec!(14000), Currency::MXN),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            "Pago 1 de 5",
        );
        let back = row_to_installment(installment_to_row(&inst), Currency::MXN).unwrap();
        assert_eq!(back.amount, inst.amount);
        assert_eq!(back.status, InstallmentStatus::Pending);
    }

    #[test]
    fn test_settlement_requires_paid_date() {
        let plan = sample_plan();
        let inst = PaymentInstallment::new(
            plan.id,
            1,
            Money::new(dec!(500), Currency::MXN),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "Anticipo",
        );
        let settlement = InstallmentSettlement {
            installment: inst,
            plan_status: PlanStatus::Active,
        };
        let err = settlement_to_row(&settlement).unwrap_err();
        assert!(matches!(err, PortError::Validation { .. }));
    }

    #[test]
    fn test_proof_row_conversion() {
        let proof = PaymentProof::new(
            PaymentProofId::new(),
            InstallmentId::new(),
            ArtifactRef::new("payment-proofs/a/b/c-recibo.pdf"),
            "recibo.pdf",
            UploaderRole::Staff,
            Utc::now(),
        );
        let back = row_to_proof(proof_to_row(&proof)).unwrap();
        assert_eq!(back.status, ProofStatus::Pending);
        assert_eq!(back.uploaded_by_role, UploaderRole::Staff);
        assert_eq!(back.file_path_ref, proof.file_path_ref);
    }
}
