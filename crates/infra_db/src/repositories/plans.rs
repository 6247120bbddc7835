//! Payment plan repository
//!
//! Plans and their installments. Every write to a plan header bumps its
//! `version` column; `save` only applies when the caller's version still
//! matches the stored one.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DatabaseError;

const PLAN_COLUMNS: &str = "plan_id, client_project_id, plan_type, currency, total_amount, status, \
     is_current_plan, notes, version, created_at, updated_at, activated_at";

const INSTALLMENT_COLUMNS: &str = "installment_id, plan_id, installment_number, amount, due_date, \
     description, status, paid_date, payment_reference";

/// Row of `payment_plans`
#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub plan_id: Uuid,
    pub client_project_id: Uuid,
    pub plan_type: String,
    pub currency: String,
    pub total_amount: Decimal,
    pub status: String,
    pub is_current_plan: bool,
    pub notes: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
}

/// Row of `payment_installments`
#[derive(Debug, Clone, FromRow)]
pub struct InstallmentRow {
    pub installment_id: Uuid,
    pub plan_id: Uuid,
    pub installment_number: i32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub description: String,
    pub status: String,
    pub paid_date: Option<NaiveDate>,
    pub payment_reference: Option<String>,
}

/// Filters for listing plans; `None` matches everything
#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    pub client_project_id: Option<Uuid>,
    pub plan_type: Option<String>,
    pub current_only: bool,
}

/// An installment becoming paid, plus the status its plan moves to
#[derive(Debug, Clone)]
pub struct SettleInstallment {
    pub installment_id: Uuid,
    pub paid_date: NaiveDate,
    pub payment_reference: Option<String>,
    pub plan_status: String,
}

/// Repository for payment plans and installments
#[derive(Debug, Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

impl PlanRepository {
    /// Creates a new PlanRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, plan_id: Uuid) -> Result<PlanRow, DatabaseError> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM payment_plans WHERE plan_id = $1");
        sqlx::query_as::<_, PlanRow>(&sql)
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("PaymentPlan", plan_id))
    }

    /// Lists plans matching `filter`, newest first
    pub async fn find(&self, filter: &PlanFilter) -> Result<Vec<PlanRow>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {PLAN_COLUMNS}
            FROM payment_plans
            WHERE ($1::uuid IS NULL OR client_project_id = $1)
              AND ($2::text IS NULL OR plan_type = $2)
              AND ($3::bool = FALSE OR is_current_plan = TRUE)
            ORDER BY created_at DESC, plan_id DESC
            "#
        );
        let rows = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(filter.client_project_id)
            .bind(filter.plan_type.as_deref())
            .bind(filter.current_only)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Inserts a plan header
    ///
    /// A second current plan for the same project and type violates
    /// `uq_payment_plans_current` and surfaces as `DuplicateEntry`.
    pub async fn insert(&self, plan: &PlanRow) -> Result<PlanRow, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        insert_plan(&mut *conn, plan).await
    }

    /// Lists a plan's installments ordered by number
    pub async fn installments(&self, plan_id: Uuid) -> Result<Vec<InstallmentRow>, DatabaseError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payment_plans WHERE plan_id = $1)")
            .bind(plan_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(DatabaseError::not_found("PaymentPlan", plan_id));
        }

        let sql = format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM payment_installments WHERE plan_id = $1 ORDER BY installment_number"
        );
        let rows = sqlx::query_as::<_, InstallmentRow>(&sql)
            .bind(plan_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn installment(&self, installment_id: Uuid) -> Result<InstallmentRow, DatabaseError> {
        let sql = format!("SELECT {INSTALLMENT_COLUMNS} FROM payment_installments WHERE installment_id = $1");
        sqlx::query_as::<_, InstallmentRow>(&sql)
            .bind(installment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("PaymentInstallment", installment_id))
    }

    /// Replaces a plan header and its installment set in one transaction
    ///
    /// Installments missing from `installments` are deleted, the rest are
    /// upserted by id. Fails with `Conflict` when the stored version is not
    /// `expected_version`.
    pub async fn save(
        &self,
        plan: &PlanRow,
        installments: &[InstallmentRow],
        expected_version: i64,
    ) -> Result<PlanRow, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE payment_plans
            SET total_amount = $3, status = $4, notes = $5, activated_at = $6,
                version = version + 1, updated_at = NOW()
            WHERE plan_id = $1 AND version = $2
            RETURNING {PLAN_COLUMNS}
            "#
        );
        let saved = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(plan.plan_id)
            .bind(expected_version)
            .bind(plan.total_amount)
            .bind(&plan.status)
            .bind(&plan.notes)
            .bind(plan.activated_at)
            .fetch_optional(&mut *tx)
            .await?;

        let saved = match saved {
            Some(row) => row,
            None => {
                let stored: Option<i64> = sqlx::query_scalar("SELECT version FROM payment_plans WHERE plan_id = $1")
                    .bind(plan.plan_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                return Err(match stored {
                    Some(version) => DatabaseError::conflict(format!(
                        "plan {} is at version {}, expected {}",
                        plan.plan_id, version, expected_version
                    )),
                    None => DatabaseError::not_found("PaymentPlan", plan.plan_id),
                });
            }
        };

        let keep: Vec<Uuid> = installments.iter().map(|i| i.installment_id).collect();
        let removed = sqlx::query("DELETE FROM payment_installments WHERE plan_id = $1 AND NOT (installment_id = ANY($2))")
            .bind(plan.plan_id)
            .bind(&keep)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for row in installments {
            sqlx::query(
                r#"
                INSERT INTO payment_installments (
                    installment_id, plan_id, installment_number, amount, due_date,
                    description, status, paid_date, payment_reference
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (installment_id) DO UPDATE SET
                    installment_number = EXCLUDED.installment_number,
                    amount = EXCLUDED.amount,
                    due_date = EXCLUDED.due_date,
                    description = EXCLUDED.description,
                    status = EXCLUDED.status,
                    paid_date = EXCLUDED.paid_date,
                    payment_reference = EXCLUDED.payment_reference
                WHERE payment_installments.plan_id = EXCLUDED.plan_id
                "#,
            )
            .bind(row.installment_id)
            .bind(plan.plan_id)
            .bind(row.installment_number)
            .bind(row.amount)
            .bind(row.due_date)
            .bind(&row.description)
            .bind(&row.status)
            .bind(row.paid_date)
            .bind(&row.payment_reference)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            plan_id = %saved.plan_id,
            version = saved.version,
            installments = installments.len(),
            removed,
            "Plan saved"
        );
        Ok(saved)
    }

    /// Marks an installment paid and writes its plan's new status
    pub async fn settle(&self, settlement: &SettleInstallment) -> Result<InstallmentRow, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let row = settle_installment(&mut *tx, settlement).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Archives `current` and inserts `replacement` as the current plan
    pub async fn supersede(&self, current: Uuid, replacement: &PlanRow) -> Result<PlanRow, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let archived: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE payment_plans
            SET is_current_plan = FALSE, version = version + 1, updated_at = NOW()
            WHERE plan_id = $1 AND is_current_plan = TRUE
            RETURNING plan_id
            "#,
        )
        .bind(current)
        .fetch_optional(&mut *tx)
        .await?;

        if archived.is_none() {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payment_plans WHERE plan_id = $1)")
                .bind(current)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                DatabaseError::conflict(format!("plan {} was already superseded", current))
            } else {
                DatabaseError::not_found("PaymentPlan", current)
            });
        }

        let inserted = insert_plan(&mut *tx, replacement).await?;
        tx.commit().await?;
        Ok(inserted)
    }
}

async fn insert_plan(conn: &mut PgConnection, plan: &PlanRow) -> Result<PlanRow, DatabaseError> {
    let sql = format!(
        r#"
        INSERT INTO payment_plans (
            plan_id, client_project_id, plan_type, currency, total_amount, status,
            is_current_plan, notes, version, created_at, updated_at, activated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {PLAN_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, PlanRow>(&sql)
        .bind(plan.plan_id)
        .bind(plan.client_project_id)
        .bind(&plan.plan_type)
        .bind(&plan.currency)
        .bind(plan.total_amount)
        .bind(&plan.status)
        .bind(plan.is_current_plan)
        .bind(&plan.notes)
        .bind(plan.version)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .bind(plan.activated_at)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}

/// Applies a settlement on an open connection or transaction
///
/// The installment update only matches rows that are not yet paid, so two
/// concurrent settlements of the same installment cannot both succeed.
pub(crate) async fn settle_installment(
    conn: &mut PgConnection,
    settlement: &SettleInstallment,
) -> Result<InstallmentRow, DatabaseError> {
    let sql = format!(
        r#"
        UPDATE payment_installments
        SET status = 'paid', paid_date = $2, payment_reference = $3
        WHERE installment_id = $1 AND status <> 'paid'
        RETURNING {INSTALLMENT_COLUMNS}
        "#
    );
    let settled = sqlx::query_as::<_, InstallmentRow>(&sql)
        .bind(settlement.installment_id)
        .bind(settlement.paid_date)
        .bind(&settlement.payment_reference)
        .fetch_optional(&mut *conn)
        .await?;

    let settled = match settled {
        Some(row) => row,
        None => {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payment_installments WHERE installment_id = $1)")
                    .bind(settlement.installment_id)
                    .fetch_one(&mut *conn)
                    .await?;
            return Err(if exists {
                DatabaseError::conflict(format!("installment {} is already paid", settlement.installment_id))
            } else {
                DatabaseError::not_found("PaymentInstallment", settlement.installment_id)
            });
        }
    };

    sqlx::query(
        r#"
        UPDATE payment_plans
        SET status = $2, version = version + 1, updated_at = NOW()
        WHERE plan_id = $1
        "#,
    )
    .bind(settled.plan_id)
    .bind(&settlement.plan_status)
    .execute(&mut *conn)
    .await?;

    debug!(installment_id = %settled.installment_id, plan_id = %settled.plan_id, "Installment settled");
    Ok(settled)
}
