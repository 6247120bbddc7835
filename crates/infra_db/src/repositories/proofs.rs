//! Proof of payment repository

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::repositories::plans::{settle_installment, SettleInstallment};

const PROOF_COLUMNS: &str = "proof_id, installment_id, file_path_ref, file_name, upload_date, \
     uploaded_by_role, status, review_notes, reviewed_at, reviewed_by";

/// Row of `client_payment_proofs`
#[derive(Debug, Clone, FromRow)]
pub struct ProofRow {
    pub proof_id: Uuid,
    pub installment_id: Uuid,
    pub file_path_ref: String,
    pub file_name: String,
    pub upload_date: DateTime<Utc>,
    pub uploaded_by_role: String,
    pub status: String,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
}

/// Repository for uploaded proofs of payment
#[derive(Debug, Clone)]
pub struct ProofRepository {
    pool: PgPool,
}

impl ProofRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, proof_id: Uuid) -> Result<ProofRow, DatabaseError> {
        let sql = format!("SELECT {PROOF_COLUMNS} FROM client_payment_proofs WHERE proof_id = $1");
        sqlx::query_as::<_, ProofRow>(&sql)
            .bind(proof_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("PaymentProof", proof_id))
    }

    /// Lists proofs for any of `installment_ids`, newest upload first
    pub async fn for_installments(&self, installment_ids: &[Uuid]) -> Result<Vec<ProofRow>, DatabaseError> {
        if installment_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"
            SELECT {PROOF_COLUMNS}
            FROM client_payment_proofs
            WHERE installment_id = ANY($1)
            ORDER BY upload_date DESC, proof_id DESC
            "#
        );
        let rows = sqlx::query_as::<_, ProofRow>(&sql)
            .bind(installment_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Inserts a pending proof
    ///
    /// A second pending proof for the same installment violates
    /// `uq_payment_proofs_pending` and surfaces as `DuplicateEntry`.
    pub async fn insert(&self, proof: &ProofRow) -> Result<ProofRow, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO client_payment_proofs (
                proof_id, installment_id, file_path_ref, file_name, upload_date,
                uploaded_by_role, status, review_notes, reviewed_at, reviewed_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PROOF_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ProofRow>(&sql)
            .bind(proof.proof_id)
            .bind(proof.installment_id)
            .bind(&proof.file_path_ref)
            .bind(&proof.file_name)
            .bind(proof.upload_date)
            .bind(&proof.uploaded_by_role)
            .bind(&proof.status)
            .bind(&proof.review_notes)
            .bind(proof.reviewed_at)
            .bind(proof.reviewed_by)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match DatabaseError::from(e) {
                DatabaseError::DuplicateEntry(_) => DatabaseError::conflict(format!(
                    "installment {} already has a proof awaiting review",
                    proof.installment_id
                )),
                other => other,
            })?;
        Ok(row)
    }

    /// Writes a review outcome, settling the installment when given
    ///
    /// The update only matches a proof that is still pending; losing a race
    /// against another reviewer yields `Conflict` and rolls back the
    /// settlement.
    pub async fn record_review(
        &self,
        review: &ProofRow,
        settlement: Option<&SettleInstallment>,
    ) -> Result<ProofRow, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE client_payment_proofs
            SET status = $2, review_notes = $3, reviewed_at = $4, reviewed_by = $5
            WHERE proof_id = $1 AND status = 'pending'
            RETURNING {PROOF_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, ProofRow>(&sql)
            .bind(review.proof_id)
            .bind(&review.status)
            .bind(&review.review_notes)
            .bind(review.reviewed_at)
            .bind(review.reviewed_by)
            .fetch_optional(&mut *tx)
            .await?;

        let updated = match updated {
            Some(row) => row,
            None => {
                let stored: Option<String> = sqlx::query_scalar("SELECT status FROM client_payment_proofs WHERE proof_id = $1")
                    .bind(review.proof_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                return Err(match stored {
                    Some(status) => DatabaseError::conflict(format!("proof {} was already {}", review.proof_id, status)),
                    None => DatabaseError::not_found("PaymentProof", review.proof_id),
                });
            }
        };

        if let Some(settlement) = settlement {
            settle_installment(&mut *tx, settlement).await?;
        }

        tx.commit().await?;
        debug!(proof_id = %updated.proof_id, status = %updated.status, "Review recorded");
        Ok(updated)
    }
}
