//! Payment Domain Ports
//!
//! Port interfaces the payment domain needs from the outside world. The
//! relational store is split into a plan port and a proof port; object
//! storage and the notification sink are separate ports so each can be
//! swapped independently.
//!
//! # Adapters
//!
//! - **Postgres**: `infra_db` implements both store ports over one pool
//! - **Filesystem**: `infra_db::storage` implements object storage
//! - **Mock**: in-memory implementations in [`mock`] for tests
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_payments::ports::PaymentPlanPort;
//! use std::sync::Arc;
//!
//! pub struct PlanReader {
//!     plans: Arc<dyn PaymentPlanPort>,
//! }
//!
//! impl PlanReader {
//!     pub async fn plan(&self, id: PaymentPlanId) -> Result<PaymentPlan, PortError> {
//!         self.plans.get_plan(id, None).await
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{
    ClientProjectId, DomainPort, HealthCheckable, InstallmentId, OperationMetadata, PaymentPlanId,
    PaymentProofId, PortError,
};

use crate::installment::PaymentInstallment;
use crate::plan::{PaymentPlan, PlanStatus, PlanType};
use crate::proof::{ArtifactRef, PaymentProof};

/// Query parameters for finding plans
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanQuery {
    pub client_project_id: Option<ClientProjectId>,
    pub plan_type: Option<PlanType>,
    /// Only plans that have not been superseded
    #[serde(default)]
    pub current_only: bool,
}

impl PlanQuery {
    /// Creates a query for the current plans of a project
    pub fn current_for(client_project_id: ClientProjectId) -> Self {
        Self {
            client_project_id: Some(client_project_id),
            plan_type: None,
            current_only: true,
        }
    }

    pub fn with_type(mut self, plan_type: PlanType) -> Self {
        self.plan_type = Some(plan_type);
        self
    }

    /// Returns true if `plan` satisfies every filter
    pub fn matches(&self, plan: &PaymentPlan) -> bool {
        if let Some(project) = self.client_project_id {
            if plan.client_project_id != project {
                return false;
            }
        }
        if let Some(plan_type) = self.plan_type {
            if plan.plan_type != plan_type {
                return false;
            }
        }
        !self.current_only || plan.is_current_plan
    }
}

/// An installment becoming paid, together with the resulting plan status
///
/// Stores apply the installment update and the plan status in one write and
/// bump the plan version.
#[derive(Debug, Clone)]
pub struct InstallmentSettlement {
    pub installment: PaymentInstallment,
    pub plan_status: PlanStatus,
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage operations for plans and installments
///
/// All methods are async and return `Result<T, PortError>` so that the
/// domain sees the same error shape from every adapter.
#[async_trait]
pub trait PaymentPlanPort: DomainPort + HealthCheckable {
    /// Retrieves a plan by ID
    ///
    /// # Returns
    ///
    /// The plan if found, or `PortError::NotFound`
    async fn get_plan(
        &self,
        id: PaymentPlanId,
        metadata: Option<OperationMetadata>,
    ) -> Result<PaymentPlan, PortError>;

    /// Finds plans matching the query, newest first
    async fn find_plans(
        &self,
        query: PlanQuery,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<PaymentPlan>, PortError>;

    /// Inserts a new plan with no installments
    ///
    /// Fails with `PortError::Conflict` if another current plan of the same
    /// type already exists for the project.
    async fn create_plan(
        &self,
        plan: &PaymentPlan,
        metadata: Option<OperationMetadata>,
    ) -> Result<PaymentPlan, PortError>;

    /// Lists a plan's installments ordered by installment number
    async fn get_installments(
        &self,
        plan_id: PaymentPlanId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<PaymentInstallment>, PortError>;

    /// Retrieves one installment by ID
    async fn get_installment(
        &self,
        id: InstallmentId,
        metadata: Option<OperationMetadata>,
    ) -> Result<PaymentInstallment, PortError>;

    /// Replaces the plan header and its installment set
    ///
    /// # Arguments
    ///
    /// * `plan` - Header to store; its total must already be recomputed
    /// * `installments` - The complete installment list after editing
    /// * `expected_version` - Version the caller loaded
    ///
    /// # Returns
    ///
    /// The stored plan with its new version, or `PortError::Conflict` when
    /// the stored version no longer matches `expected_version`
    async fn save_plan(
        &self,
        plan: &PaymentPlan,
        installments: &[PaymentInstallment],
        expected_version: i64,
        metadata: Option<OperationMetadata>,
    ) -> Result<PaymentPlan, PortError>;

    /// Marks one installment paid and updates its plan status
    ///
    /// Fails with `PortError::Conflict` if the stored installment is already
    /// paid.
    async fn settle_installment(
        &self,
        settlement: &InstallmentSettlement,
        metadata: Option<OperationMetadata>,
    ) -> Result<PaymentInstallment, PortError>;

    /// Archives `current` and inserts `replacement` as the current plan
    ///
    /// Both changes are applied atomically.
    async fn supersede_plan(
        &self,
        current: PaymentPlanId,
        replacement: &PaymentPlan,
        metadata: Option<OperationMetadata>,
    ) -> Result<PaymentPlan, PortError>;
}

/// Storage operations for proofs of payment
#[async_trait]
pub trait PaymentProofPort: DomainPort + HealthCheckable {
    /// Retrieves a proof by ID
    async fn get_proof(
        &self,
        id: PaymentProofId,
        metadata: Option<OperationMetadata>,
    ) -> Result<PaymentProof, PortError>;

    /// Lists proofs attached to any of `installment_ids`, newest first
    async fn find_proofs(
        &self,
        installment_ids: &[InstallmentId],
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<PaymentProof>, PortError>;

    /// Inserts a pending proof
    ///
    /// Fails with `PortError::Conflict` if the installment already has a
    /// pending proof.
    async fn insert_proof(
        &self,
        proof: &PaymentProof,
        metadata: Option<OperationMetadata>,
    ) -> Result<PaymentProof, PortError>;

    /// Stores a review outcome
    ///
    /// The update only applies while the stored proof is still pending; a
    /// concurrent review that got there first yields `PortError::Conflict`.
    /// When `settlement` is given, the installment and plan are updated in
    /// the same write.
    async fn record_review(
        &self,
        proof: &PaymentProof,
        settlement: Option<&InstallmentSettlement>,
        metadata: Option<OperationMetadata>,
    ) -> Result<PaymentProof, PortError>;
}

/// Binary artifact storage
#[async_trait]
pub trait ObjectStoragePort: DomainPort {
    /// Stores `bytes` under `path` and returns the handle to keep
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<ArtifactRef, PortError>;

    async fn download(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, PortError>;

    /// Deletes an artifact; removing a missing artifact is not an error
    async fn remove(&self, artifact: &ArtifactRef) -> Result<(), PortError>;
}

/// User-facing notifications
#[async_trait]
pub trait NotificationSink: DomainPort {
    async fn notify(&self, message: &str, severity: Severity) -> Result<(), PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    //! In-memory adapters for tests
    //!
    //! `MockPaymentStore` implements both store ports over one shared state so
    //! reviews and settlements are atomic the same way a database
    //! transaction is.

    use super::*;
    use chrono::Utc;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{Mutex, RwLock};

    use core_kernel::{AdapterHealth, HealthCheckResult};
    use crate::installment::InstallmentStatus;
    use crate::proof::ProofStatus;

    /// Failure to inject into the next mock call
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum InjectedFault {
        Unavailable,
        Conflict,
        Internal,
    }

    impl InjectedFault {
        fn into_error(self, operation: &str) -> PortError {
            match self {
                InjectedFault::Unavailable => PortError::ServiceUnavailable {
                    service: format!("injected outage during {}", operation),
                },
                InjectedFault::Conflict => PortError::conflict(format!("injected conflict during {}", operation)),
                InjectedFault::Internal => PortError::internal(format!("injected failure during {}", operation)),
            }
        }
    }

    /// Shared fault injection for the mock adapters
    #[derive(Debug, Default, Clone)]
    pub struct FaultPlan {
        faults: Arc<Mutex<VecDeque<(String, InjectedFault)>>>,
        latency: Arc<RwLock<Option<Duration>>>,
    }

    impl FaultPlan {
        /// Fails the next call to `operation` with `fault`
        pub async fn fail_next(&self, operation: &str, fault: InjectedFault) {
            self.faults.lock().await.push_back((operation.to_string(), fault));
        }

        /// Delays every call by `latency`
        pub async fn set_latency(&self, latency: Option<Duration>) {
            *self.latency.write().await = latency;
        }

        async fn check(&self, operation: &str) -> Result<(), PortError> {
            let latency = *self.latency.read().await;
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }

            let mut faults = self.faults.lock().await;
            if let Some(index) = faults.iter().position(|(op, _)| op == operation) {
                if let Some((_, fault)) = faults.remove(index) {
                    return Err(fault.into_error(operation));
                }
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct StoreState {
        plans: HashMap<PaymentPlanId, PaymentPlan>,
        installments: HashMap<InstallmentId, PaymentInstallment>,
        proofs: HashMap<PaymentProofId, PaymentProof>,
    }

    impl StoreState {
        fn apply_settlement(&mut self, settlement: &InstallmentSettlement) -> Result<PaymentInstallment, PortError> {
            let update = &settlement.installment;
            let stored = self
                .installments
                .get_mut(&update.id)
                .ok_or_else(|| PortError::not_found("PaymentInstallment", update.id))?;
            if stored.status == InstallmentStatus::Paid {
                return Err(PortError::conflict(format!(
                    "installment {} is already paid",
                    update.id
                )));
            }
            stored.status = InstallmentStatus::Paid;
            stored.paid_date = update.paid_date;
            stored.payment_reference = update.payment_reference.clone();
            let settled = stored.clone();

            let plan = self
                .plans
                .get_mut(&settled.payment_plan_id)
                .ok_or_else(|| PortError::not_found("PaymentPlan", settled.payment_plan_id))?;
            plan.status = settlement.plan_status;
            plan.version += 1;
            plan.updated_at = Utc::now();
            Ok(settled)
        }
    }

    /// In-memory plan and proof store
    #[derive(Debug, Default, Clone)]
    pub struct MockPaymentStore {
        state: Arc<RwLock<StoreState>>,
        faults: FaultPlan,
    }

    impl MockPaymentStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn faults(&self) -> &FaultPlan {
            &self.faults
        }

        /// Number of stored proofs, for assertions
        pub async fn proof_count(&self) -> usize {
            self.state.read().await.proofs.len()
        }

        /// Overwrites a stored installment, bypassing every check
        pub async fn put_installment(&self, installment: PaymentInstallment) {
            self.state.write().await.installments.insert(installment.id, installment);
        }
    }

    impl DomainPort for MockPaymentStore {}

    #[async_trait]
    impl HealthCheckable for MockPaymentStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-payment-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl PaymentPlanPort for MockPaymentStore {
        async fn get_plan(
            &self,
            id: PaymentPlanId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<PaymentPlan, PortError> {
            self.faults.check("get_plan").await?;
            self.state
                .read()
                .await
                .plans
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("PaymentPlan", id))
        }

        async fn find_plans(
            &self,
            query: PlanQuery,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<PaymentPlan>, PortError> {
            self.faults.check("find_plans").await?;
            let state = self.state.read().await;
            let mut plans: Vec<PaymentPlan> = state
                .plans
                .values()
                .filter(|p| query.matches(p))
                .cloned()
                .collect();
            plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(plans)
        }

        async fn create_plan(
            &self,
            plan: &PaymentPlan,
            _metadata: Option<OperationMetadata>,
        ) -> Result<PaymentPlan, PortError> {
            self.faults.check("create_plan").await?;
            let mut state = self.state.write().await;
            let clash = state.plans.values().any(|p| {
                p.is_current_plan
                    && p.client_project_id == plan.client_project_id
                    && p.plan_type == plan.plan_type
            });
            if clash && plan.is_current_plan {
                return Err(PortError::conflict(format!(
                    "project {} already has a current {} plan",
                    plan.client_project_id, plan.plan_type
                )));
            }
            state.plans.insert(plan.id, plan.clone());
            Ok(plan.clone())
        }

        async fn get_installments(
            &self,
            plan_id: PaymentPlanId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<PaymentInstallment>, PortError> {
            self.faults.check("get_installments").await?;
            let state = self.state.read().await;
            if !state.plans.contains_key(&plan_id) {
                return Err(PortError::not_found("PaymentPlan", plan_id));
            }
            let mut installments: Vec<PaymentInstallment> = state
                .installments
                .values()
                .filter(|i| i.payment_plan_id == plan_id)
                .cloned()
                .collect();
            installments.sort_by_key(|i| i.installment_number);
            Ok(installments)
        }

        async fn get_installment(
            &self,
            id: InstallmentId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<PaymentInstallment, PortError> {
            self.faults.check("get_installment").await?;
            self.state
                .read()
                .await
                .installments
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("PaymentInstallment", id))
        }

        async fn save_plan(
            &self,
            plan: &PaymentPlan,
            installments: &[PaymentInstallment],
            expected_version: i64,
            _metadata: Option<OperationMetadata>,
        ) -> Result<PaymentPlan, PortError> {
            self.faults.check("save_plan").await?;
            let mut state = self.state.write().await;
            let stored = state
                .plans
                .get(&plan.id)
                .ok_or_else(|| PortError::not_found("PaymentPlan", plan.id))?;
            if stored.version != expected_version {
                return Err(PortError::conflict(format!(
                    "plan {} is at version {}, expected {}",
                    plan.id, stored.version, expected_version
                )));
            }

            let mut saved = plan.clone();
            saved.version = expected_version + 1;
            state.plans.insert(saved.id, saved.clone());

            state.installments.retain(|_, i| i.payment_plan_id != plan.id);
            for installment in installments {
                state.installments.insert(installment.id, installment.clone());
            }
            Ok(saved)
        }

        async fn settle_installment(
            &self,
            settlement: &InstallmentSettlement,
            _metadata: Option<OperationMetadata>,
        ) -> Result<PaymentInstallment, PortError> {
            self.faults.check("settle_installment").await?;
            self.state.write().await.apply_settlement(settlement)
        }

        async fn supersede_plan(
            &self,
            current: PaymentPlanId,
            replacement: &PaymentPlan,
            _metadata: Option<OperationMetadata>,
        ) -> Result<PaymentPlan, PortError> {
            self.faults.check("supersede_plan").await?;
            let mut state = self.state.write().await;
            let old = state
                .plans
                .get_mut(&current)
                .ok_or_else(|| PortError::not_found("PaymentPlan", current))?;
            if !old.is_current_plan {
                return Err(PortError::conflict(format!("plan {} was already superseded", current)));
            }
            old.is_current_plan = false;
            old.version += 1;
            old.updated_at = Utc::now();

            state.plans.insert(replacement.id, replacement.clone());
            Ok(replacement.clone())
        }
    }

    #[async_trait]
    impl PaymentProofPort for MockPaymentStore {
        async fn get_proof(
            &self,
            id: PaymentProofId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<PaymentProof, PortError> {
            self.faults.check("get_proof").await?;
            self.state
                .read()
                .await
                .proofs
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("PaymentProof", id))
        }

        async fn find_proofs(
            &self,
            installment_ids: &[InstallmentId],
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<PaymentProof>, PortError> {
            self.faults.check("find_proofs").await?;
            let state = self.state.read().await;
            let mut proofs: Vec<PaymentProof> = state
                .proofs
                .values()
                .filter(|p| installment_ids.contains(&p.payment_installment_id))
                .cloned()
                .collect();
            proofs.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
            Ok(proofs)
        }

        async fn insert_proof(
            &self,
            proof: &PaymentProof,
            _metadata: Option<OperationMetadata>,
        ) -> Result<PaymentProof, PortError> {
            self.faults.check("insert_proof").await?;
            let mut state = self.state.write().await;
            let pending_exists = state.proofs.values().any(|p| {
                p.payment_installment_id == proof.payment_installment_id && p.status == ProofStatus::Pending
            });
            if pending_exists {
                return Err(PortError::conflict(format!(
                    "installment {} already has a proof awaiting review",
                    proof.payment_installment_id
                )));
            }
            state.proofs.insert(proof.id, proof.clone());
            Ok(proof.clone())
        }

        async fn record_review(
            &self,
            proof: &PaymentProof,
            settlement: Option<&InstallmentSettlement>,
            _metadata: Option<OperationMetadata>,
        ) -> Result<PaymentProof, PortError> {
            self.faults.check("record_review").await?;
            let mut state = self.state.write().await;
            let stored_status = state
                .proofs
                .get(&proof.id)
                .map(|p| p.status)
                .ok_or_else(|| PortError::not_found("PaymentProof", proof.id))?;
            if stored_status != ProofStatus::Pending {
                return Err(PortError::conflict(format!(
                    "proof {} was already {}",
                    proof.id, stored_status
                )));
            }

            if let Some(settlement) = settlement {
                state.apply_settlement(settlement)?;
            }
            state.proofs.insert(proof.id, proof.clone());
            Ok(proof.clone())
        }
    }

    /// In-memory object storage
    #[derive(Debug, Default, Clone)]
    pub struct MockObjectStorage {
        objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
        faults: FaultPlan,
    }

    impl MockObjectStorage {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn faults(&self) -> &FaultPlan {
            &self.faults
        }

        pub async fn object_count(&self) -> usize {
            self.objects.read().await.len()
        }
    }

    impl DomainPort for MockObjectStorage {}

    #[async_trait]
    impl ObjectStoragePort for MockObjectStorage {
        async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<ArtifactRef, PortError> {
            self.faults.check("upload").await?;
            self.objects.write().await.insert(path.to_string(), bytes);
            Ok(ArtifactRef::new(path))
        }

        async fn download(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, PortError> {
            self.faults.check("download").await?;
            self.objects
                .read()
                .await
                .get(artifact.as_str())
                .cloned()
                .ok_or_else(|| PortError::not_found("Artifact", artifact))
        }

        async fn remove(&self, artifact: &ArtifactRef) -> Result<(), PortError> {
            self.faults.check("remove").await?;
            self.objects.write().await.remove(artifact.as_str());
            Ok(())
        }
    }

    /// Notification sink that records every message
    #[derive(Debug, Default, Clone)]
    pub struct RecordingNotificationSink {
        messages: Arc<RwLock<Vec<(String, Severity)>>>,
        faults: FaultPlan,
    }

    impl RecordingNotificationSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn faults(&self) -> &FaultPlan {
            &self.faults
        }

        pub async fn messages(&self) -> Vec<(String, Severity)> {
            self.messages.read().await.clone()
        }
    }

    impl DomainPort for RecordingNotificationSink {}

    #[async_trait]
    impl NotificationSink for RecordingNotificationSink {
        async fn notify(&self, message: &str, severity: Severity) -> Result<(), PortError> {
            self.faults.check("notify").await?;
            self.messages.write().await.push((message.to_string(), severity));
            Ok(())
        }
    }
}
