//! Pre-built Test Fixtures
//!
//! Consistent test data for plans and proofs, plus [`MockServices`], the
//! payment services wired to in-memory adapters and a frozen clock.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{BusinessTimezone, CallPolicy, ClientProjectId, Currency, FixedClock, Money, UserId};
use domain_payments::ports::mock::{MockObjectStorage, MockPaymentStore, RecordingNotificationSink};
use domain_payments::{
    schedule, InstallmentDraft, PaymentPlanService, PaymentPorts, PaymentProofLinker, ProofEventFeed,
    ProofUpload, ServiceSettings, UploaderRole,
};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Contract price used by most schedule tests
    pub fn mxn_contract() -> Money {
        Money::new(dec!(100000.00), Currency::MXN)
    }

    pub fn mxn_zero() -> Money {
        Money::zero(Currency::MXN)
    }

    /// A USD amount for currency mismatch tests
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }
}

/// Fixture for calendar dates
pub struct DateFixtures;

impl DateFixtures {
    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// First due date of the standard schedule (Jan 1, 2024)
    pub fn schedule_start() -> NaiveDate {
        Self::date(2024, 1, 1)
    }

    /// "Today" in most tests; the advance and first two monthly payments are past due
    pub fn review_day() -> NaiveDate {
        Self::date(2024, 3, 15)
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn project_id() -> ClientProjectId {
        ClientProjectId::new()
    }

    pub fn reviewer_id() -> UserId {
        UserId::new()
    }
}

/// Fixture for generated schedules
pub struct ScheduleFixtures;

impl ScheduleFixtures {
    /// 100 000 MXN over 6 payments with a 30% advance, from Jan 1, 2024
    pub fn standard() -> Vec<InstallmentDraft> {
        schedule::generate(MoneyFixtures::mxn_contract(), 6, dec!(30), DateFixtures::schedule_start()).unwrap()
    }
}

/// A receipt upload from the client portal
pub fn receipt(file_name: &str) -> ProofUpload {
    ProofUpload {
        file_name: file_name.to_string(),
        content: b"%PDF-1.4 comprobante de transferencia".to_vec(),
        uploaded_by_role: UploaderRole::Client,
    }
}

/// Call policy with a short deadline and almost no backoff
pub fn fast_policy() -> CallPolicy {
    CallPolicy {
        timeout_ms: 200,
        retry_backoff_ms: 1,
    }
}

/// Payment services over fresh in-memory adapters
pub struct MockServices {
    pub store: MockPaymentStore,
    pub storage: MockObjectStorage,
    pub notifier: RecordingNotificationSink,
    pub clock: Arc<FixedClock>,
    pub ports: PaymentPorts,
    pub settings: ServiceSettings,
}

impl MockServices {
    /// Wires the mocks with the clock frozen on `today`
    pub fn on(today: NaiveDate) -> Self {
        let store = MockPaymentStore::new();
        let storage = MockObjectStorage::new();
        let notifier = RecordingNotificationSink::new();
        let clock = Arc::new(FixedClock::on_date(today));

        let ports = PaymentPorts {
            plans: Arc::new(store.clone()),
            proofs: Arc::new(store.clone()),
            storage: Arc::new(storage.clone()),
            notifier: Arc::new(notifier.clone()),
        };
        let settings = ServiceSettings {
            clock: clock.clone(),
            timezone: BusinessTimezone::default(),
            policy: fast_policy(),
        };

        Self {
            store,
            storage,
            notifier,
            clock,
            ports,
            settings,
        }
    }

    pub fn plan_service(&self) -> PaymentPlanService {
        PaymentPlanService::new(self.ports.clone(), self.settings.clone())
    }

    pub fn proof_linker(&self) -> PaymentProofLinker {
        PaymentProofLinker::new(self.ports.clone(), self.settings.clone(), ProofEventFeed::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_schedule_matches_contract() {
        let drafts = ScheduleFixtures::standard();
        assert_eq!(drafts.len(), 6);
        assert_eq!(drafts[0].amount, Money::new(dec!(30000), Currency::MXN));
        assert_eq!(drafts[0].due_date, DateFixtures::schedule_start());
    }

    #[tokio::test]
    async fn test_mock_services_share_one_store() {
        let services = MockServices::on(DateFixtures::review_day());
        let plan = services
            .plan_service()
            .create_plan(
                IdFixtures::project_id(),
                domain_payments::PlanType::DesignPayment,
                Currency::MXN,
                None,
            )
            .await
            .unwrap();

        let view = services.plan_service().view_plan(plan.id).await.unwrap();
        assert_eq!(view.plan.id, plan.id);
        assert!(view.installments.is_empty());
    }
}
