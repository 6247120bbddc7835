//! Shared setup for service and linker tests

#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

use core_kernel::{BusinessTimezone, CallPolicy, ClientProjectId, Currency, FixedClock, Money, PaymentPlanId};
use domain_payments::ports::mock::{MockObjectStorage, MockPaymentStore, RecordingNotificationSink};
use domain_payments::{
    schedule, PaymentPlanService, PaymentPorts, PaymentProofLinker, PlanType, PlanView, ProofEventFeed,
    ProofUpload, ServiceSettings, UploaderRole,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn mxn(amount: Decimal) -> Money {
    Money::new(amount, Currency::MXN)
}

pub fn receipt(name: &str) -> ProofUpload {
    ProofUpload {
        file_name: name.to_string(),
        content: b"%PDF-1.4 transferencia".to_vec(),
        uploaded_by_role: UploaderRole::Client,
    }
}

pub struct Harness {
    pub store: MockPaymentStore,
    pub storage: MockObjectStorage,
    pub notifier: RecordingNotificationSink,
    pub clock: Arc<FixedClock>,
    pub service: PaymentPlanService,
    pub linker: PaymentProofLinker,
}

impl Harness {
    /// Services over fresh mocks, with the clock on `today`
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
            policy: CallPolicy {
                timeout_ms: 200,
                retry_backoff_ms: 1,
            },
        };

        Self {
            service: PaymentPlanService::new(ports.clone(), settings.clone()),
            linker: PaymentProofLinker::new(ports, settings, ProofEventFeed::new()),
            store,
            storage,
            notifier,
            clock,
        }
    }

    /// Saves a generated schedule into a new draft plan
    pub async fn draft_plan(&self, total: Decimal, months: u32, percent: Decimal, start: NaiveDate) -> PlanView {
        let plan = self
            .service
            .create_plan(ClientProjectId::new(), PlanType::ConstructionPayment, Currency::MXN, None)
            .await
            .unwrap();

        let mut draft = self.service.open_draft(plan.id).await.unwrap();
        let drafts = schedule::generate(mxn(total), months, percent, start).unwrap();
        draft.replace_with_schedule(drafts).unwrap();
        self.service.save_draft(draft).await.unwrap()
    }

    /// Same as `draft_plan`, then activated
    pub async fn active_plan(&self, total: Decimal, months: u32, percent: Decimal, start: NaiveDate) -> PlanView {
        let view = self.draft_plan(total, months, percent, start).await;
        self.service.activate(view.plan.id).await.unwrap()
    }

    pub async fn view(&self, plan_id: PaymentPlanId) -> PlanView {
        self.service.view_plan(plan_id).await.unwrap()
    }
}
