//! Adapter tests against a real PostgreSQL container
//!
//! Run with `cargo test -p infra_db -- --ignored` on a machine with Docker.

use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;

use core_kernel::{BusinessTimezone, CallPolicy, ClientProjectId, Currency, FixedClock, UserId};
use domain_payments::{
    schedule, InstallmentStatus, PaymentError, PaymentPlanService, PaymentPorts, PaymentProofLinker, PlanQuery,
    PlanType, ProofEventFeed, ProofStatus, ReviewDecision, ServiceSettings,
};
use infra_db::{LocalObjectStorage, PostgresNotificationSink, PostgresPaymentAdapter};
use test_utils::{
    assert_contiguous, assert_installment_status, receipt, DateFixtures, MoneyFixtures, TestDatabase,
};

struct Services {
    _db: TestDatabase,
    _files: TempDir,
    plans: PaymentPlanService,
    linker: PaymentProofLinker,
}

async fn services() -> Services {
    let db = TestDatabase::new().await.unwrap();
    let files = TempDir::new().unwrap();

    let store = Arc::new(PostgresPaymentAdapter::new(db.pool().clone()));
    let ports = PaymentPorts {
        plans: store.clone(),
        proofs: store,
        storage: Arc::new(LocalObjectStorage::new(files.path()).await.unwrap()),
        notifier: Arc::new(PostgresNotificationSink::new(db.pool().clone())),
    };
    let settings = ServiceSettings {
        clock: Arc::new(FixedClock::on_date(DateFixtures::review_day())),
        timezone: BusinessTimezone::default(),
        policy: CallPolicy::default(),
    };

    Services {
        plans: PaymentPlanService::new(ports.clone(), settings.clone()),
        linker: PaymentProofLinker::new(ports, settings, ProofEventFeed::new()),
        _db: db,
        _files: files,
    }
}

async fn active_plan(s: &Services) -> domain_payments::PlanView {
    let plan = s
        .plans
        .create_plan(ClientProjectId::new(), PlanType::ConstructionPayment, Currency::MXN, None)
        .await
        .unwrap();
    let mut draft = s.plans.open_draft(plan.id).await.unwrap();
    draft
        .replace_with_schedule(
            schedule::generate(MoneyFixtures::mxn_contract(), 6, dec!(30), DateFixtures::schedule_start()).unwrap(),
        )
        .unwrap();
    let view = s.plans.save_draft(draft).await.unwrap();
    s.plans.activate(view.plan.id).await.unwrap()
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_schedule_round_trips_through_postgres() {
    let s = services().await;
    let view = active_plan(&s).await;

    assert_eq!(view.plan.total_amount, MoneyFixtures::mxn_contract());
    assert_eq!(view.plan.version, 3);
    assert_contiguous(view.installments.iter().map(|i| i.installment_number));
    // advance plus the February and March payments are past due on March 15
    assert_installment_status(&view.installments, 1, InstallmentStatus::Overdue);
    assert_installment_status(&view.installments, 4, InstallmentStatus::Pending);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_second_current_plan_conflicts() {
    let s = services().await;
    let project = ClientProjectId::new();

    s.plans
        .create_plan(project, PlanType::DesignPayment, Currency::MXN, None)
        .await
        .unwrap();
    let err = s
        .plans
        .create_plan(project, PlanType::DesignPayment, Currency::MXN, None)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Conflict(_)));

    let plans = s.plans.list_plans(PlanQuery::current_for(project)).await.unwrap();
    assert_eq!(plans.len(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_stale_draft_is_rejected() {
    let s = services().await;
    let view = active_plan(&s).await;

    let mut first = s.plans.open_draft(view.plan.id).await.unwrap();
    let mut second = s.plans.open_draft(view.plan.id).await.unwrap();
    first.set_notes(Some("Primera".to_string()));
    second.set_notes(Some("Segunda".to_string()));

    s.plans.save_draft(first).await.unwrap();
    let err = s.plans.save_draft(second).await.unwrap_err();
    assert!(matches!(err, PaymentError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_approval_settles_in_one_write() {
    let s = services().await;
    let view = active_plan(&s).await;
    let installment = &view.installments[0];

    let proof = s.linker.submit(installment.id, receipt("spei.pdf")).await.unwrap();
    let err = s
        .linker
        .submit(installment.id, receipt("otra.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Conflict(_)));

    let reviewed = s
        .linker
        .review(proof.id, ReviewDecision::Approved, None, UserId::new())
        .await
        .unwrap();
    assert_eq!(reviewed.status, ProofStatus::Approved);

    let after = s.plans.view_plan(view.plan.id).await.unwrap();
    assert_installment_status(&after.installments, 1, InstallmentStatus::Paid);
    assert_eq!(after.installments[0].paid_date, Some(DateFixtures::review_day()));
    assert_eq!(after.summary.paid_count, 1);

    let (_, bytes) = s.linker.download(proof.id).await.unwrap();
    assert!(!bytes.is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_supersede_archives_old_plan() {
    let s = services().await;
    let view = active_plan(&s).await;

    let replacement = s.plans.supersede(view.plan.id).await.unwrap();
    assert!(replacement.is_current_plan);

    let old = s.plans.view_plan(view.plan.id).await.unwrap();
    assert!(!old.plan.is_current_plan);
    assert_eq!(old.installments.len(), 6);

    let err = s.plans.supersede(view.plan.id).await.unwrap_err();
    assert!(matches!(err, PaymentError::InvalidState(_)));
}
