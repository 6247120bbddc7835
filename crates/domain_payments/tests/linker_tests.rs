//! Proof Linker Tests
//!
//! Submission guards, review outcomes, storage cleanup and the change feed,
//! against the in-memory adapters.

mod common;

use rust_decimal_macros::dec;

use common::{date, receipt, Harness};
use core_kernel::{InstallmentId, PaymentProofId, UserId};
use domain_payments::ports::mock::InjectedFault;
use domain_payments::{
    InstallmentStatus, PaymentError, PlanStatus, ProofEvent, ProofStatus, ProofUpload, ReviewDecision, UploaderRole,
};

mod review {
    use super::*;

    #[tokio::test]
    async fn test_approving_proof_for_overdue_installment() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.active_plan(dec!(100000), 6, dec!(30), date(2024, 1, 1)).await;

        h.clock.set_date(date(2024, 2, 1));
        let before = h.view(view.plan.id).await;
        let advance = &before.installments[0];
        assert_eq!(advance.status, InstallmentStatus::Overdue);

        let proof = h.linker.submit(advance.id, receipt("transferencia.pdf")).await.unwrap();
        assert_eq!(proof.status, ProofStatus::Pending);
        // submission alone settles nothing
        assert_eq!(h.view(view.plan.id).await.installments[0].status, InstallmentStatus::Overdue);

        let reviewed = h
            .linker
            .review(proof.id, ReviewDecision::Approved, None, UserId::new())
            .await
            .unwrap();
        assert_eq!(reviewed.status, ProofStatus::Approved);
        assert!(reviewed.reviewed_at.is_some());

        let after = h.view(view.plan.id).await;
        let settled = &after.installments[0];
        assert_eq!(settled.status, InstallmentStatus::Paid);
        assert_eq!(settled.paid_date, Some(date(2024, 2, 1)));

        let amount = advance.amount.amount();
        assert_eq!(
            after.summary.total_overdue.amount(),
            before.summary.total_overdue.amount() - amount
        );
        assert_eq!(
            after.summary.total_paid.amount(),
            before.summary.total_paid.amount() + amount
        );
        assert_eq!(after.plan.status, PlanStatus::Active);
    }

    #[tokio::test]
    async fn test_rejection_keeps_installment_and_notes() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.active_plan(dec!(10000), 2, dec!(50), date(2024, 1, 1)).await;
        let target = view.installments[0].id;

        let proof = h.linker.submit(target, receipt("foto.jpg")).await.unwrap();
        let reviewed = h
            .linker
            .review(
                proof.id,
                ReviewDecision::Rejected,
                Some("El monto no coincide".to_string()),
                UserId::new(),
            )
            .await
            .unwrap();
        assert_eq!(reviewed.status, ProofStatus::Rejected);
        assert_eq!(reviewed.review_notes.as_deref(), Some("El monto no coincide"));

        let after = h.view(view.plan.id).await;
        assert_eq!(after.installments[0].status, InstallmentStatus::Pending);
        assert_eq!(after.proofs[0].review_notes.as_deref(), Some("El monto no coincide"));

        let messages = h.notifier.messages().await;
        assert!(messages.iter().any(|(m, _)| m.contains("El monto no coincide")));

        // a fresh proof may follow a rejection
        h.linker.submit(target, receipt("foto-2.jpg")).await.unwrap();
    }

    #[tokio::test]
    async fn test_reviewed_proof_cannot_be_reviewed_again() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.active_plan(dec!(10000), 2, dec!(50), date(2024, 1, 1)).await;

        let proof = h.linker.submit(view.installments[1].id, receipt("r.pdf")).await.unwrap();
        h.linker
            .review(proof.id, ReviewDecision::Rejected, None, UserId::new())
            .await
            .unwrap();

        let err = h
            .linker
            .review(proof.id, ReviewDecision::Approved, None, UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidState(_)));
        assert_eq!(h.view(view.plan.id).await.installments[1].status, InstallmentStatus::Pending);
    }

    #[tokio::test]
    async fn test_concurrent_reviews_settle_once() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.active_plan(dec!(10000), 2, dec!(50), date(2024, 1, 1)).await;
        let proof = h.linker.submit(view.installments[0].id, receipt("r.pdf")).await.unwrap();

        let (a, b) = tokio::join!(
            h.linker.review(proof.id, ReviewDecision::Approved, None, UserId::new()),
            h.linker.review(proof.id, ReviewDecision::Rejected, None, UserId::new()),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(loser, PaymentError::Conflict(_) | PaymentError::InvalidState(_)));

        let stored = h.linker.proofs_for(view.installments[0].id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_ne!(stored[0].status, ProofStatus::Pending);
    }

    #[tokio::test]
    async fn test_last_approval_completes_plan() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.active_plan(dec!(5000), 1, dec!(0), date(2024, 1, 1)).await;

        let proof = h.linker.submit(view.installments[0].id, receipt("r.pdf")).await.unwrap();
        h.linker
            .review(proof.id, ReviewDecision::Approved, None, UserId::new())
            .await
            .unwrap();

        assert_eq!(h.view(view.plan.id).await.plan.status, PlanStatus::Completed);
    }

    #[tokio::test]
    async fn test_unknown_proof_is_not_found() {
        let h = Harness::on(date(2024, 1, 1));
        let err = h
            .linker
            .review(PaymentProofId::new(), ReviewDecision::Approved, None, UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotFound { .. }));
    }
}

mod submission {
    use super::*;

    #[tokio::test]
    async fn test_paid_installment_refuses_proof() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.active_plan(dec!(10000), 2, dec!(50), date(2024, 1, 1)).await;
        let target = view.installments[0].id;
        h.service.mark_paid(target, None, None).await.unwrap();

        let err = h.linker.submit(target, receipt("r.pdf")).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidState(_)));
        assert_eq!(h.storage.object_count().await, 0);
    }

    #[tokio::test]
    async fn test_one_pending_proof_at_a_time() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.active_plan(dec!(10000), 2, dec!(50), date(2024, 1, 1)).await;
        let target = view.installments[0].id;

        h.linker.submit(target, receipt("a.pdf")).await.unwrap();
        let err = h.linker.submit(target, receipt("b.pdf")).await.unwrap_err();
        assert!(matches!(err, PaymentError::Conflict(_)));
        assert_eq!(h.storage.object_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_insert_removes_uploaded_file() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.active_plan(dec!(10000), 2, dec!(50), date(2024, 1, 1)).await;
        h.store.faults().fail_next("insert_proof", InjectedFault::Internal).await;

        let err = h.linker.submit(view.installments[0].id, receipt("a.pdf")).await.unwrap_err();
        assert!(matches!(err, PaymentError::Internal(_)));
        assert_eq!(h.storage.object_count().await, 0);
        assert_eq!(h.store.proof_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let h = Harness::on(date(2024, 1, 1));
        let upload = ProofUpload {
            file_name: "vacío.pdf".to_string(),
            content: Vec::new(),
            uploaded_by_role: UploaderRole::Staff,
        };

        let err = h.linker.submit(InstallmentId::new(), upload).await.unwrap_err();
        assert_eq!(err.field(), Some("file"));
    }

    #[tokio::test]
    async fn test_unknown_installment_is_not_found() {
        let h = Harness::on(date(2024, 1, 1));
        let err = h.linker.submit(InstallmentId::new(), receipt("a.pdf")).await.unwrap_err();
        assert!(matches!(err, PaymentError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_draft_plan_refuses_proof() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.draft_plan(dec!(10000), 2, dec!(50), date(2024, 1, 1)).await;

        let err = h.linker.submit(view.installments[0].id, receipt("a.pdf")).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_superseded_plan_refuses_new_proofs_but_finishes_reviews() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.active_plan(dec!(10000), 2, dec!(50), date(2024, 1, 1)).await;
        let pending = h.linker.submit(view.installments[0].id, receipt("a.pdf")).await.unwrap();

        h.service.supersede(view.plan.id).await.unwrap();

        let err = h.linker.submit(view.installments[1].id, receipt("b.pdf")).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidState(_)));

        let reviewed = h
            .linker
            .review(pending.id, ReviewDecision::Approved, None, UserId::new())
            .await
            .unwrap();
        assert_eq!(reviewed.status, ProofStatus::Approved);
    }
}

mod retrieval {
    use super::*;

    #[tokio::test]
    async fn test_download_returns_uploaded_bytes() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.active_plan(dec!(10000), 2, dec!(50), date(2024, 1, 1)).await;
        let proof = h.linker.submit(view.installments[0].id, receipt("recibo enero.pdf")).await.unwrap();

        let (stored, bytes) = h.linker.download(proof.id).await.unwrap();
        assert_eq!(stored.file_name, "recibo enero.pdf");
        assert_eq!(bytes, receipt("x").content);
        assert!(stored.file_path_ref.as_str().starts_with("payment-proofs/"));
        assert!(stored.file_path_ref.as_str().ends_with("recibo_enero.pdf"));
    }

    #[tokio::test]
    async fn test_proofs_listed_newest_first() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.active_plan(dec!(10000), 2, dec!(50), date(2024, 1, 1)).await;
        let target = view.installments[0].id;

        let first = h.linker.submit(target, receipt("a.pdf")).await.unwrap();
        h.linker
            .review(first.id, ReviewDecision::Rejected, None, UserId::new())
            .await
            .unwrap();
        h.clock.set_date(date(2023, 12, 16));
        let second = h.linker.submit(target, receipt("b.pdf")).await.unwrap();

        let proofs = h.linker.proofs_for(target).await.unwrap();
        let ids: Vec<PaymentProofId> = proofs.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}

mod feed {
    use super::*;

    #[tokio::test]
    async fn test_submit_and_review_are_published() {
        let h = Harness::on(date(2023, 12, 15));
        let view = h.active_plan(dec!(10000), 2, dec!(50), date(2024, 1, 1)).await;
        let mut rx = h.linker.feed().subscribe();

        let proof = h.linker.submit(view.installments[0].id, receipt("a.pdf")).await.unwrap();
        h.linker
            .review(proof.id, ReviewDecision::Approved, None, UserId::new())
            .await
            .unwrap();

        match rx.recv().await.unwrap().as_ref() {
            ProofEvent::Submitted { proof_id, plan_id, .. } => {
                assert_eq!(*proof_id, proof.id);
                assert_eq!(*plan_id, view.plan.id);
            }
            other => panic!("Expected Submitted, got {:?}", other),
        }
        match rx.recv().await.unwrap().as_ref() {
            ProofEvent::Reviewed { decision, .. } => assert_eq!(*decision, ReviewDecision::Approved),
            other => panic!("Expected Reviewed, got {:?}", other),
        }
    }
}
