//! Payment Plan Domain
//!
//! Installment schedules for construction projects: a plan splits the
//! contract price into installments, clients upload proofs of payment, and
//! staff review them.
//!
//! # Components
//!
//! - [`schedule`]: advance-plus-monthly schedule generation
//! - [`draft`]: editing installments without touching the store
//! - [`reconciler`]: pending / overdue / paid derivation and plan status
//! - [`aggregator`]: paid, pending and overdue totals
//! - [`linker`]: proof submission and review
//! - [`service`]: plan lifecycle over the store ports
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use core_kernel::{Currency, Money};
//! use domain_payments::schedule;
//! use rust_decimal_macros::dec;
//!
//! let drafts = schedule::generate(
//!     Money::new(dec!(100000), Currency::MXN),
//!     6,
//!     dec!(30),
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//! )
//! .unwrap();
//!
//! assert_eq!(drafts.len(), 6);
//! assert_eq!(drafts[0].description, "Anticipo (30%)");
//! assert_eq!(drafts[1].amount.amount(), dec!(14000));
//! ```

pub mod aggregator;
pub mod call;
pub mod draft;
pub mod error;
pub mod feed;
pub mod installment;
pub mod linker;
pub mod plan;
pub mod ports;
pub mod proof;
pub mod reconciler;
pub mod schedule;
pub mod service;

pub use aggregator::{aggregate, PlanSummary};
pub use draft::{InstallmentDraft, InstallmentEdit, PlanDraft};
pub use error::PaymentError;
pub use feed::{ProofEvent, ProofEventFeed};
pub use installment::{InstallmentStatus, PaymentInstallment};
pub use linker::{PaymentProofLinker, ProofUpload};
pub use plan::{PaymentPlan, PlanStatus, PlanType};
pub use ports::{
    InstallmentSettlement, NotificationSink, ObjectStoragePort, PaymentPlanPort, PaymentProofPort, PlanQuery,
    Severity,
};
pub use proof::{ArtifactRef, PaymentProof, ProofStatus, ReviewDecision, UploaderRole};
pub use reconciler::{PlanStatusReconciler, ReconciledPlan, StatusChange};
pub use service::{PaymentPlanService, PaymentPorts, PlanView, ServiceSettings};

#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{MockObjectStorage, MockPaymentStore, RecordingNotificationSink};
