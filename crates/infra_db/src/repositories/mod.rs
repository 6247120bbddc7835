//! Repository implementations
//!
//! Repositories own the SQL and work in terms of row structs; the adapters
//! in [`crate::adapters`] map those rows to domain types.
//!
//! Multi-row writes (saving a plan with its installments, recording a
//! review together with its settlement) run inside one transaction.

pub mod plans;
pub mod proofs;

pub use plans::{InstallmentRow, PlanFilter, PlanRepository, PlanRow, SettleInstallment};
pub use proofs::{ProofRepository, ProofRow};
