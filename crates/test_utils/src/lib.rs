//! Test Utilities Crate
//!
//! Shared test infrastructure for the payment plan crates.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data and a mock-backed service harness
//! - `builders`: Builder patterns for plans, installments and proofs
//! - `database`: Postgres test container management
//! - `assertions`: Assertion helpers for schedules and money
//! - `generators`: Property-based test data generators

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use fixtures::*;
pub use generators::*;
