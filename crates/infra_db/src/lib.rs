//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for payment plans, installments and proofs of
//! payment, plus filesystem storage for the uploaded proof files.
//!
//! # Architecture
//!
//! Repositories own the SQL and speak in row structs. Adapters implement the
//! payment domain's ports on top of them and translate rows and errors.
//! Schema changes live in `migrations/` and are applied with
//! [`run_migrations`].
//!
//! # Concurrency
//!
//! Plan headers carry a `version` column. Saving a draft only succeeds when
//! the version the caller loaded is still current; settling an installment
//! and recording a review are guarded updates that match a single state.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig};
//! use infra_db::adapters::PostgresPaymentAdapter;
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/payments")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresPaymentAdapter::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{LocalObjectStorage, PostgresNotificationSink, PostgresPaymentAdapter, TracingNotificationSink};
pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
