//! Domain Adapters
//!
//! Port implementations backed by PostgreSQL and the local filesystem.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{LocalObjectStorage, PostgresNotificationSink, PostgresPaymentAdapter};
//!
//! let store = PostgresPaymentAdapter::new(pool.clone());
//! let storage = LocalObjectStorage::new("./storage").await?;
//! let notifier = PostgresNotificationSink::new(pool);
//! ```

pub mod notifications;
pub mod payments;
pub mod storage;

pub use notifications::{PostgresNotificationSink, TracingNotificationSink};
pub use payments::PostgresPaymentAdapter;
pub use storage::LocalObjectStorage;
