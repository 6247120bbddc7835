//! Core Kernel - Foundational types for the payment plan system
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money types with precise decimal arithmetic
//! - Calendar helpers and injectable clocks
//! - Strongly-typed identifiers
//! - Port error and health-check contracts for adapters

pub mod money;
pub mod calendar;
pub mod identifiers;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use calendar::{add_months, BusinessTimezone, CalendarError, Clock, FixedClock, SystemClock};
pub use identifiers::{
    ClientProjectId, UserId, PaymentPlanId, InstallmentId, PaymentProofId, NotificationId,
};
pub use ports::{
    PortError, DomainPort, CallPolicy, AdapterHealth, HealthCheckResult, HealthCheckable,
    OperationMetadata,
};
