//! Request/response data transfer objects
//!
//! Domain types that are already `Serialize` (plans, installments, proofs,
//! plan views) are returned as they are; the types here cover request
//! bodies, query strings and the few response shapes with no domain twin.

pub mod plans;
pub mod proofs;
