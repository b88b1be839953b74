//! # bursar-types
//!
//! Shared domain types used across the Bursar workspace: the money
//! representation and rounding policy, and the status enums persisted
//! by the database layer.
//!
//! ## Modules
//!
//! - [`money`] — Minor-unit amounts and the rounding policy
//! - [`status`] — Lifecycle enums for partners, earnings, withdrawals

pub mod money;
pub mod status;
