//! Query functions, one module per table family.

pub mod earnings;
pub mod partners;
pub mod referrals;
pub mod revenue;
pub mod transactions;
pub mod wallet;
pub mod withdrawals;
