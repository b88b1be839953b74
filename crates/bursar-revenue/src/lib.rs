//! # bursar-revenue
//!
//! Revenue-split calculation for submission fees.
//!
//! A paid submission is divided among up to three parties: the lecturer
//! who owns the assessment, the partner who referred that lecturer (if an
//! active referral exists), and the platform.
//!
//! ## Modules
//!
//! - [`split`] — The pure three-way fee split

pub mod split;

pub use split::{
    split_fee, CommissionContext, FeeSplit, DEFAULT_COMMISSION_PCT, LECTURER_PCT,
    MAX_COMMISSION_PCT,
};

/// Error types for revenue calculations.
#[derive(Debug, thiserror::Error)]
pub enum RevenueError {
    /// Fee amount is zero.
    #[error("fee amount is zero")]
    ZeroAmount,

    /// Commission rate outside 0–100.
    #[error("commission rate {rate}% is outside 0–100")]
    InvalidCommissionRate {
        /// The offending rate.
        rate: u8,
    },

    /// Lecturer plus partner shares exceed the gross fee. This is a
    /// configuration error (commission rate set too high), not a runtime
    /// condition; the settlement must not proceed with a negative
    /// platform share.
    #[error("shares exceed gross fee: lecturer {lecturer} + partner {partner} > {gross}")]
    CommissionExceedsGross {
        /// Gross fee in kobo.
        gross: u64,
        /// Computed lecturer share in kobo.
        lecturer: u64,
        /// Computed partner share in kobo.
        partner: u64,
    },

    /// Arithmetic overflow.
    #[error("arithmetic overflow in revenue calculation")]
    Overflow,
}

/// Convenience result type for revenue operations.
pub type Result<T> = std::result::Result<T, RevenueError>;
