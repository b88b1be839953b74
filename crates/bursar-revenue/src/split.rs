//! Three-way submission-fee split.
//!
//! The lecturer always receives [`LECTURER_PCT`] of the gross fee. A
//! referring partner, when one is active, receives its commission rate as
//! a percentage of gross. The platform takes the exact remainder, so the
//! three shares always sum to the gross amount with no rounding leak.

use bursar_types::money;
use serde::{Deserialize, Serialize};

use crate::{Result, RevenueError};

/// Fixed lecturer share of every submission fee.
pub const LECTURER_PCT: u8 = 50;

/// Commission rate assigned to new partners unless overridden.
pub const DEFAULT_COMMISSION_PCT: u8 = 15;

/// Highest commission rate admin tooling will accept. Above this the
/// platform share goes negative for any amount.
pub const MAX_COMMISSION_PCT: u8 = 50;

/// Outcome of the partner lookup for a lecturer, fed into [`split_fee`].
///
/// The rate here is the partner's rate at settlement time; past earnings
/// are never recalculated when the rate changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionContext {
    /// Whether an active referring partner exists for the lecturer.
    pub has_partner: bool,
    /// Partner row id, when `has_partner`.
    pub partner_id: Option<i64>,
    /// Referral row id, when `has_partner`.
    pub referral_id: Option<i64>,
    /// Commission rate in whole percent. Zero when no partner.
    pub commission_rate_pct: u8,
}

impl CommissionContext {
    /// The no-partner context: zero commission, platform takes the rest.
    pub fn none() -> Self {
        Self {
            has_partner: false,
            partner_id: None,
            referral_id: None,
            commission_rate_pct: 0,
        }
    }

    /// Context for an active referral.
    pub fn with_partner(partner_id: i64, referral_id: i64, commission_rate_pct: u8) -> Self {
        Self {
            has_partner: true,
            partner_id: Some(partner_id),
            referral_id: Some(referral_id),
            commission_rate_pct,
        }
    }
}

/// A computed three-way allocation in kobo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    /// Lecturer share.
    pub lecturer: u64,
    /// Partner share. Zero when no active partner.
    pub partner: u64,
    /// Platform share (remainder).
    pub platform: u64,
}

impl FeeSplit {
    /// Sum of the three shares. Always equals the gross fee.
    pub fn total(&self) -> u64 {
        self.lecturer + self.partner + self.platform
    }
}

/// Split a gross submission fee according to the commission context.
///
/// Pure and deterministic. Shares round to the nearest kobo; the platform
/// share is never computed independently — it is the remainder, so the
/// three shares sum to `gross` exactly.
///
/// # Errors
///
/// - [`RevenueError::ZeroAmount`] if `gross` is zero
/// - [`RevenueError::InvalidCommissionRate`] if the rate exceeds 100
/// - [`RevenueError::CommissionExceedsGross`] if lecturer + partner shares
///   would leave the platform negative
pub fn split_fee(gross: u64, ctx: &CommissionContext) -> Result<FeeSplit> {
    if gross == 0 {
        return Err(RevenueError::ZeroAmount);
    }

    let rate = if ctx.has_partner {
        ctx.commission_rate_pct
    } else {
        0
    };
    if rate > 100 {
        return Err(RevenueError::InvalidCommissionRate { rate });
    }

    let lecturer =
        money::percentage_share(gross, LECTURER_PCT).ok_or(RevenueError::Overflow)?;
    let partner = money::percentage_share(gross, rate).ok_or(RevenueError::Overflow)?;

    let allocated = lecturer
        .checked_add(partner)
        .ok_or(RevenueError::Overflow)?;
    if allocated > gross {
        return Err(RevenueError::CommissionExceedsGross {
            gross,
            lecturer,
            partner,
        });
    }

    // Platform takes the remainder to avoid rounding loss
    let platform = gross - allocated;

    Ok(FeeSplit {
        lecturer,
        partner,
        platform,
    })
}
