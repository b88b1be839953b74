//! # bursar-settlement
//!
//! Orchestration layer tying the ledger, the revenue split, and the
//! gateway together: wallet funding from verified payments, per-submission
//! settlement, and the withdrawal payout path.
//!
//! Every multi-step flow runs inside a single database transaction; a
//! failure at any step leaves no partial writes.

pub mod commission;
pub mod funding;
pub mod submission;
pub mod withdrawals;

pub use commission::resolve_partner_context;
pub use funding::{apply_verified_funding, FundingOutcome};
pub use submission::{settle_submission, SettlementReceipt, SubmissionFee};

use bursar_db::DbError;
use bursar_revenue::RevenueError;
use rusqlite::Connection;

/// Settlement error types.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Split(#[from] RevenueError),

    #[error("invalid request: {0}")]
    Validation(String),

    /// Funding was attempted for a payment the gateway did not confirm.
    #[error("payment '{reference}' is not successful ({status})")]
    PaymentNotSuccessful { reference: String, status: String },

    /// A withdrawal request asks for more than the requester has.
    #[error("withdrawal exceeds available funds: have {available}, requested {requested}")]
    UnavailableForWithdrawal { available: u64, requested: u64 },
}

pub type Result<T> = std::result::Result<T, SettlementError>;

/// Run `f` inside a database transaction, committing on `Ok`.
///
/// Same contract as [`bursar_db::with_tx`], widened to settlement errors
/// so split failures and validation errors also roll back.
pub(crate) fn with_tx<T>(
    conn: &mut Connection,
    f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
) -> Result<T> {
    let tx = conn.transaction().map_err(DbError::Sqlite)?;
    let value = f(&tx)?;
    tx.commit().map_err(DbError::Sqlite)?;
    Ok(value)
}
