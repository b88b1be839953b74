//! Wallet funding from a verified gateway payment.

use bursar_db::queries::{transactions, wallet};
use bursar_db::DbError;
use bursar_gateway::{PaymentStatus, Verification};
use bursar_types::money;
use rusqlite::Connection;

use crate::{with_tx, Result, SettlementError};

/// What a funding attempt did.
#[derive(Clone, Copy, Debug)]
pub struct FundingOutcome {
    /// False when the reference was already recorded and nothing moved.
    pub credited: bool,
    pub wallet_id: i64,
    pub new_balance: u64,
}

/// Credit a user's wallet for a gateway-verified payment.
///
/// Idempotent on the payment reference: verify-then-credit and the
/// webhook can both call this for the same payment and the wallet is
/// credited exactly once. Only a successful payment credits; pending and
/// failed payments are refused.
pub fn apply_verified_funding(
    conn: &mut Connection,
    user_id: &str,
    verification: &Verification,
    now: u64,
) -> Result<FundingOutcome> {
    if verification.status != PaymentStatus::Success {
        return Err(SettlementError::PaymentNotSuccessful {
            reference: verification.reference.clone(),
            status: match verification.status {
                PaymentStatus::Pending => "pending".into(),
                PaymentStatus::Failed => "failed".into(),
                PaymentStatus::Success => "success".into(),
            },
        });
    }
    if verification.amount == 0 {
        return Err(SettlementError::Validation(format!(
            "payment '{}' has zero amount",
            verification.reference
        )));
    }

    with_tx(conn, |tx| {
        if let Some(existing) = transactions::find_by_reference(tx, &verification.reference)? {
            tracing::debug!(
                reference = %verification.reference,
                "funding reference already recorded, skipping credit"
            );
            let balance = wallet::get(tx, existing.wallet_id)?.balance;
            return Ok(FundingOutcome {
                credited: false,
                wallet_id: existing.wallet_id,
                new_balance: balance,
            });
        }

        let w = wallet::get_or_create(tx, user_id, now)?;
        let entry = match wallet::credit(
            tx,
            w.id,
            verification.amount,
            wallet::CreditKind::Funding,
            "wallet funding",
            Some(&verification.reference),
            now,
        ) {
            Ok(entry) => entry,
            // Lost a race on the unique reference; treat as recorded.
            Err(DbError::DuplicateReference(_)) => {
                return Ok(FundingOutcome {
                    credited: false,
                    wallet_id: w.id,
                    new_balance: wallet::get(tx, w.id)?.balance,
                });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            user_id,
            reference = %verification.reference,
            amount = %money::format_kobo(verification.amount),
            "wallet funded"
        );
        Ok(FundingOutcome {
            credited: true,
            wallet_id: w.id,
            new_balance: entry.balance,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified(reference: &str, amount: u64, status: PaymentStatus) -> Verification {
        Verification {
            reference: reference.to_string(),
            status,
            amount,
            paid_at: Some("2026-08-27T10:00:00Z".to_string()),
            payer_email: Some("student@example.com".to_string()),
        }
    }

    #[test]
    fn test_successful_payment_credits_once() {
        let mut conn = bursar_db::open_memory().expect("open");
        let v = verified("fund-ref-1", 20_000, PaymentStatus::Success);

        let first = apply_verified_funding(&mut conn, "student-1", &v, 100).expect("first");
        assert!(first.credited);
        assert_eq!(first.new_balance, 20_000);

        let replay = apply_verified_funding(&mut conn, "student-1", &v, 200).expect("replay");
        assert!(!replay.credited);
        assert_eq!(replay.new_balance, 20_000);
        assert_eq!(replay.wallet_id, first.wallet_id);
    }

    #[test]
    fn test_pending_payment_refused() {
        let mut conn = bursar_db::open_memory().expect("open");
        let v = verified("fund-ref-1", 20_000, PaymentStatus::Pending);
        assert!(matches!(
            apply_verified_funding(&mut conn, "student-1", &v, 100),
            Err(SettlementError::PaymentNotSuccessful { .. })
        ));
        assert!(
            bursar_db::queries::wallet::find_by_user(&conn, "student-1")
                .expect("query")
                .is_none()
        );
    }

    #[test]
    fn test_failed_payment_refused() {
        let mut conn = bursar_db::open_memory().expect("open");
        let v = verified("fund-ref-1", 20_000, PaymentStatus::Failed);
        assert!(matches!(
            apply_verified_funding(&mut conn, "student-1", &v, 100),
            Err(SettlementError::PaymentNotSuccessful { .. })
        ));
    }

    #[test]
    fn test_zero_amount_refused() {
        let mut conn = bursar_db::open_memory().expect("open");
        let v = verified("fund-ref-1", 0, PaymentStatus::Success);
        assert!(matches!(
            apply_verified_funding(&mut conn, "student-1", &v, 100),
            Err(SettlementError::Validation(_))
        ));
    }

    #[test]
    fn test_distinct_references_accumulate() {
        let mut conn = bursar_db::open_memory().expect("open");
        let a = verified("fund-ref-1", 10_000, PaymentStatus::Success);
        let b = verified("fund-ref-2", 5_000, PaymentStatus::Success);
        apply_verified_funding(&mut conn, "student-1", &a, 100).expect("a");
        let outcome = apply_verified_funding(&mut conn, "student-1", &b, 200).expect("b");
        assert_eq!(outcome.new_balance, 15_000);
    }
}
