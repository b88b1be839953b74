//! Withdrawal request handling and payout.
//!
//! Filing and review only move the request through its state machine.
//! Money moves once, at [`mark_withdrawal_paid`], in the same transaction
//! that records the payout.

use bursar_db::queries::{earnings, partners, wallet, withdrawals};
use bursar_db::queries::withdrawals::{BankAccount, WithdrawalRow};
use bursar_types::money;
use bursar_types::status::WithdrawalRequester;
use rusqlite::Connection;

use crate::{with_tx, Result, SettlementError};

/// File a withdrawal against a partner's pending earnings.
///
/// The payout destination comes from the bank details on the partner
/// record; a partner without complete bank details cannot withdraw.
pub fn request_partner_withdrawal(
    conn: &Connection,
    partner_user_id: &str,
    amount: u64,
    now: u64,
) -> Result<i64> {
    let partner = partners::find_by_user(conn, partner_user_id)?.ok_or_else(|| {
        SettlementError::Validation(format!("no partner account for user '{partner_user_id}'"))
    })?;

    if amount == 0 {
        return Err(SettlementError::Validation("amount must be positive".into()));
    }
    if amount > partner.pending_earnings {
        return Err(SettlementError::UnavailableForWithdrawal {
            available: partner.pending_earnings,
            requested: amount,
        });
    }

    let (Some(bank_name), Some(account_number), Some(account_name)) = (
        partner.bank_name.as_deref(),
        partner.account_number.as_deref(),
        partner.account_name.as_deref(),
    ) else {
        return Err(SettlementError::Validation(
            "partner has no bank details on file".into(),
        ));
    };

    let id = withdrawals::create(
        conn,
        WithdrawalRequester::Partner,
        partner_user_id,
        amount,
        &BankAccount {
            bank_name,
            account_number,
            account_name,
        },
        now,
    )?;
    tracing::info!(partner_user_id, amount, withdrawal_id = id, "partner withdrawal requested");
    Ok(id)
}

/// File a withdrawal against a lecturer's wallet balance.
pub fn request_lecturer_withdrawal(
    conn: &Connection,
    lecturer_id: &str,
    amount: u64,
    account: &BankAccount<'_>,
    now: u64,
) -> Result<i64> {
    if amount == 0 {
        return Err(SettlementError::Validation("amount must be positive".into()));
    }
    let available = wallet::find_by_user(conn, lecturer_id)?
        .map(|w| w.balance)
        .unwrap_or(0);
    if amount > available {
        return Err(SettlementError::UnavailableForWithdrawal {
            available,
            requested: amount,
        });
    }

    let id = withdrawals::create(
        conn,
        WithdrawalRequester::Lecturer,
        lecturer_id,
        amount,
        account,
        now,
    )?;
    tracing::info!(lecturer_id, amount, withdrawal_id = id, "lecturer withdrawal requested");
    Ok(id)
}

/// Approve a pending request.
pub fn approve_withdrawal(
    conn: &Connection,
    withdrawal_id: i64,
    reviewer: &str,
    now: u64,
) -> Result<WithdrawalRow> {
    withdrawals::approve(conn, withdrawal_id, reviewer, now)?;
    Ok(withdrawals::get(conn, withdrawal_id)?)
}

/// Reject a pending request with a note.
pub fn reject_withdrawal(
    conn: &Connection,
    withdrawal_id: i64,
    reviewer: &str,
    note: &str,
    now: u64,
) -> Result<WithdrawalRow> {
    withdrawals::reject(conn, withdrawal_id, reviewer, note, now)?;
    Ok(withdrawals::get(conn, withdrawal_id)?)
}

/// Record that an approved withdrawal was paid out by bank transfer, and
/// deduct the funds.
///
/// For a partner this settles their pending earnings and flips the
/// earning rows to withdrawn; for a lecturer it debits their wallet. The
/// deduction and the status change are one transaction.
pub fn mark_withdrawal_paid(
    conn: &mut Connection,
    withdrawal_id: i64,
    payer: &str,
    payment_reference: &str,
    now: u64,
) -> Result<WithdrawalRow> {
    with_tx(conn, |tx| {
        // Guards the approved -> paid transition before money moves.
        withdrawals::mark_paid(tx, withdrawal_id, payer, payment_reference, now)?;
        let request = withdrawals::get(tx, withdrawal_id)?;

        match request.requester_type {
            WithdrawalRequester::Partner => {
                let partner = partners::find_by_user(tx, &request.requester_id)?.ok_or_else(
                    || {
                        SettlementError::Validation(format!(
                            "no partner account for user '{}'",
                            request.requester_id
                        ))
                    },
                )?;
                partners::settle_pending_earnings(tx, partner.id, request.amount, now)?;
                earnings::consume_pending(tx, partner.id, request.amount, withdrawal_id)?;
            }
            WithdrawalRequester::Lecturer => {
                let w = wallet::get_or_create(tx, &request.requester_id, now)?;
                wallet::debit(tx, w.id, request.amount, "withdrawal payout", now)?;
            }
        }

        tracing::info!(
            withdrawal_id,
            amount = %money::format_kobo(request.amount),
            requester = %request.requester_id,
            payment_reference,
            "withdrawal paid"
        );
        Ok(request)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bursar_db::queries::partners::NewPartner;
    use bursar_db::queries::referrals;
    use bursar_db::DbError;
    use bursar_types::status::{EarningSource, EarningStatus, WithdrawalStatus};

    const ACCOUNT: BankAccount<'static> = BankAccount {
        bank_name: "First Bank",
        account_number: "0123456789",
        account_name: "L. Lecturer",
    };

    fn setup_partner_with_earnings(conn: &Connection, pending: u64) -> i64 {
        let partner_id = partners::create(
            conn,
            &NewPartner {
                user_id: "partner-user-1",
                partner_code: "EDUTECH",
                business_name: "EduTech Ltd",
                commission_rate_pct: 15,
                bank_name: Some("First Bank"),
                account_number: Some("0123456789"),
                account_name: Some("EduTech Ltd"),
            },
            0,
        )
        .expect("partner");
        if pending > 0 {
            let referral_id =
                referrals::create(conn, partner_id, "lecturer-1", "EDUTECH", 0).expect("referral");
            earnings::record(
                conn,
                &earnings::NewEarning {
                    partner_id,
                    referral_id,
                    transaction_id: None,
                    source: EarningSource::AssignmentSubmission,
                    source_id: "submission-1",
                    source_amount: pending * 2,
                    lecturer_amount: pending,
                    commission_rate_pct: 15,
                    amount: pending,
                },
                0,
            )
            .expect("earning");
            partners::add_pending_earnings(conn, partner_id, pending, 0).expect("accrue");
        }
        partner_id
    }

    #[test]
    fn test_partner_withdrawal_full_cycle() {
        let mut conn = bursar_db::open_memory().expect("open");
        let partner_id = setup_partner_with_earnings(&conn, 5_000);

        let id = request_partner_withdrawal(&conn, "partner-user-1", 5_000, 10).expect("request");
        approve_withdrawal(&conn, id, "admin-1", 20).expect("approve");
        let paid = mark_withdrawal_paid(&mut conn, id, "admin-1", "TRF-001", 30).expect("pay");
        assert_eq!(paid.amount, 5_000);

        let partner = partners::get(&conn, partner_id).expect("partner");
        assert_eq!(partner.pending_earnings, 0);
        assert_eq!(partner.paid_earnings, 5_000);

        let rows = earnings::list_for_partner(&conn, partner_id, 10).expect("list");
        assert!(rows
            .iter()
            .all(|r| r.status == EarningStatus::Withdrawn && r.withdrawal_id == Some(id)));

        let request = withdrawals::get(&conn, id).expect("get");
        assert_eq!(request.status, WithdrawalStatus::Paid);
        assert_eq!(request.payment_reference.as_deref(), Some("TRF-001"));
    }

    #[test]
    fn test_partial_withdrawal_leaves_remainder_pending() {
        let mut conn = bursar_db::open_memory().expect("open");
        let partner_id = setup_partner_with_earnings(&conn, 5_000);

        let id = request_partner_withdrawal(&conn, "partner-user-1", 2_000, 10).expect("request");
        approve_withdrawal(&conn, id, "admin-1", 20).expect("approve");
        mark_withdrawal_paid(&mut conn, id, "admin-1", "TRF-003", 30).expect("pay");

        let partner = partners::get(&conn, partner_id).expect("partner");
        assert_eq!(partner.pending_earnings, 3_000);
        assert_eq!(partner.paid_earnings, 2_000);

        // The earning rows still reconstruct the pending balance.
        let summary = earnings::summary_for_partner(&conn, partner_id).expect("summary");
        assert_eq!(summary.pending, partner.pending_earnings);
        assert_eq!(summary.withdrawn, 2_000);
    }

    #[test]
    fn test_partner_cannot_overdraw_pending() {
        let conn = bursar_db::open_memory().expect("open");
        setup_partner_with_earnings(&conn, 1_000);
        assert!(matches!(
            request_partner_withdrawal(&conn, "partner-user-1", 2_000, 10),
            Err(SettlementError::UnavailableForWithdrawal {
                available: 1_000,
                requested: 2_000
            })
        ));
    }

    #[test]
    fn test_partner_without_bank_details_rejected() {
        let conn = bursar_db::open_memory().expect("open");
        let partner_id = partners::create(
            &conn,
            &NewPartner {
                user_id: "partner-user-2",
                partner_code: "NOBANK",
                business_name: "No Bank Ltd",
                commission_rate_pct: 15,
                bank_name: None,
                account_number: None,
                account_name: None,
            },
            0,
        )
        .expect("partner");
        partners::add_pending_earnings(&conn, partner_id, 500, 0).expect("accrue");

        assert!(matches!(
            request_partner_withdrawal(&conn, "partner-user-2", 500, 10),
            Err(SettlementError::Validation(_))
        ));
    }

    #[test]
    fn test_lecturer_withdrawal_debits_wallet() {
        let mut conn = bursar_db::open_memory().expect("open");
        let w = wallet::get_or_create(&conn, "lecturer-1", 0).expect("wallet");
        wallet::credit(&conn, w.id, 10_000, wallet::CreditKind::Earning, "earnings", None, 0)
            .expect("credit");

        let id =
            request_lecturer_withdrawal(&conn, "lecturer-1", 4_000, &ACCOUNT, 10).expect("request");
        approve_withdrawal(&conn, id, "admin-1", 20).expect("approve");
        mark_withdrawal_paid(&mut conn, id, "admin-1", "TRF-002", 30).expect("pay");

        let after = wallet::get(&conn, w.id).expect("wallet");
        assert_eq!(after.balance, 6_000);
        assert_eq!(after.total_spent, 4_000);
    }

    #[test]
    fn test_lecturer_cannot_overdraw_balance() {
        let conn = bursar_db::open_memory().expect("open");
        assert!(matches!(
            request_lecturer_withdrawal(&conn, "lecturer-1", 100, &ACCOUNT, 10),
            Err(SettlementError::UnavailableForWithdrawal {
                available: 0,
                requested: 100
            })
        ));
    }

    #[test]
    fn test_pay_unapproved_moves_no_money() {
        let mut conn = bursar_db::open_memory().expect("open");
        let partner_id = setup_partner_with_earnings(&conn, 5_000);
        let id = request_partner_withdrawal(&conn, "partner-user-1", 5_000, 10).expect("request");

        assert!(matches!(
            mark_withdrawal_paid(&mut conn, id, "admin-1", "TRF-001", 20),
            Err(SettlementError::Db(DbError::Constraint(_)))
        ));
        assert_eq!(
            partners::get(&conn, partner_id).expect("partner").pending_earnings,
            5_000
        );
    }

    #[test]
    fn test_payout_failure_keeps_status_unpaid() {
        // Pending earnings drained between approval and payout: the whole
        // payout rolls back, including the status flip.
        let mut conn = bursar_db::open_memory().expect("open");
        let partner_id = setup_partner_with_earnings(&conn, 5_000);
        let id = request_partner_withdrawal(&conn, "partner-user-1", 5_000, 10).expect("request");
        approve_withdrawal(&conn, id, "admin-1", 20).expect("approve");

        partners::settle_pending_earnings(&conn, partner_id, 5_000, 25).expect("drain");

        assert!(mark_withdrawal_paid(&mut conn, id, "admin-1", "TRF-001", 30).is_err());
        assert_eq!(
            withdrawals::get(&conn, id).expect("get").status,
            WithdrawalStatus::Approved
        );
    }

    #[test]
    fn test_reject_leaves_funds_untouched() {
        let conn = bursar_db::open_memory().expect("open");
        let partner_id = setup_partner_with_earnings(&conn, 5_000);
        let id = request_partner_withdrawal(&conn, "partner-user-1", 5_000, 10).expect("request");
        let rejected = reject_withdrawal(&conn, id, "admin-1", "account mismatch", 20)
            .expect("reject");

        assert_eq!(rejected.status, WithdrawalStatus::Rejected);
        assert_eq!(
            partners::get(&conn, partner_id).expect("partner").pending_earnings,
            5_000
        );
    }
}
