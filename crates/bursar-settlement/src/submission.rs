//! Per-submission fee settlement.
//!
//! One submission, one transaction: the student's debit, the lecturer's
//! credit, the partner accrual, and the platform booking all land
//! together or not at all.

use bursar_db::queries::{earnings, partners, referrals, revenue, wallet};
use bursar_revenue::{split_fee, CommissionContext, FeeSplit};
use bursar_types::money;
use bursar_types::status::EarningSource;
use rusqlite::Connection;

use crate::{commission, with_tx, Result, SettlementError};

/// A graded submission's fee, ready to settle.
#[derive(Clone, Debug)]
pub struct SubmissionFee<'a> {
    pub student_id: &'a str,
    pub lecturer_id: &'a str,
    /// Gross fee in kobo.
    pub amount: u64,
    pub source: EarningSource,
    pub source_id: &'a str,
    pub description: &'a str,
}

/// What a settlement did.
#[derive(Clone, Debug)]
pub struct SettlementReceipt {
    pub split: FeeSplit,
    pub context: CommissionContext,
    pub student_balance: u64,
    pub lecturer_balance: u64,
    /// Recorded partner earning, when a partner was attributed.
    pub earning_id: Option<i64>,
}

/// Settle one submission fee: debit the student, split three ways, credit
/// the lecturer, accrue the partner's commission, book the platform share.
///
/// The commission context is resolved inside the transaction so the rate
/// applied is the partner's rate at this instant. An insufficient student
/// balance aborts the whole settlement.
pub fn settle_submission(
    conn: &mut Connection,
    fee: &SubmissionFee<'_>,
    now: u64,
) -> Result<SettlementReceipt> {
    if fee.student_id == fee.lecturer_id {
        return Err(SettlementError::Validation(
            "student and lecturer cannot be the same user".into(),
        ));
    }

    with_tx(conn, |tx| {
        let student = wallet::get_or_create(tx, fee.student_id, now)?;
        let debit = wallet::debit(tx, student.id, fee.amount, fee.description, now)?;

        let ctx = commission::resolve_partner_context(tx, fee.lecturer_id);
        let split = split_fee(fee.amount, &ctx)?;

        let lecturer = wallet::get_or_create(tx, fee.lecturer_id, now)?;
        let credit = wallet::credit(
            tx,
            lecturer.id,
            split.lecturer,
            wallet::CreditKind::Earning,
            fee.description,
            None,
            now,
        )?;

        let mut earning_id = None;
        if let (Some(partner_id), Some(referral_id)) = (ctx.partner_id, ctx.referral_id) {
            if split.partner > 0 {
                let id = earnings::record(
                    tx,
                    &earnings::NewEarning {
                        partner_id,
                        referral_id,
                        transaction_id: Some(debit.transaction_id),
                        source: fee.source,
                        source_id: fee.source_id,
                        source_amount: fee.amount,
                        lecturer_amount: split.lecturer,
                        commission_rate_pct: ctx.commission_rate_pct,
                        amount: split.partner,
                    },
                    now,
                )?;
                partners::add_pending_earnings(tx, partner_id, split.partner, now)?;
                referrals::record_settled_submission(
                    tx,
                    referral_id,
                    fee.amount,
                    split.partner,
                    now,
                )?;
                earning_id = Some(id);
            }
        }

        revenue::record(tx, fee.source, fee.source_id, split.platform, now)?;

        tracing::info!(
            student_id = fee.student_id,
            lecturer_id = fee.lecturer_id,
            source_id = fee.source_id,
            gross = %money::format_kobo(fee.amount),
            lecturer = split.lecturer,
            partner = split.partner,
            platform = split.platform,
            "submission settled"
        );

        Ok(SettlementReceipt {
            split,
            context: ctx,
            student_balance: debit.balance,
            lecturer_balance: credit.balance,
            earning_id,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bursar_db::queries::partners::NewPartner;
    use bursar_db::queries::transactions;
    use bursar_db::DbError;

    fn fee<'a>(amount: u64) -> SubmissionFee<'a> {
        SubmissionFee {
            student_id: "student-1",
            lecturer_id: "lecturer-1",
            amount,
            source: EarningSource::AssignmentSubmission,
            source_id: "submission-1",
            description: "assignment submission fee",
        }
    }

    fn fund_student(conn: &mut Connection, amount: u64) {
        let w = wallet::get_or_create(conn, "student-1", 0).expect("wallet");
        wallet::credit(conn, w.id, amount, wallet::CreditKind::Funding, "fund", None, 0)
            .expect("credit");
    }

    fn setup_partner(conn: &Connection, rate: u8) -> (i64, i64) {
        let partner_id = partners::create(
            conn,
            &NewPartner {
                user_id: "partner-user-1",
                partner_code: "EDUTECH",
                business_name: "EduTech Ltd",
                commission_rate_pct: rate,
                bank_name: None,
                account_number: None,
                account_name: None,
            },
            0,
        )
        .expect("partner");
        let referral_id =
            referrals::create(conn, partner_id, "lecturer-1", "EDUTECH", 0).expect("referral");
        (partner_id, referral_id)
    }

    #[test]
    fn test_settlement_without_partner() {
        let mut conn = bursar_db::open_memory().expect("open");
        fund_student(&mut conn, 1_000);

        let receipt = settle_submission(&mut conn, &fee(200), 100).expect("settle");
        assert_eq!(receipt.split.lecturer, 100);
        assert_eq!(receipt.split.partner, 0);
        assert_eq!(receipt.split.platform, 100);
        assert_eq!(receipt.student_balance, 800);
        assert_eq!(receipt.lecturer_balance, 100);
        assert!(receipt.earning_id.is_none());

        assert_eq!(revenue::total(&conn).expect("total"), 100);
    }

    #[test]
    fn test_settlement_with_partner() {
        let mut conn = bursar_db::open_memory().expect("open");
        fund_student(&mut conn, 1_000);
        let (partner_id, referral_id) = setup_partner(&conn, 15);

        let receipt = settle_submission(&mut conn, &fee(200), 100).expect("settle");
        assert_eq!(receipt.split.lecturer, 100);
        assert_eq!(receipt.split.partner, 30);
        assert_eq!(receipt.split.platform, 70);
        assert!(receipt.earning_id.is_some());

        let partner = partners::get(&conn, partner_id).expect("partner");
        assert_eq!(partner.pending_earnings, 30);

        let referral = referrals::get(&conn, referral_id).expect("referral");
        assert_eq!(referral.total_submissions, 1);
        assert_eq!(referral.total_revenue, 200);
        assert_eq!(referral.partner_earnings, 30);
        assert_eq!(referral.first_submission_at, Some(100));
    }

    #[test]
    fn test_earning_links_to_student_debit() {
        let mut conn = bursar_db::open_memory().expect("open");
        fund_student(&mut conn, 1_000);
        let (partner_id, _) = setup_partner(&conn, 15);

        settle_submission(&mut conn, &fee(200), 100).expect("settle");
        let earning = &earnings::list_for_partner(&conn, partner_id, 1).expect("list")[0];
        let tx_id = earning.transaction_id.expect("transaction id");

        let student = wallet::find_by_user(&conn, "student-1")
            .expect("query")
            .expect("wallet");
        let recent = transactions::recent_for_wallet(&conn, student.id, 10).expect("recent");
        assert!(recent.iter().any(|t| t.id == tx_id));
        assert_eq!(earning.source_amount, 200);
        assert_eq!(earning.lecturer_amount, 100);
    }

    #[test]
    fn test_insufficient_balance_rolls_back_everything() {
        let mut conn = bursar_db::open_memory().expect("open");
        fund_student(&mut conn, 100);
        let (partner_id, referral_id) = setup_partner(&conn, 15);

        let result = settle_submission(&mut conn, &fee(200), 100);
        assert!(matches!(
            result,
            Err(SettlementError::Db(DbError::InsufficientBalance {
                available: 100,
                required: 200
            }))
        ));

        assert!(wallet::find_by_user(&conn, "lecturer-1")
            .expect("query")
            .is_none());
        assert_eq!(partners::get(&conn, partner_id).expect("p").pending_earnings, 0);
        assert_eq!(referrals::get(&conn, referral_id).expect("r").total_submissions, 0);
        assert_eq!(revenue::total(&conn).expect("total"), 0);
    }

    #[test]
    fn test_money_conserved_across_accounts() {
        let mut conn = bursar_db::open_memory().expect("open");
        fund_student(&mut conn, 1_000);
        let (partner_id, _) = setup_partner(&conn, 15);

        for n in 0u64..3 {
            let source_id = format!("submission-{n}");
            let f = SubmissionFee {
                source_id: &source_id,
                ..fee(33)
            };
            settle_submission(&mut conn, &f, 100 + n).expect("settle");
        }

        let student = wallet::find_by_user(&conn, "student-1")
            .expect("q")
            .expect("w");
        let lecturer = wallet::find_by_user(&conn, "lecturer-1")
            .expect("q")
            .expect("w");
        let partner = partners::get(&conn, partner_id).expect("p");
        let platform = revenue::total(&conn).expect("total");

        let spent = 1_000 - student.balance;
        assert_eq!(spent, 99);
        assert_eq!(
            lecturer.balance + partner.pending_earnings + platform,
            spent
        );
    }

    #[test]
    fn test_self_settlement_rejected() {
        let mut conn = bursar_db::open_memory().expect("open");
        let f = SubmissionFee {
            student_id: "user-1",
            lecturer_id: "user-1",
            amount: 200,
            source: EarningSource::TestSubmission,
            source_id: "test-1",
            description: "test fee",
        };
        assert!(matches!(
            settle_submission(&mut conn, &f, 100),
            Err(SettlementError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_fee_rejected_before_any_write() {
        let mut conn = bursar_db::open_memory().expect("open");
        fund_student(&mut conn, 1_000);
        assert!(settle_submission(&mut conn, &fee(0), 100).is_err());

        let student = wallet::find_by_user(&conn, "student-1")
            .expect("q")
            .expect("w");
        assert_eq!(student.balance, 1_000);
    }
}
