//! Integration test: economic correctness of submission settlement.
//!
//! Exercises the complete fee lifecycle:
//! 1. Fund a student wallet
//! 2. Settle submissions with and without a referring partner
//! 3. Verify the three-way split and that no kobo leaks
//! 4. Verify partner accrual, referral aggregates, and platform revenue
//! 5. Commission rate changes apply to future settlements only

use bursar_db::queries::{earnings, partners, referrals, revenue, wallet};
use bursar_integration_tests::{fund_wallet, setup_partner_with_referral, BASE_TIME};
use bursar_settlement::{settle_submission, SubmissionFee};
use bursar_types::status::EarningSource;

fn submission_fee<'a>(source_id: &'a str, amount: u64) -> SubmissionFee<'a> {
    SubmissionFee {
        student_id: "student-1",
        lecturer_id: "lecturer-1",
        amount,
        source: EarningSource::AssignmentSubmission,
        source_id,
        description: "assignment submission fee",
    }
}

#[test]
fn settlement_splits_three_ways_with_partner() {
    let mut conn = bursar_db::open_memory().expect("open DB");
    fund_wallet(&conn, "student-1", 10_000);
    let (partner_id, referral_id) =
        setup_partner_with_referral(&conn, "partner-user-1", "lecturer-1", 15);

    // 200 kobo fee: lecturer 50% = 100, partner 15% = 30, platform = 70.
    let receipt =
        settle_submission(&mut conn, &submission_fee("sub-1", 200), BASE_TIME).expect("settle");
    assert_eq!(receipt.split.lecturer, 100);
    assert_eq!(receipt.split.partner, 30);
    assert_eq!(receipt.split.platform, 70);
    assert_eq!(receipt.split.total(), 200);

    let student = wallet::find_by_user(&conn, "student-1").expect("q").expect("w");
    let lecturer = wallet::find_by_user(&conn, "lecturer-1").expect("q").expect("w");
    assert_eq!(student.balance, 9_800);
    assert_eq!(student.total_spent, 200);
    assert_eq!(lecturer.balance, 100);
    assert_eq!(lecturer.total_earned, 100);

    assert_eq!(partners::get(&conn, partner_id).expect("p").pending_earnings, 30);
    let referral = referrals::get(&conn, referral_id).expect("r");
    assert_eq!(referral.total_submissions, 1);
    assert_eq!(referral.total_revenue, 200);
    assert_eq!(revenue::total(&conn).expect("rev"), 70);
}

#[test]
fn settlement_without_partner_gives_remainder_to_platform() {
    let mut conn = bursar_db::open_memory().expect("open DB");
    fund_wallet(&conn, "student-1", 10_000);

    let receipt =
        settle_submission(&mut conn, &submission_fee("sub-1", 200), BASE_TIME).expect("settle");
    assert_eq!(receipt.split.lecturer, 100);
    assert_eq!(receipt.split.partner, 0);
    assert_eq!(receipt.split.platform, 100);
    assert!(receipt.earning_id.is_none());
    assert_eq!(revenue::total(&conn).expect("rev"), 100);
}

#[test]
fn no_kobo_leaks_across_many_settlements() {
    let mut conn = bursar_db::open_memory().expect("open DB");
    fund_wallet(&conn, "student-1", 1_000_000);
    let (partner_id, _) = setup_partner_with_referral(&conn, "partner-user-1", "lecturer-1", 15);

    // Awkward amounts that all force rounding somewhere.
    let fees = [33u64, 99, 101, 199, 257, 999, 1_003];
    let mut total_spent = 0u64;
    for (n, amount) in fees.iter().enumerate() {
        let source_id = format!("sub-{n}");
        let fee = SubmissionFee {
            source_id: &source_id,
            ..submission_fee("", *amount)
        };
        let receipt = settle_submission(&mut conn, &fee, BASE_TIME + n as u64).expect("settle");
        assert_eq!(receipt.split.total(), *amount, "leak at amount {amount}");
        total_spent += amount;
    }

    let student = wallet::find_by_user(&conn, "student-1").expect("q").expect("w");
    let lecturer = wallet::find_by_user(&conn, "lecturer-1").expect("q").expect("w");
    let partner = partners::get(&conn, partner_id).expect("p");
    let platform = revenue::total(&conn).expect("rev");

    assert_eq!(student.balance, 1_000_000 - total_spent);
    assert_eq!(
        lecturer.balance + partner.pending_earnings + platform,
        total_spent,
        "money must be conserved across all accounts"
    );
}

#[test]
fn rate_change_applies_to_future_settlements_only() {
    let mut conn = bursar_db::open_memory().expect("open DB");
    fund_wallet(&conn, "student-1", 10_000);
    let (partner_id, _) = setup_partner_with_referral(&conn, "partner-user-1", "lecturer-1", 15);

    settle_submission(&mut conn, &submission_fee("sub-1", 1_000), BASE_TIME).expect("first");
    partners::update_commission_rate(&conn, partner_id, 25, BASE_TIME + 10).expect("rate change");
    settle_submission(&mut conn, &submission_fee("sub-2", 1_000), BASE_TIME + 20).expect("second");

    let rows = earnings::list_for_partner(&conn, partner_id, 10).expect("list");
    assert_eq!(rows.len(), 2);
    // Newest first: the second settlement used 25%, the first keeps 15%.
    assert_eq!(rows[0].commission_rate_pct, 25);
    assert_eq!(rows[0].amount, 250);
    assert_eq!(rows[1].commission_rate_pct, 15);
    assert_eq!(rows[1].amount, 150);
}

#[test]
fn suspended_partner_earns_nothing_but_settlement_proceeds() {
    let mut conn = bursar_db::open_memory().expect("open DB");
    fund_wallet(&conn, "student-1", 10_000);
    let (partner_id, _) = setup_partner_with_referral(&conn, "partner-user-1", "lecturer-1", 15);
    partners::update_status(
        &conn,
        partner_id,
        bursar_types::status::PartnerStatus::Suspended,
        BASE_TIME,
    )
    .expect("suspend");

    let receipt =
        settle_submission(&mut conn, &submission_fee("sub-1", 200), BASE_TIME).expect("settle");
    assert!(!receipt.context.has_partner);
    assert_eq!(receipt.split.partner, 0);
    assert_eq!(receipt.split.platform, 100);
    assert_eq!(partners::get(&conn, partner_id).expect("p").pending_earnings, 0);
}

#[test]
fn failed_settlement_leaves_no_trace() {
    let mut conn = bursar_db::open_memory().expect("open DB");
    fund_wallet(&conn, "student-1", 100);
    let (partner_id, referral_id) =
        setup_partner_with_referral(&conn, "partner-user-1", "lecturer-1", 15);

    // Fee exceeds the student's balance; everything must roll back.
    assert!(settle_submission(&mut conn, &submission_fee("sub-1", 500), BASE_TIME).is_err());

    let student = wallet::find_by_user(&conn, "student-1").expect("q").expect("w");
    assert_eq!(student.balance, 100);
    assert!(wallet::find_by_user(&conn, "lecturer-1").expect("q").is_none());
    assert_eq!(partners::get(&conn, partner_id).expect("p").pending_earnings, 0);
    assert_eq!(referrals::get(&conn, referral_id).expect("r").total_submissions, 0);
    assert_eq!(revenue::total(&conn).expect("rev"), 0);
    assert!(earnings::list_for_partner(&conn, partner_id, 10)
        .expect("list")
        .is_empty());
}
