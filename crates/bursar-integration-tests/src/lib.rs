//! Integration test crate for the Bursar settlement subsystem.
//!
//! This crate has no production code — it only contains integration
//! tests that exercise end-to-end money flows across the workspace
//! crates, plus the shared fixtures below.

use bursar_db::queries::{partners, referrals, wallet};
use rusqlite::Connection;

/// Base timestamp for test scenarios.
pub const BASE_TIME: u64 = 1_700_000_000;

/// Create a partner with bank details and a referral covering
/// `lecturer_id`. Returns (partner_id, referral_id).
pub fn setup_partner_with_referral(
    conn: &Connection,
    partner_user_id: &str,
    lecturer_id: &str,
    commission_rate_pct: u8,
) -> (i64, i64) {
    let partner_id = partners::create(
        conn,
        &partners::NewPartner {
            user_id: partner_user_id,
            partner_code: "EDUTECH",
            business_name: "EduTech Ltd",
            commission_rate_pct,
            bank_name: Some("First Bank"),
            account_number: Some("0123456789"),
            account_name: Some("EduTech Ltd"),
        },
        BASE_TIME,
    )
    .expect("partner creation should succeed");
    let referral_id = referrals::create(conn, partner_id, lecturer_id, "EDUTECH", BASE_TIME)
        .expect("referral creation should succeed");
    (partner_id, referral_id)
}

/// Credit a user's wallet directly, bypassing the gateway.
pub fn fund_wallet(conn: &Connection, user_id: &str, amount: u64) -> i64 {
    let w = wallet::get_or_create(conn, user_id, BASE_TIME).expect("wallet");
    wallet::credit(
        conn,
        w.id,
        amount,
        wallet::CreditKind::Funding,
        "test funding",
        None,
        BASE_TIME,
    )
    .expect("credit should succeed");
    w.id
}
