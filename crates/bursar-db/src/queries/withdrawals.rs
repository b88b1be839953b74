//! Withdrawal request queries.
//!
//! State machine: pending → approved → paid, or pending → rejected. Each
//! transition is a conditional UPDATE guarded on the current status, so an
//! out-of-order call fails instead of silently rewriting history. Money
//! only moves at mark_paid, and the settlement layer does that move in the
//! same transaction.

use bursar_types::status::{WithdrawalRequester, WithdrawalStatus};
use rusqlite::{Connection, OptionalExtension};

use crate::{DbError, Result};

/// A withdrawal request row.
#[derive(Clone, Debug)]
pub struct WithdrawalRow {
    pub id: i64,
    pub requester_type: WithdrawalRequester,
    pub requester_id: String,
    pub amount: u64,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
    pub status: WithdrawalStatus,
    pub requested_at: u64,
    pub reviewed_at: Option<u64>,
    pub reviewed_by: Option<String>,
    pub review_note: Option<String>,
    pub paid_at: Option<u64>,
    pub paid_by: Option<String>,
    pub payment_reference: Option<String>,
}

/// Destination bank account for a payout.
#[derive(Clone, Debug)]
pub struct BankAccount<'a> {
    pub bank_name: &'a str,
    pub account_number: &'a str,
    pub account_name: &'a str,
}

const COLUMNS: &str = "id, requester_type, requester_id, amount, bank_name, account_number,
     account_name, status, requested_at, reviewed_at, reviewed_by, review_note,
     paid_at, paid_by, payment_reference";

/// File a withdrawal request, status pending.
pub fn create(
    conn: &Connection,
    requester_type: WithdrawalRequester,
    requester_id: &str,
    amount: u64,
    account: &BankAccount<'_>,
    now: u64,
) -> Result<i64> {
    if amount == 0 {
        return Err(DbError::InvalidAmount);
    }
    conn.execute(
        "INSERT INTO withdrawal_requests
             (requester_type, requester_id, amount, bank_name, account_number,
              account_name, requested_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            requester_type.as_str(),
            requester_id,
            amount as i64,
            account.bank_name,
            account.account_number,
            account.account_name,
            now as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get a withdrawal request by id.
pub fn get(conn: &Connection, withdrawal_id: i64) -> Result<WithdrawalRow> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM withdrawal_requests WHERE id = ?1"),
        [withdrawal_id],
        row_to_withdrawal,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("withdrawal {withdrawal_id}")))
}

/// Approve a pending request.
pub fn approve(conn: &Connection, withdrawal_id: i64, reviewer: &str, now: u64) -> Result<()> {
    transition(
        conn,
        withdrawal_id,
        WithdrawalStatus::Pending,
        "UPDATE withdrawal_requests
         SET status = 'approved', reviewed_at = ?1, reviewed_by = ?2
         WHERE id = ?3 AND status = 'pending'",
        rusqlite::params![now as i64, reviewer, withdrawal_id],
    )
}

/// Reject a pending request with a note.
pub fn reject(
    conn: &Connection,
    withdrawal_id: i64,
    reviewer: &str,
    note: &str,
    now: u64,
) -> Result<()> {
    transition(
        conn,
        withdrawal_id,
        WithdrawalStatus::Pending,
        "UPDATE withdrawal_requests
         SET status = 'rejected', reviewed_at = ?1, reviewed_by = ?2, review_note = ?3
         WHERE id = ?4 AND status = 'pending'",
        rusqlite::params![now as i64, reviewer, note, withdrawal_id],
    )
}

/// Mark an approved request paid, recording who paid and the bank
/// transfer reference.
pub fn mark_paid(
    conn: &Connection,
    withdrawal_id: i64,
    payer: &str,
    payment_reference: &str,
    now: u64,
) -> Result<()> {
    transition(
        conn,
        withdrawal_id,
        WithdrawalStatus::Approved,
        "UPDATE withdrawal_requests
         SET status = 'paid', paid_at = ?1, paid_by = ?2, payment_reference = ?3
         WHERE id = ?4 AND status = 'approved'",
        rusqlite::params![now as i64, payer, payment_reference, withdrawal_id],
    )
}

/// Requests filed by one requester, newest first.
pub fn list_for_requester(
    conn: &Connection,
    requester_type: WithdrawalRequester,
    requester_id: &str,
) -> Result<Vec<WithdrawalRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM withdrawal_requests
         WHERE requester_type = ?1 AND requester_id = ?2
         ORDER BY requested_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(
        rusqlite::params![requester_type.as_str(), requester_id],
        row_to_withdrawal,
    )?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::Sqlite)
}

/// All requests in a given state, oldest first (review queue order).
pub fn list_by_status(conn: &Connection, status: WithdrawalStatus) -> Result<Vec<WithdrawalRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM withdrawal_requests
         WHERE status = ?1
         ORDER BY requested_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map([status.as_str()], row_to_withdrawal)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::Sqlite)
}

fn transition(
    conn: &Connection,
    withdrawal_id: i64,
    expected: WithdrawalStatus,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<()> {
    let updated = conn.execute(sql, params)?;
    if updated == 0 {
        // Either missing or not in the expected state.
        let current = get(conn, withdrawal_id)?;
        return Err(DbError::Constraint(format!(
            "withdrawal {withdrawal_id} is '{}', expected '{}'",
            current.status.as_str(),
            expected.as_str()
        )));
    }
    Ok(())
}

fn row_to_withdrawal(row: &rusqlite::Row<'_>) -> rusqlite::Result<WithdrawalRow> {
    let requester_type: String = row.get(1)?;
    let requester_type = WithdrawalRequester::parse(&requester_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown requester type '{requester_type}'").into(),
        )
    })?;
    let status: String = row.get(7)?;
    let status = WithdrawalStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("unknown withdrawal status '{status}'").into(),
        )
    })?;
    Ok(WithdrawalRow {
        id: row.get(0)?,
        requester_type,
        requester_id: row.get(2)?,
        amount: row.get::<_, i64>(3)? as u64,
        bank_name: row.get(4)?,
        account_number: row.get(5)?,
        account_name: row.get(6)?,
        status,
        requested_at: row.get::<_, i64>(8)? as u64,
        reviewed_at: row.get::<_, Option<i64>>(9)?.map(|v| v as u64),
        reviewed_by: row.get(10)?,
        review_note: row.get(11)?,
        paid_at: row.get::<_, Option<i64>>(12)?.map(|v| v as u64),
        paid_by: row.get(13)?,
        payment_reference: row.get(14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: BankAccount<'static> = BankAccount {
        bank_name: "First Bank",
        account_number: "0123456789",
        account_name: "A. Partner",
    };

    fn file_request(conn: &Connection) -> i64 {
        create(
            conn,
            WithdrawalRequester::Partner,
            "partner-user-1",
            5_000,
            &ACCOUNT,
            100,
        )
        .expect("create")
    }

    #[test]
    fn test_lifecycle_to_paid() {
        let conn = crate::open_memory().expect("open");
        let id = file_request(&conn);
        assert_eq!(get(&conn, id).expect("get").status, WithdrawalStatus::Pending);

        approve(&conn, id, "admin-1", 200).expect("approve");
        let approved = get(&conn, id).expect("get");
        assert_eq!(approved.status, WithdrawalStatus::Approved);
        assert_eq!(approved.reviewed_by.as_deref(), Some("admin-1"));

        mark_paid(&conn, id, "admin-2", "TRF-001", 300).expect("pay");
        let paid = get(&conn, id).expect("get");
        assert_eq!(paid.status, WithdrawalStatus::Paid);
        assert_eq!(paid.payment_reference.as_deref(), Some("TRF-001"));
        assert_eq!(paid.paid_at, Some(300));
    }

    #[test]
    fn test_reject_is_terminal() {
        let conn = crate::open_memory().expect("open");
        let id = file_request(&conn);
        reject(&conn, id, "admin-1", "unverified account", 200).expect("reject");

        assert!(matches!(
            approve(&conn, id, "admin-1", 300),
            Err(DbError::Constraint(_))
        ));
        let row = get(&conn, id).expect("get");
        assert_eq!(row.status, WithdrawalStatus::Rejected);
        assert_eq!(row.review_note.as_deref(), Some("unverified account"));
    }

    #[test]
    fn test_pay_requires_approval() {
        let conn = crate::open_memory().expect("open");
        let id = file_request(&conn);
        assert!(matches!(
            mark_paid(&conn, id, "admin-1", "TRF-001", 200),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_double_approve_rejected() {
        let conn = crate::open_memory().expect("open");
        let id = file_request(&conn);
        approve(&conn, id, "admin-1", 200).expect("approve");
        assert!(matches!(
            approve(&conn, id, "admin-1", 300),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_listing() {
        let conn = crate::open_memory().expect("open");
        let first = file_request(&conn);
        let second = create(
            &conn,
            WithdrawalRequester::Partner,
            "partner-user-1",
            2_000,
            &ACCOUNT,
            200,
        )
        .expect("create");

        let mine = list_for_requester(&conn, WithdrawalRequester::Partner, "partner-user-1")
            .expect("list");
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, second);

        let queue = list_by_status(&conn, WithdrawalStatus::Pending).expect("list");
        assert_eq!(queue[0].id, first);
        assert!(list_for_requester(&conn, WithdrawalRequester::Lecturer, "partner-user-1")
            .expect("list")
            .is_empty());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let conn = crate::open_memory().expect("open");
        assert!(matches!(
            create(&conn, WithdrawalRequester::Lecturer, "l-1", 0, &ACCOUNT, 0),
            Err(DbError::InvalidAmount)
        ));
    }
}
