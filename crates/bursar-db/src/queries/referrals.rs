//! Referral link queries.
//!
//! A referral ties one lecturer to the partner who recruited them. A
//! lecturer can be referred at most once (UNIQUE lecturer_id); settlement
//! maintains the per-referral aggregates.

use rusqlite::{Connection, OptionalExtension};

use crate::{map_unique_violation, DbError, Result};

/// A referral row.
#[derive(Clone, Debug)]
pub struct ReferralRow {
    pub id: i64,
    pub partner_id: i64,
    pub lecturer_id: String,
    pub referral_code: String,
    pub active: bool,
    pub total_submissions: u64,
    pub total_revenue: u64,
    pub partner_earnings: u64,
    pub first_submission_at: Option<u64>,
    pub last_submission_at: Option<u64>,
    pub created_at: u64,
}

const COLUMNS: &str = "id, partner_id, lecturer_id, referral_code, status, total_submissions,
     total_revenue, partner_earnings, first_submission_at, last_submission_at, created_at";

/// Register a lecturer under a partner.
pub fn create(
    conn: &Connection,
    partner_id: i64,
    lecturer_id: &str,
    referral_code: &str,
    now: u64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO referrals (partner_id, lecturer_id, referral_code, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![partner_id, lecturer_id, referral_code, now as i64],
    )
    .map_err(|e| {
        map_unique_violation(e, "referrals.lecturer_id", || {
            DbError::Constraint(format!("lecturer '{lecturer_id}' is already referred"))
        })
    })?;
    Ok(conn.last_insert_rowid())
}

/// Get a referral by id.
pub fn get(conn: &Connection, referral_id: i64) -> Result<ReferralRow> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM referrals WHERE id = ?1"),
        [referral_id],
        row_to_referral,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("referral {referral_id}")))
}

/// Find the referral covering a lecturer, if any.
pub fn find_by_lecturer(conn: &Connection, lecturer_id: &str) -> Result<Option<ReferralRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM referrals WHERE lecturer_id = ?1"),
            [lecturer_id],
            row_to_referral,
        )
        .optional()?;
    Ok(row)
}

/// All referrals brought in by a partner.
pub fn list_for_partner(conn: &Connection, partner_id: i64) -> Result<Vec<ReferralRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM referrals WHERE partner_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map([partner_id], row_to_referral)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::Sqlite)
}

/// Fold a settled submission into the referral's aggregates.
pub fn record_settled_submission(
    conn: &Connection,
    referral_id: i64,
    revenue: u64,
    earnings: u64,
    now: u64,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE referrals
         SET total_submissions = total_submissions + 1,
             total_revenue = total_revenue + ?1,
             partner_earnings = partner_earnings + ?2,
             first_submission_at = COALESCE(first_submission_at, ?3),
             last_submission_at = ?3
         WHERE id = ?4",
        rusqlite::params![revenue as i64, earnings as i64, now as i64, referral_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("referral {referral_id}")));
    }
    Ok(())
}

fn row_to_referral(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReferralRow> {
    let status: String = row.get(4)?;
    Ok(ReferralRow {
        id: row.get(0)?,
        partner_id: row.get(1)?,
        lecturer_id: row.get(2)?,
        referral_code: row.get(3)?,
        active: status == "active",
        total_submissions: row.get::<_, i64>(5)? as u64,
        total_revenue: row.get::<_, i64>(6)? as u64,
        partner_earnings: row.get::<_, i64>(7)? as u64,
        first_submission_at: row.get::<_, Option<i64>>(8)?.map(|v| v as u64),
        last_submission_at: row.get::<_, Option<i64>>(9)?.map(|v| v as u64),
        created_at: row.get::<_, i64>(10)? as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::partners::{self, NewPartner};

    fn setup_partner(conn: &Connection) -> i64 {
        partners::create(
            conn,
            &NewPartner {
                user_id: "partner-user-1",
                partner_code: "EDUTECH",
                business_name: "EduTech Ltd",
                commission_rate_pct: 15,
                bank_name: None,
                account_number: None,
                account_name: None,
            },
            0,
        )
        .expect("partner")
    }

    #[test]
    fn test_create_and_lookup() {
        let conn = crate::open_memory().expect("open");
        let partner_id = setup_partner(&conn);
        let id = create(&conn, partner_id, "lecturer-1", "EDUTECH", 10).expect("create");

        let referral = get(&conn, id).expect("get");
        assert!(referral.active);
        assert_eq!(referral.total_submissions, 0);
        assert!(referral.first_submission_at.is_none());

        let by_lecturer = find_by_lecturer(&conn, "lecturer-1")
            .expect("query")
            .expect("row");
        assert_eq!(by_lecturer.id, id);
    }

    #[test]
    fn test_lecturer_referred_once() {
        let conn = crate::open_memory().expect("open");
        let partner_id = setup_partner(&conn);
        create(&conn, partner_id, "lecturer-1", "EDUTECH", 10).expect("first");
        assert!(matches!(
            create(&conn, partner_id, "lecturer-1", "EDUTECH", 20),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_aggregates_accumulate() {
        let conn = crate::open_memory().expect("open");
        let partner_id = setup_partner(&conn);
        let id = create(&conn, partner_id, "lecturer-1", "EDUTECH", 10).expect("create");

        record_settled_submission(&conn, id, 200, 30, 100).expect("first");
        record_settled_submission(&conn, id, 200, 30, 200).expect("second");

        let referral = get(&conn, id).expect("get");
        assert_eq!(referral.total_submissions, 2);
        assert_eq!(referral.total_revenue, 400);
        assert_eq!(referral.partner_earnings, 60);
        assert_eq!(referral.first_submission_at, Some(100));
        assert_eq!(referral.last_submission_at, Some(200));
    }

    #[test]
    fn test_missing_referral() {
        let conn = crate::open_memory().expect("open");
        assert!(matches!(
            record_settled_submission(&conn, 9, 100, 10, 0),
            Err(DbError::NotFound(_))
        ));
    }
}
