//! Partner earning records.
//!
//! One row per settled submission that carried a partner attribution. The
//! rows are the audit trail behind the `pending_earnings` balance on the
//! partner row.

use bursar_types::status::{EarningSource, EarningStatus};
use rusqlite::Connection;

use crate::{DbError, Result};

/// Fields for recording an earning at settlement time.
#[derive(Clone, Debug)]
pub struct NewEarning<'a> {
    pub partner_id: i64,
    pub referral_id: i64,
    /// Ledger entry of the student debit this earning derives from.
    pub transaction_id: Option<i64>,
    pub source: EarningSource,
    pub source_id: &'a str,
    /// Gross fee the student paid, in kobo.
    pub source_amount: u64,
    /// Lecturer's share of the same fee, in kobo.
    pub lecturer_amount: u64,
    pub commission_rate_pct: u8,
    /// The partner's commission, in kobo.
    pub amount: u64,
}

/// A partner earning row.
#[derive(Clone, Debug)]
pub struct EarningRow {
    pub id: i64,
    pub partner_id: i64,
    pub referral_id: i64,
    pub transaction_id: Option<i64>,
    pub source: EarningSource,
    pub source_id: String,
    pub source_amount: u64,
    pub lecturer_amount: u64,
    pub commission_rate_pct: u8,
    pub amount: u64,
    pub status: EarningStatus,
    pub withdrawal_id: Option<i64>,
    pub created_at: u64,
}

/// Totals over a partner's earning rows.
#[derive(Clone, Copy, Debug, Default)]
pub struct EarningsSummary {
    pub total: u64,
    pub pending: u64,
    pub withdrawn: u64,
    pub count: u64,
}

const COLUMNS: &str = "id, partner_id, referral_id, transaction_id, source_type, source_id,
     source_amount, lecturer_amount, commission_rate_pct, amount, status,
     withdrawal_id, created_at";

/// Record a commission earning, status pending.
pub fn record(conn: &Connection, earning: &NewEarning<'_>, now: u64) -> Result<i64> {
    if earning.amount == 0 {
        return Err(DbError::InvalidAmount);
    }
    conn.execute(
        "INSERT INTO partner_earnings
             (partner_id, referral_id, transaction_id, source_type, source_id,
              source_amount, lecturer_amount, commission_rate_pct, amount, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            earning.partner_id,
            earning.referral_id,
            earning.transaction_id,
            earning.source.as_str(),
            earning.source_id,
            earning.source_amount as i64,
            earning.lecturer_amount as i64,
            earning.commission_rate_pct,
            earning.amount as i64,
            now as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Earnings for a partner, newest first.
pub fn list_for_partner(conn: &Connection, partner_id: i64, limit: u32) -> Result<Vec<EarningRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM partner_earnings
         WHERE partner_id = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    ))?;
    let rows = stmt.query_map(rusqlite::params![partner_id, limit], row_to_earning)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::Sqlite)
}

/// Aggregate totals for a partner.
pub fn summary_for_partner(conn: &Connection, partner_id: i64) -> Result<EarningsSummary> {
    conn.query_row(
        "SELECT COALESCE(SUM(amount), 0),
                COALESCE(SUM(CASE WHEN status = 'pending' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'withdrawn' THEN amount ELSE 0 END), 0),
                COUNT(*)
         FROM partner_earnings WHERE partner_id = ?1",
        [partner_id],
        |row| {
            Ok(EarningsSummary {
                total: row.get::<_, i64>(0)? as u64,
                pending: row.get::<_, i64>(1)? as u64,
                withdrawn: row.get::<_, i64>(2)? as u64,
                count: row.get::<_, i64>(3)? as u64,
            })
        },
    )
    .map_err(DbError::Sqlite)
}

/// Consume a partner's pending earnings oldest-first to cover a paid
/// withdrawal, flipping the covered rows to withdrawn tagged with the
/// withdrawal that paid them. A row straddling the paid amount is split:
/// the covered part is withdrawn, the remainder stays pending as a new
/// row sharing the original's source fields. The sum of withdrawn rows
/// therefore always equals the amounts actually paid out. Returns how
/// many rows were flipped.
///
/// # Errors
///
/// [`DbError::Constraint`] if the pending rows cannot cover `amount`;
/// the rows and the `pending_earnings` balance have diverged and the
/// payout must not proceed.
pub fn consume_pending(
    conn: &Connection,
    partner_id: i64,
    amount: u64,
    withdrawal_id: i64,
) -> Result<usize> {
    if amount == 0 {
        return Err(DbError::InvalidAmount);
    }

    let rows: Vec<(i64, u64)> = {
        let mut stmt = conn.prepare(
            "SELECT id, amount FROM partner_earnings
             WHERE partner_id = ?1 AND status = 'pending'
             ORDER BY created_at ASC, id ASC",
        )?;
        let mapped = stmt.query_map([partner_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)? as u64))
        })?;
        mapped.collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut remaining = amount;
    let mut flipped = 0usize;
    for (id, row_amount) in rows {
        if remaining == 0 {
            break;
        }
        if row_amount <= remaining {
            conn.execute(
                "UPDATE partner_earnings
                 SET status = 'withdrawn', withdrawal_id = ?1
                 WHERE id = ?2",
                rusqlite::params![withdrawal_id, id],
            )?;
            remaining -= row_amount;
        } else {
            // Straddling row: keep the unpaid remainder pending under a
            // new row, withdraw the covered part in place.
            conn.execute(
                "INSERT INTO partner_earnings
                     (partner_id, referral_id, transaction_id, source_type, source_id,
                      source_amount, lecturer_amount, commission_rate_pct, amount, created_at)
                 SELECT partner_id, referral_id, transaction_id, source_type, source_id,
                        source_amount, lecturer_amount, commission_rate_pct, ?1, created_at
                 FROM partner_earnings WHERE id = ?2",
                rusqlite::params![(row_amount - remaining) as i64, id],
            )?;
            conn.execute(
                "UPDATE partner_earnings
                 SET amount = ?1, status = 'withdrawn', withdrawal_id = ?2
                 WHERE id = ?3",
                rusqlite::params![remaining as i64, withdrawal_id, id],
            )?;
            remaining = 0;
        }
        flipped += 1;
    }

    if remaining > 0 {
        return Err(DbError::Constraint(format!(
            "pending earning rows for partner {partner_id} cover only {} of {amount}",
            amount - remaining
        )));
    }
    Ok(flipped)
}

fn row_to_earning(row: &rusqlite::Row<'_>) -> rusqlite::Result<EarningRow> {
    let source: String = row.get(4)?;
    let source = EarningSource::parse(&source).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown earning source '{source}'").into(),
        )
    })?;
    let status: String = row.get(10)?;
    let status = EarningStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            10,
            rusqlite::types::Type::Text,
            format!("unknown earning status '{status}'").into(),
        )
    })?;
    Ok(EarningRow {
        id: row.get(0)?,
        partner_id: row.get(1)?,
        referral_id: row.get(2)?,
        transaction_id: row.get(3)?,
        source,
        source_id: row.get(5)?,
        source_amount: row.get::<_, i64>(6)? as u64,
        lecturer_amount: row.get::<_, i64>(7)? as u64,
        commission_rate_pct: row.get::<_, i64>(8)? as u8,
        amount: row.get::<_, i64>(9)? as u64,
        status,
        withdrawal_id: row.get(11)?,
        created_at: row.get::<_, i64>(12)? as u64,
    })
}
