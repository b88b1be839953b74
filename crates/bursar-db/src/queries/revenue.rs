//! Platform revenue records.
//!
//! The platform's share of each settlement is booked here for reporting;
//! there is no platform wallet.

use bursar_types::status::EarningSource;
use rusqlite::Connection;

use crate::{DbError, Result};

/// Book the platform's share of a settled fee.
pub fn record(
    conn: &Connection,
    source: EarningSource,
    source_id: &str,
    amount: u64,
    now: u64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO platform_revenue (source_type, source_id, amount, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![source.as_str(), source_id, amount as i64, now as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Total platform revenue booked so far, in kobo.
pub fn total(conn: &Connection) -> Result<u64> {
    conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM platform_revenue",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map(|v| v as u64)
    .map_err(DbError::Sqlite)
}
