//! Ledger audit-row lookups.

use bursar_types::status::TransactionKind;
use rusqlite::{Connection, OptionalExtension};

use crate::{DbError, Result};

/// A wallet ledger entry.
#[derive(Clone, Debug)]
pub struct TransactionRow {
    pub id: i64,
    pub wallet_id: i64,
    pub kind: TransactionKind,
    pub amount: u64,
    pub description: String,
    pub reference: Option<String>,
    pub created_at: u64,
}

const COLUMNS: &str = "id, wallet_id, kind, amount, description, reference, created_at";

/// Find a ledger entry by its external reference.
///
/// The funding flow uses this as its idempotence check before crediting.
pub fn find_by_reference(conn: &Connection, reference: &str) -> Result<Option<TransactionRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM wallet_transactions WHERE reference = ?1"),
            [reference],
            row_to_transaction,
        )
        .optional()?;
    Ok(row)
}

/// Most recent ledger entries for a wallet, newest first.
pub fn recent_for_wallet(
    conn: &Connection,
    wallet_id: i64,
    limit: u32,
) -> Result<Vec<TransactionRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM wallet_transactions
         WHERE wallet_id = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    ))?;
    let rows = stmt.query_map(rusqlite::params![wallet_id, limit], row_to_transaction)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(DbError::Sqlite)
}

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionRow> {
    let kind: String = row.get(2)?;
    let kind = TransactionKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown transaction kind '{kind}'").into(),
        )
    })?;
    Ok(TransactionRow {
        id: row.get(0)?,
        wallet_id: row.get(1)?,
        kind,
        amount: row.get::<_, i64>(3)? as u64,
        description: row.get(4)?,
        reference: row.get(5)?,
        created_at: row.get::<_, i64>(6)? as u64,
    })
}
