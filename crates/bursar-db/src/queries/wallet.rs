//! Wallet ledger query functions.
//!
//! Credit and debit mutate the balance and append the audit row as one
//! unit; callers must run them inside a transaction ([`crate::with_tx`])
//! so a failure in either step applies neither. The insufficient-balance
//! check is a conditional `UPDATE ... WHERE balance >= amount` re-checked
//! by the database, so concurrent debits can never both succeed.

use rusqlite::{Connection, OptionalExtension};

use crate::{map_unique_violation, DbError, Result};

/// Which cumulative counter a credit feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreditKind {
    /// Money paid in through the payment gateway (`total_funded`).
    Funding,
    /// A revenue share settled to this wallet (`total_earned`).
    Earning,
}

/// A wallet row.
#[derive(Clone, Debug)]
pub struct WalletRow {
    pub id: i64,
    pub user_id: String,
    pub balance: u64,
    pub total_funded: u64,
    pub total_spent: u64,
    pub total_earned: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Result of a ledger mutation: the audit row id and the new balance.
#[derive(Clone, Copy, Debug)]
pub struct LedgerEntry {
    pub transaction_id: i64,
    pub balance: u64,
}

/// Get the wallet for a user, creating a zero-balance one on first access.
///
/// `INSERT OR IGNORE` against the UNIQUE(user_id) constraint makes the
/// first-access race benign: the loser of the race falls through to the
/// select and uses the existing wallet.
pub fn get_or_create(conn: &Connection, user_id: &str, now: u64) -> Result<WalletRow> {
    conn.execute(
        "INSERT OR IGNORE INTO wallets (user_id, created_at, updated_at)
         VALUES (?1, ?2, ?2)",
        rusqlite::params![user_id, now as i64],
    )?;
    find_by_user(conn, user_id)?
        .ok_or_else(|| DbError::NotFound(format!("wallet for user '{user_id}'")))
}

/// Get a wallet by id.
pub fn get(conn: &Connection, wallet_id: i64) -> Result<WalletRow> {
    conn.query_row(
        "SELECT id, user_id, balance, total_funded, total_spent, total_earned,
                created_at, updated_at
         FROM wallets WHERE id = ?1",
        [wallet_id],
        row_to_wallet,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("wallet {wallet_id}")))
}

/// Find a wallet by owning user, without creating one.
pub fn find_by_user(conn: &Connection, user_id: &str) -> Result<Option<WalletRow>> {
    let row = conn
        .query_row(
            "SELECT id, user_id, balance, total_funded, total_spent, total_earned,
                    created_at, updated_at
             FROM wallets WHERE user_id = ?1",
            [user_id],
            row_to_wallet,
        )
        .optional()?;
    Ok(row)
}

/// Credit a wallet and append the audit row.
///
/// # Errors
///
/// - [`DbError::InvalidAmount`] if `amount` is zero
/// - [`DbError::NotFound`] if the wallet does not exist
/// - [`DbError::DuplicateReference`] if `reference` already has a ledger
///   entry (the funding idempotence key)
pub fn credit(
    conn: &Connection,
    wallet_id: i64,
    amount: u64,
    kind: CreditKind,
    description: &str,
    reference: Option<&str>,
    now: u64,
) -> Result<LedgerEntry> {
    if amount == 0 {
        return Err(DbError::InvalidAmount);
    }

    // Audit row first: a duplicate reference must abort before any
    // balance change.
    conn.execute(
        "INSERT INTO wallet_transactions (wallet_id, kind, amount, description, reference, created_at)
         VALUES (?1, 'credit', ?2, ?3, ?4, ?5)",
        rusqlite::params![wallet_id, amount as i64, description, reference, now as i64],
    )
    .map_err(|e| {
        map_unique_violation(e, "wallet_transactions.reference", || {
            DbError::DuplicateReference(reference.unwrap_or_default().to_string())
        })
    })?;
    let transaction_id = conn.last_insert_rowid();

    let counter = match kind {
        CreditKind::Funding => "total_funded",
        CreditKind::Earning => "total_earned",
    };
    let updated = conn.execute(
        &format!(
            "UPDATE wallets
             SET balance = balance + ?1, {counter} = {counter} + ?1, updated_at = ?2
             WHERE id = ?3"
        ),
        rusqlite::params![amount as i64, now as i64, wallet_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("wallet {wallet_id}")));
    }

    Ok(LedgerEntry {
        transaction_id,
        balance: get(conn, wallet_id)?.balance,
    })
}

/// Debit a wallet and append the audit row.
///
/// The balance check and decrement are one conditional UPDATE; a debit
/// never drives the balance negative.
///
/// # Errors
///
/// - [`DbError::InvalidAmount`] if `amount` is zero
/// - [`DbError::NotFound`] if the wallet does not exist
/// - [`DbError::InsufficientBalance`] if `balance < amount`
pub fn debit(
    conn: &Connection,
    wallet_id: i64,
    amount: u64,
    description: &str,
    now: u64,
) -> Result<LedgerEntry> {
    if amount == 0 {
        return Err(DbError::InvalidAmount);
    }

    let updated = conn.execute(
        "UPDATE wallets
         SET balance = balance - ?1, total_spent = total_spent + ?1, updated_at = ?2
         WHERE id = ?3 AND balance >= ?1",
        rusqlite::params![amount as i64, now as i64, wallet_id],
    )?;
    if updated == 0 {
        // Distinguish a missing wallet from a short balance.
        let wallet = get(conn, wallet_id)?;
        return Err(DbError::InsufficientBalance {
            available: wallet.balance,
            required: amount,
        });
    }

    conn.execute(
        "INSERT INTO wallet_transactions (wallet_id, kind, amount, description, created_at)
         VALUES (?1, 'debit', ?2, ?3, ?4)",
        rusqlite::params![wallet_id, amount as i64, description, now as i64],
    )?;

    Ok(LedgerEntry {
        transaction_id: conn.last_insert_rowid(),
        balance: get(conn, wallet_id)?.balance,
    })
}

fn row_to_wallet(row: &rusqlite::Row<'_>) -> rusqlite::Result<WalletRow> {
    Ok(WalletRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        balance: row.get::<_, i64>(2)? as u64,
        total_funded: row.get::<_, i64>(3)? as u64,
        total_spent: row.get::<_, i64>(4)? as u64,
        total_earned: row.get::<_, i64>(5)? as u64,
        created_at: row.get::<_, i64>(6)? as u64,
        updated_at: row.get::<_, i64>(7)? as u64,
    })
}
