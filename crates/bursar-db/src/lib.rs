//! # bursar-db
//!
//! SQLite persistence layer for the settlement subsystem. Owns the
//! schema, forward-only migrations, and all query functions, including
//! the wallet ledger's atomic credit/debit.
//!
//! - WAL mode mandatory
//! - Foreign keys enforced
//! - All timestamps are Unix epoch seconds (u64)
//! - Schema version stored in `PRAGMA user_version`
//!
//! Mutating ledger operations must run inside a transaction; callers
//! compose multi-step settlements with [`with_tx`], which commits on `Ok`
//! and rolls everything back on `Err`.

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Ledger amounts must be strictly positive.
    #[error("invalid amount: must be greater than zero")]
    InvalidAmount,

    /// A debit (or earnings deduction) would drive the balance negative.
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance {
        /// Available balance in kobo.
        available: u64,
        /// Required amount in kobo.
        required: u64,
    },

    /// A ledger entry with this external reference already exists. The
    /// funding flow treats this as "already recorded", not a failure.
    #[error("duplicate external reference: {0}")]
    DuplicateReference(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the Bursar database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Run `f` inside a database transaction.
///
/// Commits when `f` returns `Ok`; any `Err` rolls back every write made
/// inside the closure. Balance mutation and its audit row, or a full
/// submission settlement, are applied as one unit through this.
pub fn with_tx<T>(
    conn: &mut Connection,
    f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
) -> Result<T> {
    let tx = conn.transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Map a SQLite constraint failure on a named unique column to a domain
/// error, passing other errors through.
pub(crate) fn map_unique_violation(
    err: rusqlite::Error,
    column: &str,
    domain: impl FnOnce() -> DbError,
) -> DbError {
    if let rusqlite::Error::SqliteFailure(e, Some(msg)) = &err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(column) {
            return domain();
        }
    }
    DbError::Sqlite(err)
}
