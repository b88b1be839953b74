//! Partner account queries.
//!
//! `pending_earnings` is the partner's accrued commission balance. It is
//! not a spendable wallet; it only moves through the earnings accrual in
//! settlement and the withdrawal payout path.

use bursar_types::status::PartnerStatus;
use rusqlite::{Connection, OptionalExtension};

use crate::{map_unique_violation, DbError, Result};

/// A partner row.
#[derive(Clone, Debug)]
pub struct PartnerRow {
    pub id: i64,
    pub user_id: String,
    pub partner_code: String,
    pub business_name: String,
    pub status: PartnerStatus,
    pub commission_rate_pct: u8,
    pub pending_earnings: u64,
    pub paid_earnings: u64,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Fields for creating a partner.
#[derive(Clone, Debug)]
pub struct NewPartner<'a> {
    pub user_id: &'a str,
    pub partner_code: &'a str,
    pub business_name: &'a str,
    pub commission_rate_pct: u8,
    pub bank_name: Option<&'a str>,
    pub account_number: Option<&'a str>,
    pub account_name: Option<&'a str>,
}

/// Commission context for a lecturer, resolved through their referral.
#[derive(Clone, Debug)]
pub struct LecturerPartnerRow {
    pub partner_id: i64,
    pub referral_id: i64,
    pub partner_status: PartnerStatus,
    pub commission_rate_pct: u8,
}

const COLUMNS: &str = "id, user_id, partner_code, business_name, status, commission_rate_pct,
     pending_earnings, paid_earnings, bank_name, account_number, account_name,
     created_at, updated_at";

/// Create a partner, active by default.
pub fn create(conn: &Connection, partner: &NewPartner<'_>, now: u64) -> Result<i64> {
    if partner.commission_rate_pct > 100 {
        return Err(DbError::Constraint(format!(
            "commission rate {} exceeds 100%",
            partner.commission_rate_pct
        )));
    }
    conn.execute(
        "INSERT INTO partners (user_id, partner_code, business_name, commission_rate_pct,
                               bank_name, account_number, account_name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        rusqlite::params![
            partner.user_id,
            partner.partner_code,
            partner.business_name,
            partner.commission_rate_pct,
            partner.bank_name,
            partner.account_number,
            partner.account_name,
            now as i64,
        ],
    )
    .map_err(|e| {
        map_unique_violation(e, "partners.partner_code", || {
            DbError::Constraint(format!("partner code '{}' already taken", partner.partner_code))
        })
    })?;
    Ok(conn.last_insert_rowid())
}

/// Get a partner by id.
pub fn get(conn: &Connection, partner_id: i64) -> Result<PartnerRow> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM partners WHERE id = ?1"),
        [partner_id],
        row_to_partner,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("partner {partner_id}")))
}

/// Find a partner by their code. Case-insensitive per the schema collation.
pub fn find_by_code(conn: &Connection, code: &str) -> Result<Option<PartnerRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM partners WHERE partner_code = ?1"),
            [code],
            row_to_partner,
        )
        .optional()?;
    Ok(row)
}

/// Find a partner by the owning user.
pub fn find_by_user(conn: &Connection, user_id: &str) -> Result<Option<PartnerRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM partners WHERE user_id = ?1"),
            [user_id],
            row_to_partner,
        )
        .optional()?;
    Ok(row)
}

/// Resolve the partner attribution for a lecturer through their active
/// referral, if any.
pub fn context_for_lecturer(
    conn: &Connection,
    lecturer_id: &str,
) -> Result<Option<LecturerPartnerRow>> {
    let row = conn
        .query_row(
            "SELECT p.id, r.id, p.status, p.commission_rate_pct
             FROM referrals r
             JOIN partners p ON p.id = r.partner_id
             WHERE r.lecturer_id = ?1 AND r.status = 'active'",
            [lecturer_id],
            |row| {
                let status: String = row.get(2)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    status,
                    row.get::<_, i64>(3)?,
                ))
            },
        )
        .optional()?;

    match row {
        None => Ok(None),
        Some((partner_id, referral_id, status, rate)) => {
            let partner_status = PartnerStatus::parse(&status).ok_or_else(|| {
                DbError::Serialization(format!("unknown partner status '{status}'"))
            })?;
            Ok(Some(LecturerPartnerRow {
                partner_id,
                referral_id,
                partner_status,
                commission_rate_pct: rate as u8,
            }))
        }
    }
}

/// Change a partner's status.
pub fn update_status(
    conn: &Connection,
    partner_id: i64,
    status: PartnerStatus,
    now: u64,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE partners SET status = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![status.as_str(), now as i64, partner_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("partner {partner_id}")));
    }
    Ok(())
}

/// Change a partner's commission rate.
///
/// Guards only the schema's 0-100 range. The daemon's admin handler
/// additionally refuses rates above the platform commission cap.
pub fn update_commission_rate(
    conn: &Connection,
    partner_id: i64,
    rate_pct: u8,
    now: u64,
) -> Result<()> {
    if rate_pct > 100 {
        return Err(DbError::Constraint(format!(
            "commission rate {rate_pct} exceeds 100%"
        )));
    }
    let updated = conn.execute(
        "UPDATE partners SET commission_rate_pct = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![rate_pct, now as i64, partner_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("partner {partner_id}")));
    }
    Ok(())
}

/// Accrue commission into the partner's pending balance.
pub fn add_pending_earnings(
    conn: &Connection,
    partner_id: i64,
    amount: u64,
    now: u64,
) -> Result<()> {
    if amount == 0 {
        return Err(DbError::InvalidAmount);
    }
    let updated = conn.execute(
        "UPDATE partners
         SET pending_earnings = pending_earnings + ?1, updated_at = ?2
         WHERE id = ?3",
        rusqlite::params![amount as i64, now as i64, partner_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("partner {partner_id}")));
    }
    Ok(())
}

/// Move paid-out commission from pending to the paid counter.
///
/// The deduction is a conditional UPDATE so a payout can never take more
/// than the partner has pending.
pub fn settle_pending_earnings(
    conn: &Connection,
    partner_id: i64,
    amount: u64,
    now: u64,
) -> Result<()> {
    if amount == 0 {
        return Err(DbError::InvalidAmount);
    }
    let updated = conn.execute(
        "UPDATE partners
         SET pending_earnings = pending_earnings - ?1,
             paid_earnings = paid_earnings + ?1,
             updated_at = ?2
         WHERE id = ?3 AND pending_earnings >= ?1",
        rusqlite::params![amount as i64, now as i64, partner_id],
    )?;
    if updated == 0 {
        let partner = get(conn, partner_id)?;
        return Err(DbError::InsufficientBalance {
            available: partner.pending_earnings,
            required: amount,
        });
    }
    Ok(())
}

fn row_to_partner(row: &rusqlite::Row<'_>) -> rusqlite::Result<PartnerRow> {
    let status: String = row.get(4)?;
    let status = PartnerStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown partner status '{status}'").into(),
        )
    })?;
    Ok(PartnerRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        partner_code: row.get(2)?,
        business_name: row.get(3)?,
        status,
        commission_rate_pct: row.get::<_, i64>(5)? as u8,
        pending_earnings: row.get::<_, i64>(6)? as u64,
        paid_earnings: row.get::<_, i64>(7)? as u64,
        bank_name: row.get(8)?,
        account_number: row.get(9)?,
        account_name: row.get(10)?,
        created_at: row.get::<_, i64>(11)? as u64,
        updated_at: row.get::<_, i64>(12)? as u64,
    })
}
