//! Partner attribution lookup.

use bursar_db::queries::partners;
use bursar_revenue::CommissionContext;
use bursar_types::status::PartnerStatus;
use rusqlite::Connection;

/// Resolve the commission context for a lecturer.
///
/// Returns the no-partner context when the lecturer has no active
/// referral, when the referring partner is not active, or when the lookup
/// itself fails. A commission lookup problem must never block settlement;
/// the fee still splits, with the partner share going to the platform.
pub fn resolve_partner_context(conn: &Connection, lecturer_id: &str) -> CommissionContext {
    match partners::context_for_lecturer(conn, lecturer_id) {
        Ok(Some(row)) if row.partner_status == PartnerStatus::Active => {
            CommissionContext::with_partner(row.partner_id, row.referral_id, row.commission_rate_pct)
        }
        Ok(Some(row)) => {
            tracing::debug!(
                lecturer_id,
                partner_id = row.partner_id,
                status = row.partner_status.as_str(),
                "referring partner not active, settling without commission"
            );
            CommissionContext::none()
        }
        Ok(None) => CommissionContext::none(),
        Err(e) => {
            tracing::warn!(lecturer_id, error = %e, "commission lookup failed, settling without partner");
            CommissionContext::none()
        }
    }
}
