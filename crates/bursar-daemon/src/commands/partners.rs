//! Partner and referral command handlers.

use std::sync::Arc;

use bursar_db::queries::{earnings, partners, referrals};
use bursar_revenue::{DEFAULT_COMMISSION_PCT, MAX_COMMISSION_PCT};
use bursar_types::status::PartnerStatus;
use serde_json::Value;
use tracing::info;

use crate::commands::{map_db_error, now, str_param, u64_param};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Create a partner account.
pub async fn create_partner(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;
    let partner_code = str_param(params, "partner_code")?;
    let business_name = str_param(params, "business_name")?;
    let rate = u64_param(params, "commission_rate_pct").unwrap_or(DEFAULT_COMMISSION_PCT as u64);
    if rate > MAX_COMMISSION_PCT as u64 {
        return Err(RpcError::invalid_params(&format!(
            "commission_rate_pct must not exceed {MAX_COMMISSION_PCT}"
        )));
    }

    let new_partner = partners::NewPartner {
        user_id,
        partner_code,
        business_name,
        commission_rate_pct: rate as u8,
        bank_name: params.get("bank_name").and_then(|v| v.as_str()),
        account_number: params.get("account_number").and_then(|v| v.as_str()),
        account_name: params.get("account_name").and_then(|v| v.as_str()),
    };

    let db = state.db.lock().await;
    let id = partners::create(&db, &new_partner, now()).map_err(map_db_error)?;

    info!(user_id, partner_code, partner_id = id, "partner created");
    Ok(serde_json::json!({ "partner_id": id, "commission_rate_pct": rate }))
}

/// Change a partner's commission rate. Applies to future settlements
/// only; recorded earnings keep the rate they settled at.
pub async fn update_commission_rate(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;
    let rate = u64_param(params, "commission_rate_pct")?;
    if rate > MAX_COMMISSION_PCT as u64 {
        return Err(RpcError::invalid_params(&format!(
            "commission_rate_pct must not exceed {MAX_COMMISSION_PCT}"
        )));
    }

    let db = state.db.lock().await;
    let partner = partners::find_by_user(&db, user_id)
        .map_err(map_db_error)?
        .ok_or_else(|| RpcError::not_found(&format!("partner account for user '{user_id}'")))?;
    partners::update_commission_rate(&db, partner.id, rate as u8, now()).map_err(map_db_error)?;

    info!(user_id, rate, "partner commission rate changed");
    Ok(serde_json::json!({ "partner_id": partner.id, "commission_rate_pct": rate }))
}

/// Change a partner's status. Anything other than active stops new
/// commission from accruing; settled earnings are untouched.
pub async fn update_partner_status(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;
    let status = str_param(params, "status")?;
    let status = PartnerStatus::parse(status)
        .ok_or_else(|| RpcError::invalid_params(&format!("unknown partner status '{status}'")))?;

    let db = state.db.lock().await;
    let partner = partners::find_by_user(&db, user_id)
        .map_err(map_db_error)?
        .ok_or_else(|| RpcError::not_found(&format!("partner account for user '{user_id}'")))?;
    partners::update_status(&db, partner.id, status, now()).map_err(map_db_error)?;

    info!(user_id, status = status.as_str(), "partner status changed");
    Ok(serde_json::json!({ "partner_id": partner.id, "status": status.as_str() }))
}

/// Register a lecturer under a partner by referral code.
pub async fn register_referral(state: &Arc<DaemonState>, params: &Value) -> Result {
    let lecturer_id = str_param(params, "lecturer_id")?;
    let referral_code = str_param(params, "referral_code")?;

    let db = state.db.lock().await;
    let partner = partners::find_by_code(&db, referral_code)
        .map_err(map_db_error)?
        .ok_or_else(|| RpcError::not_found(&format!("partner code '{referral_code}'")))?;

    let id = referrals::create(&db, partner.id, lecturer_id, referral_code, now())
        .map_err(map_db_error)?;

    info!(lecturer_id, partner_id = partner.id, referral_id = id, "referral registered");
    Ok(serde_json::json!({ "referral_id": id, "partner_id": partner.id }))
}

/// Partner account details and referral roster.
pub async fn get_partner(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;

    let db = state.db.lock().await;
    let partner = partners::find_by_user(&db, user_id)
        .map_err(map_db_error)?
        .ok_or_else(|| RpcError::not_found(&format!("partner account for user '{user_id}'")))?;
    let roster = referrals::list_for_partner(&db, partner.id).map_err(map_db_error)?;

    let referral_list: Vec<Value> = roster
        .iter()
        .map(|r| {
            serde_json::json!({
                "referral_id": r.id,
                "lecturer_id": r.lecturer_id,
                "active": r.active,
                "total_submissions": r.total_submissions,
                "total_revenue": r.total_revenue,
                "partner_earnings": r.partner_earnings,
            })
        })
        .collect();

    Ok(serde_json::json!({
        "partner_id": partner.id,
        "partner_code": partner.partner_code,
        "business_name": partner.business_name,
        "status": partner.status.as_str(),
        "commission_rate_pct": partner.commission_rate_pct,
        "pending_earnings": partner.pending_earnings,
        "paid_earnings": partner.paid_earnings,
        "referrals": referral_list,
    }))
}

/// A partner's earning history and totals.
pub async fn get_partner_earnings(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;
    let limit = u64_param(params, "limit").unwrap_or(50).min(500) as u32;

    let db = state.db.lock().await;
    let partner = partners::find_by_user(&db, user_id)
        .map_err(map_db_error)?
        .ok_or_else(|| RpcError::not_found(&format!("partner account for user '{user_id}'")))?;
    let summary = earnings::summary_for_partner(&db, partner.id).map_err(map_db_error)?;
    let rows = earnings::list_for_partner(&db, partner.id, limit).map_err(map_db_error)?;

    let earning_list: Vec<Value> = rows
        .iter()
        .map(|e| {
            serde_json::json!({
                "earning_id": e.id,
                "referral_id": e.referral_id,
                "source_type": e.source.as_str(),
                "source_id": e.source_id,
                "source_amount": e.source_amount,
                "commission_rate_pct": e.commission_rate_pct,
                "amount": e.amount,
                "status": e.status.as_str(),
                "created_at": e.created_at,
            })
        })
        .collect();

    Ok(serde_json::json!({
        "total": summary.total,
        "pending": summary.pending,
        "withdrawn": summary.withdrawn,
        "count": summary.count,
        "earnings": earning_list,
    }))
}
