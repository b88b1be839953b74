//! Settlement command handlers.

use std::sync::Arc;

use bursar_db::queries::revenue;
use bursar_settlement::{resolve_partner_context, submission, SubmissionFee};
use bursar_types::status::EarningSource;
use serde_json::Value;

use crate::commands::{map_db_error, map_settlement_error, now, str_param, u64_param};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Settle a graded submission's fee: student debit, three-way split,
/// lecturer credit, partner accrual, platform booking.
pub async fn settle_submission(state: &Arc<DaemonState>, params: &Value) -> Result {
    let student_id = str_param(params, "student_id")?;
    let lecturer_id = str_param(params, "lecturer_id")?;
    let amount = u64_param(params, "amount")?;
    let source_id = str_param(params, "source_id")?;
    let source = str_param(params, "source_type")?;
    let source = EarningSource::parse(source)
        .ok_or_else(|| RpcError::invalid_params("unknown source_type"))?;
    let description = params
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or("submission fee");

    let fee = SubmissionFee {
        student_id,
        lecturer_id,
        amount,
        source,
        source_id,
        description,
    };

    let mut db = state.db.lock().await;
    let receipt =
        submission::settle_submission(&mut db, &fee, now()).map_err(map_settlement_error)?;

    Ok(serde_json::json!({
        "split": {
            "lecturer": receipt.split.lecturer,
            "partner": receipt.split.partner,
            "platform": receipt.split.platform,
        },
        "has_partner": receipt.context.has_partner,
        "commission_rate_pct": receipt.context.commission_rate_pct,
        "student_balance": receipt.student_balance,
        "lecturer_balance": receipt.lecturer_balance,
        "earning_id": receipt.earning_id,
    }))
}

/// Resolve the commission context a settlement would use for a lecturer.
pub async fn resolve_commission(state: &Arc<DaemonState>, params: &Value) -> Result {
    let lecturer_id = str_param(params, "lecturer_id")?;

    let db = state.db.lock().await;
    let ctx = resolve_partner_context(&db, lecturer_id);

    Ok(serde_json::json!({
        "has_partner": ctx.has_partner,
        "partner_id": ctx.partner_id,
        "referral_id": ctx.referral_id,
        "commission_rate_pct": ctx.commission_rate_pct,
    }))
}

/// Total platform revenue booked so far.
pub async fn get_platform_revenue(state: &Arc<DaemonState>) -> Result {
    let db = state.db.lock().await;
    let total = revenue::total(&db).map_err(map_db_error)?;
    Ok(serde_json::json!({ "total": total }))
}
