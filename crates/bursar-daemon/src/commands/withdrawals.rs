//! Withdrawal command handlers.

use std::sync::Arc;

use bursar_db::queries::withdrawals::{self, BankAccount, WithdrawalRow};
use bursar_settlement::withdrawals as payouts;
use bursar_types::status::{WithdrawalRequester, WithdrawalStatus};
use serde_json::Value;

use crate::commands::{id_param, map_db_error, map_settlement_error, now, str_param, u64_param};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// File a withdrawal against a partner's pending earnings.
pub async fn request_partner_withdrawal(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;
    let amount = u64_param(params, "amount")?;

    let db = state.db.lock().await;
    let id = payouts::request_partner_withdrawal(&db, user_id, amount, now())
        .map_err(map_settlement_error)?;
    Ok(serde_json::json!({ "withdrawal_id": id }))
}

/// File a withdrawal against a lecturer's wallet balance.
pub async fn request_lecturer_withdrawal(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;
    let amount = u64_param(params, "amount")?;
    let account = BankAccount {
        bank_name: str_param(params, "bank_name")?,
        account_number: str_param(params, "account_number")?,
        account_name: str_param(params, "account_name")?,
    };

    let db = state.db.lock().await;
    let id = payouts::request_lecturer_withdrawal(&db, user_id, amount, &account, now())
        .map_err(map_settlement_error)?;
    Ok(serde_json::json!({ "withdrawal_id": id }))
}

/// Approve a pending request.
pub async fn approve_withdrawal(state: &Arc<DaemonState>, params: &Value) -> Result {
    let withdrawal_id = id_param(params, "withdrawal_id")?;
    let reviewer = str_param(params, "reviewer")?;

    let db = state.db.lock().await;
    let row = payouts::approve_withdrawal(&db, withdrawal_id, reviewer, now())
        .map_err(map_settlement_error)?;
    Ok(withdrawal_json(&row))
}

/// Reject a pending request with a note.
pub async fn reject_withdrawal(state: &Arc<DaemonState>, params: &Value) -> Result {
    let withdrawal_id = id_param(params, "withdrawal_id")?;
    let reviewer = str_param(params, "reviewer")?;
    let note = str_param(params, "note")?;

    let db = state.db.lock().await;
    let row = payouts::reject_withdrawal(&db, withdrawal_id, reviewer, note, now())
        .map_err(map_settlement_error)?;
    Ok(withdrawal_json(&row))
}

/// Record that an approved withdrawal was paid by bank transfer.
pub async fn mark_withdrawal_paid(state: &Arc<DaemonState>, params: &Value) -> Result {
    let withdrawal_id = id_param(params, "withdrawal_id")?;
    let payer = str_param(params, "payer")?;
    let payment_reference = str_param(params, "payment_reference")?;

    let mut db = state.db.lock().await;
    let row =
        payouts::mark_withdrawal_paid(&mut db, withdrawal_id, payer, payment_reference, now())
            .map_err(map_settlement_error)?;
    Ok(withdrawal_json(&row))
}

/// List withdrawals, either one requester's history or a review queue by
/// status.
pub async fn list_withdrawals(state: &Arc<DaemonState>, params: &Value) -> Result {
    let db = state.db.lock().await;

    let rows = if let Some(status) = params.get("status").and_then(|v| v.as_str()) {
        let status = WithdrawalStatus::parse(status)
            .ok_or_else(|| RpcError::invalid_params("unknown status"))?;
        withdrawals::list_by_status(&db, status).map_err(map_db_error)?
    } else {
        let requester_type = str_param(params, "requester_type")?;
        let requester_type = WithdrawalRequester::parse(requester_type)
            .ok_or_else(|| RpcError::invalid_params("unknown requester_type"))?;
        let requester_id = str_param(params, "requester_id")?;
        withdrawals::list_for_requester(&db, requester_type, requester_id)
            .map_err(map_db_error)?
    };

    let result: Vec<Value> = rows.iter().map(withdrawal_json).collect();
    Ok(serde_json::json!(result))
}

fn withdrawal_json(row: &WithdrawalRow) -> Value {
    serde_json::json!({
        "withdrawal_id": row.id,
        "requester_type": row.requester_type.as_str(),
        "requester_id": row.requester_id,
        "amount": row.amount,
        "bank_name": row.bank_name,
        "account_number": row.account_number,
        "account_name": row.account_name,
        "status": row.status.as_str(),
        "requested_at": row.requested_at,
        "reviewed_at": row.reviewed_at,
        "reviewed_by": row.reviewed_by,
        "review_note": row.review_note,
        "paid_at": row.paid_at,
        "paid_by": row.paid_by,
        "payment_reference": row.payment_reference,
    })
}
