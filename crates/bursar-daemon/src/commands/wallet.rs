//! Wallet command handlers.

use std::sync::Arc;

use bursar_db::queries::{transactions, wallet};
use bursar_types::money;
use serde_json::Value;

use crate::commands::{map_db_error, now, str_param, u64_param};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Get a user's wallet, creating a zero-balance one on first access.
pub async fn get_wallet(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;

    let db = state.db.lock().await;
    let w = wallet::get_or_create(&db, user_id, now()).map_err(map_db_error)?;

    Ok(serde_json::json!({
        "wallet_id": w.id,
        "user_id": w.user_id,
        "balance": w.balance,
        "balance_naira": money::kobo_to_naira(w.balance),
        "total_funded": w.total_funded,
        "total_spent": w.total_spent,
        "total_earned": w.total_earned,
    }))
}

/// Recent ledger entries for a user's wallet, newest first.
pub async fn get_wallet_transactions(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;
    let limit = u64_param(params, "limit").unwrap_or(50).min(500) as u32;

    let db = state.db.lock().await;
    let w = wallet::find_by_user(&db, user_id)
        .map_err(map_db_error)?
        .ok_or_else(|| RpcError::not_found(&format!("wallet for user '{user_id}'")))?;
    let txs = transactions::recent_for_wallet(&db, w.id, limit).map_err(map_db_error)?;

    let result: Vec<Value> = txs
        .iter()
        .map(|tx| {
            serde_json::json!({
                "id": tx.id,
                "kind": tx.kind.as_str(),
                "amount": tx.amount,
                "description": tx.description,
                "reference": tx.reference,
                "created_at": tx.created_at,
            })
        })
        .collect();

    Ok(serde_json::json!(result))
}
