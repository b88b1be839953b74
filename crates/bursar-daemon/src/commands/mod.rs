//! RPC command handlers, one module per method family.

pub mod partners;
pub mod payments;
pub mod settlement;
pub mod wallet;
pub mod withdrawals;

use bursar_db::DbError;
use bursar_gateway::GatewayError;
use bursar_settlement::SettlementError;
use serde_json::Value;

use crate::rpc::RpcError;

/// Current Unix time in seconds.
pub(crate) fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Required string parameter.
pub(crate) fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

/// Required unsigned integer parameter.
pub(crate) fn u64_param(params: &Value, name: &str) -> Result<u64, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

/// Required integer id parameter.
pub(crate) fn id_param(params: &Value, name: &str) -> Result<i64, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

pub(crate) fn map_db_error(err: DbError) -> RpcError {
    match err {
        DbError::NotFound(detail) => RpcError::not_found(&detail),
        DbError::InsufficientBalance {
            available,
            required,
        } => RpcError::insufficient_balance(required, available),
        DbError::Constraint(detail) => RpcError::conflict(&detail),
        DbError::DuplicateReference(reference) => {
            RpcError::conflict(&format!("duplicate reference '{reference}'"))
        }
        DbError::InvalidAmount => RpcError::invalid_params("amount must be greater than zero"),
        other => RpcError::internal_error(&format!("db error: {other}")),
    }
}

pub(crate) fn map_settlement_error(err: SettlementError) -> RpcError {
    match err {
        SettlementError::Db(db) => map_db_error(db),
        SettlementError::Split(split) => RpcError::invalid_params(&format!("{split}")),
        SettlementError::Validation(detail) => RpcError::invalid_params(&detail),
        SettlementError::PaymentNotSuccessful { reference, status } => {
            RpcError::payment_not_successful(&reference, &status)
        }
        SettlementError::UnavailableForWithdrawal {
            available,
            requested,
        } => RpcError::insufficient_balance(requested, available),
    }
}

pub(crate) fn map_gateway_error(err: GatewayError) -> RpcError {
    match err {
        GatewayError::ConfigMissing(_) => RpcError::gateway_not_configured(),
        GatewayError::Validation(detail) => RpcError::invalid_params(&detail),
        GatewayError::Transport(detail) => RpcError::gateway_error(&detail, true),
        GatewayError::Remote { message, .. } => RpcError::gateway_error(&message, false),
        GatewayError::Parse(detail) => RpcError::gateway_error(&detail, false),
    }
}
