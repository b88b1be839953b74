//! Funding command handlers: gateway checkout, verification, webhook.

use std::sync::Arc;

use bursar_gateway::client::PaymentStatus;
use bursar_gateway::{webhook, GatewayClient, Verification, CHARGE_SUCCESS};
use bursar_settlement::funding;
use bursar_types::money;
use serde_json::Value;
use tracing::{info, warn};

use crate::commands::{map_gateway_error, map_settlement_error, now, str_param};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn gateway(state: &Arc<DaemonState>) -> std::result::Result<&GatewayClient, RpcError> {
    state
        .gateway
        .as_ref()
        .ok_or_else(RpcError::gateway_not_configured)
}

/// Funding amount in kobo, taken from either `amount` (kobo) or
/// `amount_naira`.
fn funding_amount(params: &Value) -> std::result::Result<u64, RpcError> {
    if let Some(kobo) = params.get("amount").and_then(Value::as_u64) {
        return Ok(kobo);
    }
    let naira = params
        .get("amount_naira")
        .and_then(Value::as_u64)
        .ok_or_else(|| RpcError::invalid_params("amount or amount_naira required"))?;
    money::naira_to_kobo(naira)
        .ok_or_else(|| RpcError::invalid_params("amount_naira out of range"))
}

/// Start a wallet funding checkout. Returns the gateway authorization URL
/// the payer must visit.
pub async fn initialize_funding(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;
    let email = str_param(params, "email")?;
    let amount = funding_amount(params)?;

    let initialized = gateway(state)?
        .initialize(user_id, email, amount, state.config.callback_url())
        .await
        .map_err(map_gateway_error)?;

    info!(user_id, amount, reference = %initialized.reference, "funding initialized");
    Ok(serde_json::json!({
        "authorization_url": initialized.authorization_url,
        "access_code": initialized.access_code,
        "reference": initialized.reference,
    }))
}

/// Verify a payment by reference and credit the wallet when successful.
///
/// Safe to call any number of times for the same reference.
pub async fn verify_funding(state: &Arc<DaemonState>, params: &Value) -> Result {
    let user_id = str_param(params, "user_id")?;
    let reference = str_param(params, "reference")?;

    let verification = gateway(state)?
        .verify(reference)
        .await
        .map_err(map_gateway_error)?;

    let mut db = state.db.lock().await;
    let outcome = funding::apply_verified_funding(&mut db, user_id, &verification, now())
        .map_err(map_settlement_error)?;

    Ok(serde_json::json!({
        "credited": outcome.credited,
        "wallet_id": outcome.wallet_id,
        "balance": outcome.new_balance,
        "amount": verification.amount,
        "reference": verification.reference,
    }))
}

/// Process a gateway webhook delivery.
///
/// Expects the raw request body and the signature header exactly as
/// received; the signature is checked against the raw bytes before
/// anything is parsed. Events other than a successful charge are
/// acknowledged and ignored, as are deliveries missing our user metadata,
/// so the gateway does not retry them forever.
pub async fn gateway_webhook(state: &Arc<DaemonState>, params: &Value) -> Result {
    let body = str_param(params, "body")?;
    let signature = str_param(params, "signature")?;
    let secret = gateway(state)?.secret_key();

    if !webhook::validate_signature(secret, body.as_bytes(), signature) {
        warn!("webhook rejected: bad signature");
        return Err(RpcError::invalid_signature());
    }

    let event = webhook::parse_event(body.as_bytes()).map_err(map_gateway_error)?;
    if event.event != CHARGE_SUCCESS {
        return Ok(serde_json::json!({ "processed": false, "reason": "ignored_event" }));
    }

    let charge = event.data;
    if PaymentStatus::from_gateway(&charge.status) != PaymentStatus::Success {
        return Ok(serde_json::json!({ "processed": false, "reason": "not_successful" }));
    }
    let Some(user_id) = charge.metadata.and_then(|m| m.user_id) else {
        warn!(reference = %charge.reference, "webhook charge missing user metadata");
        return Ok(serde_json::json!({ "processed": false, "reason": "missing_user" }));
    };

    let verification = Verification {
        reference: charge.reference,
        status: PaymentStatus::Success,
        amount: charge.amount,
        paid_at: None,
        payer_email: None,
    };

    let mut db = state.db.lock().await;
    let outcome = funding::apply_verified_funding(&mut db, &user_id, &verification, now())
        .map_err(map_settlement_error)?;

    Ok(serde_json::json!({
        "processed": true,
        "credited": outcome.credited,
        "wallet_id": outcome.wallet_id,
        "balance": outcome.new_balance,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_funding_amount_accepts_kobo_or_naira() {
        let kobo = funding_amount(&serde_json::json!({ "amount": 20_000 })).expect("kobo");
        assert_eq!(kobo, 20_000);
        let from_naira =
            funding_amount(&serde_json::json!({ "amount_naira": 200 })).expect("naira");
        assert_eq!(from_naira, 20_000);
        // Kobo wins when both are present.
        let both = funding_amount(&serde_json::json!({ "amount": 5, "amount_naira": 200 }))
            .expect("both");
        assert_eq!(both, 5);
    }

    #[test]
    fn test_funding_amount_rejects_missing_or_oversized() {
        assert!(funding_amount(&serde_json::json!({})).is_err());
        assert!(funding_amount(&serde_json::json!({ "amount_naira": u64::MAX })).is_err());
    }
}
