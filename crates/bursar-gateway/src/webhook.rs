//! Webhook signature validation and event parsing.
//!
//! The gateway signs each delivery with HMAC-SHA512 over the raw request
//! body, hex-encoded in the `x-paystack-signature` header. Validation must
//! run against the raw bytes before any JSON parsing.

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::{GatewayError, Result};

type HmacSha512 = Hmac<Sha512>;

/// Event name for a completed charge. The only event funding acts on.
pub const CHARGE_SUCCESS: &str = "charge.success";

/// A webhook delivery.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookCharge,
}

/// Charge payload carried by a webhook event.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct WebhookCharge {
    pub reference: String,
    /// Kobo.
    pub amount: u64,
    pub status: String,
    #[serde(default)]
    pub metadata: Option<WebhookMetadata>,
}

/// Metadata we attached at initialization, echoed back by the gateway.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct WebhookMetadata {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Check a delivery's signature against the raw body.
///
/// Constant-time comparison via the MAC verifier. Any malformed input
/// (bad hex, wrong length, empty secret) is an invalid signature, never
/// an error.
pub fn validate_signature(secret: &str, raw_body: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    mac.verify_slice(&expected).is_ok()
}

/// Sign a body the way the gateway does. Test support.
pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail in practice.
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Parse a validated webhook body.
pub fn parse_event(raw_body: &[u8]) -> Result<WebhookEvent> {
    serde_json::from_slice(raw_body).map_err(|e| GatewayError::Parse(e.to_string()))
}
