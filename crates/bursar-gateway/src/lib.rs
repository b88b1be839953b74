//! # bursar-gateway
//!
//! Paystack payment gateway client: transaction initialization and
//! verification over HTTPS, plus webhook signature validation.
//!
//! All amounts cross this boundary in kobo, the gateway's native minor
//! unit, so no conversion happens here.

pub mod client;
pub mod webhook;

pub use client::{
    GatewayClient, GatewayConfig, InitializedPayment, PaymentStatus, Verification,
};
pub use webhook::{parse_event, validate_signature, WebhookCharge, WebhookEvent, CHARGE_SUCCESS};

/// Gateway error types.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The gateway secret key is missing or empty.
    #[error("gateway not configured: {0}")]
    ConfigMissing(String),

    /// A request was rejected before reaching the gateway.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The gateway answered with a failure.
    #[error("gateway error ({status:?}): {message}")]
    Remote {
        status: Option<u16>,
        message: String,
    },

    /// Network-level failure. Retryable.
    #[error("transport error: {0}")]
    Transport(String),

    /// The gateway answered with a body we could not decode.
    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
