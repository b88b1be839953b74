//! HTTPS client for the Paystack transaction API.

use std::time::Duration;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{GatewayError, Result};

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway connection settings.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Secret key, sent as a bearer token.
    pub secret_key: String,
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Outcome of initializing a transaction: where to send the payer.
#[derive(Clone, Debug, Deserialize)]
pub struct InitializedPayment {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Terminal-or-not state of a gateway transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    Failed,
    Pending,
}

impl PaymentStatus {
    /// Map the gateway's status string. Unknown strings are treated as
    /// failed rather than pending so funding never credits on them.
    pub fn from_gateway(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "pending" | "ongoing" | "queued" => Self::Pending,
            _ => Self::Failed,
        }
    }
}

/// Result of verifying a transaction by reference.
#[derive(Clone, Debug)]
pub struct Verification {
    pub reference: String,
    pub status: PaymentStatus,
    /// Amount actually charged, in kobo.
    pub amount: u64,
    pub paid_at: Option<String>,
    pub payer_email: Option<String>,
}

#[derive(Serialize)]
struct InitializeBody<'a> {
    /// Kobo, as the gateway expects.
    amount: u64,
    email: &'a str,
    reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
    metadata: serde_json::Value,
}

/// Every gateway response wraps its payload in this envelope.
#[derive(Deserialize)]
struct Envelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct VerifyData {
    reference: String,
    status: String,
    amount: u64,
    paid_at: Option<String>,
    customer: Option<VerifyCustomer>,
}

#[derive(Deserialize)]
struct VerifyCustomer {
    email: Option<String>,
}

/// Paystack transaction API client.
#[derive(Clone, Debug)]
pub struct GatewayClient {
    config: GatewayConfig,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        if config.secret_key.trim().is_empty() {
            return Err(GatewayError::ConfigMissing("secret key is empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { config, http })
    }

    /// Initialize a funding transaction for a user's wallet.
    ///
    /// The generated reference is the idempotence key the ledger will
    /// later enforce, and the metadata carries the user id back to us in
    /// the webhook.
    pub async fn initialize(
        &self,
        user_id: &str,
        email: &str,
        amount: u64,
        callback_url: Option<&str>,
    ) -> Result<InitializedPayment> {
        if amount == 0 {
            return Err(GatewayError::Validation("amount must be positive".into()));
        }
        if !email.contains('@') {
            return Err(GatewayError::Validation(format!(
                "invalid payer email '{email}'"
            )));
        }

        let reference = generate_reference();
        let body = InitializeBody {
            amount,
            email,
            reference: &reference,
            callback_url,
            metadata: serde_json::json!({ "user_id": user_id }),
        };

        tracing::debug!(%reference, amount, "initializing gateway transaction");
        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url()))
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        unwrap_envelope(response).await
    }

    /// Verify a transaction's state by its reference.
    pub async fn verify(&self, reference: &str) -> Result<Verification> {
        if reference.is_empty() {
            return Err(GatewayError::Validation("empty reference".into()));
        }

        let response = self
            .http
            .get(format!(
                "{}/transaction/verify/{reference}",
                self.base_url()
            ))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(map_send_error)?;

        let data: VerifyData = unwrap_envelope(response).await?;
        Ok(Verification {
            reference: data.reference,
            status: PaymentStatus::from_gateway(&data.status),
            amount: data.amount,
            paid_at: data.paid_at,
            payer_email: data.customer.and_then(|c| c.email),
        })
    }

    /// Secret key, for webhook signature checks.
    pub fn secret_key(&self) -> &str {
        &self.config.secret_key
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

/// Generate a payment reference: `fund-<12 hex chars>-<unix seconds>`.
pub fn generate_reference() -> String {
    let mut bytes = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut bytes);
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("fund-{}-{ts}", hex::encode(bytes))
}

fn map_send_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() || err.is_connect() {
        GatewayError::Transport(err.to_string())
    } else {
        GatewayError::Remote {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

async fn unwrap_envelope<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?;

    let envelope: Envelope<T> = serde_json::from_slice(&body).map_err(|e| {
        if status.is_success() {
            GatewayError::Parse(e.to_string())
        } else {
            GatewayError::Remote {
                status: Some(status.as_u16()),
                message: String::from_utf8_lossy(&body).into_owned(),
            }
        }
    })?;

    if !status.is_success() || !envelope.status {
        return Err(GatewayError::Remote {
            status: Some(status.as_u16()),
            message: envelope.message,
        });
    }
    envelope
        .data
        .ok_or_else(|| GatewayError::Parse("missing data in gateway response".into()))
}
