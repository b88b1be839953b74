//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! JSON-RPC method calls to the appropriate command handlers. One request
//! per line, one response per line.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    // Domain errors

    /// Referenced entity does not exist (-32004).
    pub fn not_found(detail: &str) -> Self {
        Self {
            code: -32004,
            message: "NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// State or uniqueness conflict (-32005).
    pub fn conflict(detail: &str) -> Self {
        Self {
            code: -32005,
            message: "CONFLICT".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Insufficient balance (-32040).
    pub fn insufficient_balance(required: u64, available: u64) -> Self {
        Self {
            code: -32040,
            message: "INSUFFICIENT_BALANCE".to_string(),
            data: Some(serde_json::json!({"required": required, "available": available})),
        }
    }

    /// Webhook signature did not validate (-32050).
    pub fn invalid_signature() -> Self {
        Self {
            code: -32050,
            message: "INVALID_SIGNATURE".to_string(),
            data: None,
        }
    }

    /// No gateway secret configured (-32051).
    pub fn gateway_not_configured() -> Self {
        Self {
            code: -32051,
            message: "GATEWAY_NOT_CONFIGURED".to_string(),
            data: None,
        }
    }

    /// Gateway call failed (-32052). `retryable` marks transport errors.
    pub fn gateway_error(detail: &str, retryable: bool) -> Self {
        Self {
            code: -32052,
            message: "GATEWAY_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail, "retryable": retryable})),
        }
    }

    /// Payment exists but is not in a successful state (-32053).
    pub fn payment_not_successful(reference: &str, status: &str) -> Self {
        Self {
            code: -32053,
            message: "PAYMENT_NOT_SUCCESSFUL".to_string(),
            data: Some(serde_json::json!({"reference": reference, "status": status})),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();
    let params = &request.params;

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Wallet commands
        "get_wallet" => commands::wallet::get_wallet(&state, params).await,
        "get_wallet_transactions" => {
            commands::wallet::get_wallet_transactions(&state, params).await
        }

        // Funding commands
        "initialize_funding" => commands::payments::initialize_funding(&state, params).await,
        "verify_funding" => commands::payments::verify_funding(&state, params).await,
        "gateway_webhook" => commands::payments::gateway_webhook(&state, params).await,

        // Settlement commands
        "settle_submission" => commands::settlement::settle_submission(&state, params).await,
        "resolve_commission" => commands::settlement::resolve_commission(&state, params).await,
        "get_platform_revenue" => commands::settlement::get_platform_revenue(&state).await,

        // Partner commands
        "create_partner" => commands::partners::create_partner(&state, params).await,
        "register_referral" => commands::partners::register_referral(&state, params).await,
        "get_partner" => commands::partners::get_partner(&state, params).await,
        "get_partner_earnings" => commands::partners::get_partner_earnings(&state, params).await,
        "update_commission_rate" => {
            commands::partners::update_commission_rate(&state, params).await
        }
        "update_partner_status" => commands::partners::update_partner_status(&state, params).await,

        // Withdrawal commands
        "request_partner_withdrawal" => {
            commands::withdrawals::request_partner_withdrawal(&state, params).await
        }
        "request_lecturer_withdrawal" => {
            commands::withdrawals::request_lecturer_withdrawal(&state, params).await
        }
        "approve_withdrawal" => commands::withdrawals::approve_withdrawal(&state, params).await,
        "reject_withdrawal" => commands::withdrawals::reject_withdrawal(&state, params).await,
        "mark_withdrawal_paid" => {
            commands::withdrawals::mark_withdrawal_paid(&state, params).await
        }
        "list_withdrawals" => commands::withdrawals::list_withdrawals(&state, params).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_codes() {
        let err = RpcError::insufficient_balance(200, 100);
        assert_eq!(err.code, -32040);
        assert_eq!(err.message, "INSUFFICIENT_BALANCE");

        let err = RpcError::invalid_signature();
        assert_eq!(err.code, -32050);

        let err = RpcError::method_not_found("unknown");
        assert_eq!(err.code, -32601);

        let err = RpcError::gateway_error("timeout", true);
        assert_eq!(err.code, -32052);
    }

    #[test]
    fn test_rpc_response_success() {
        let resp = RpcResponse::success(
            serde_json::json!(1),
            serde_json::json!({"balance": 1000}),
        );
        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_rpc_response_error() {
        let resp = RpcResponse::error(serde_json::json!(1), RpcError::internal_error("test"));
        assert!(resp.result.is_none());
        assert!(resp.error.is_some());
    }
}
