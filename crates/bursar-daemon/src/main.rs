//! bursard: the Bursar settlement daemon.
//!
//! Single OS process running a Tokio async runtime. The web tier
//! communicates with the daemon via JSON-RPC over Unix socket; the
//! gateway's webhooks arrive the same way, forwarded raw so signature
//! validation happens here.

mod commands;
mod config;
mod rpc;

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::DaemonConfig;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<tokio::sync::Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Payment gateway client. None when no secret key is configured;
    /// funding methods fail cleanly, everything else still works.
    pub gateway: Option<bursar_gateway::GatewayClient>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bursar=info".parse()?),
        )
        .init();

    info!("Bursar daemon starting");

    // 1. Load config
    let config = DaemonConfig::load()?;
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = data_dir.join("bursar.db");
    let conn = bursar_db::open(&db_path)?;
    let db = Arc::new(tokio::sync::Mutex::new(conn));

    // 3. Build gateway client
    let gateway = match config.gateway_config() {
        Some(gw) => Some(bursar_gateway::GatewayClient::new(gw)?),
        None => {
            warn!("no gateway secret key configured, funding methods disabled");
            None
        }
    };

    // 4. Build daemon state
    let state = Arc::new(DaemonState {
        db,
        config,
        gateway,
    });

    // 5. Start IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown
    let _ = std::fs::remove_file(&socket_path);
    info!("Daemon stopped");
    Ok(())
}
