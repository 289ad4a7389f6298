//! HTTP API server command

use lyceum_core::{
    api::{ApiServer, ApiServerConfig},
    LyceumConfig,
};
use std::net::SocketAddr;
use tracing::debug;

use super::helpers::open_lms;

/// Start the API server and block until shutdown
pub async fn handle(config: &LyceumConfig, addr: Option<String>) -> anyhow::Result<()> {
    let addr = addr.unwrap_or_else(|| config.server.addr.clone());
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address '{}': {}", addr, e))?;

    debug!("Starting HTTP API server...");
    let lms = open_lms(config).await?;

    let server = ApiServer::new(
        ApiServerConfig {
            addr: socket_addr,
            heartbeat_secs: config.server.heartbeat_secs,
        },
        lms,
    );
    server.serve().await
}
