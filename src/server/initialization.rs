// src/server/initialization.rs

//! Handles node initialization: validating the configuration, loading the seed
//! users and binding the listener.

use super::context::NodeContext;
use super::state::NodeState;
use crate::config::NodeConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tracing::{info, warn};

/// Initializes all node components before starting the accept loop.
pub async fn setup(config: NodeConfig) -> Result<NodeContext> {
    config.validate()?;
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    let state = Arc::new(NodeState::initialize(config)?);
    info!("Node state initialized.");

    let listener = TcpListener::bind((state.config.host.as_str(), state.config.port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                state.config.host, state.config.port
            )
        })?;
    info!("Admin node listening on {}", listener.local_addr()?);
    let connection_permits = Arc::new(Semaphore::new(state.config.max_clients));

    Ok(NodeContext {
        state,
        listener,
        shutdown_tx,
        connection_permits,
    })
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &NodeConfig) {
    if config.security.enabled {
        info!(
            "Security enabled with {} seed user(s).",
            config.security.users.len()
        );
    } else {
        warn!("Security is disabled. Every admin command will be refused.");
    }
    if !config.propagation_delay.is_zero() {
        info!(
            "User changes become visible to queries after {:?}.",
            config.propagation_delay
        );
    }
}
