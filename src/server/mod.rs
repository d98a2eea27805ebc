// src/server/mod.rs

//! An admin node that speaks the admin wire protocol.
//!
//! `run` serves until the process receives SIGINT or SIGTERM; `spawn` starts a node
//! in the background and returns a handle, which is how tests and embedders use it.

use crate::config::NodeConfig;
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

mod actions;
mod connection_loop;
mod context;
mod handler;
mod initialization;
mod state;
mod user_store;

pub use actions::NodeSession;
pub use state::{NodeState, NodeStats};
pub use user_store::UserStore;

/// Runs a node in the foreground until a termination signal arrives.
pub async fn run(config: NodeConfig) -> Result<()> {
    let ctx = initialization::setup(config).await?;
    connection_loop::run(ctx, shutdown_signal()).await;
    Ok(())
}

/// Starts a node in the background.
///
/// Binding to port `0` picks an ephemeral port; `NodeHandle::local_addr` reports it.
pub async fn spawn(config: NodeConfig) -> Result<NodeHandle> {
    let ctx = initialization::setup(config).await?;
    let addr = ctx.listener.local_addr()?;
    let state = ctx.state.clone();

    let (stop_tx, stop_rx) = oneshot::channel();
    let task = tokio::spawn(connection_loop::run(ctx, async move {
        // A dropped sender also stops the node.
        let _ = stop_rx.await;
    }));

    Ok(NodeHandle {
        addr,
        state,
        stop_tx: Some(stop_tx),
        task: Some(task),
    })
}

/// A running background node. Dropping the handle stops the node.
pub struct NodeHandle {
    addr: SocketAddr,
    state: Arc<NodeState>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl NodeHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The seed host string a client uses to reach this node.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    /// Stops the node and waits for its connections to close.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            error!("Admin node task failed: {e}");
        }
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, initiating graceful shutdown."),
        _ = terminate => info!("SIGTERM received, initiating graceful shutdown."),
    }
}
