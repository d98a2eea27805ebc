// src/server/context.rs

use super::state::NodeState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};

/// Holds all the initialized state required to run the node's accept loop.
pub struct NodeContext {
    pub state: Arc<NodeState>,
    pub listener: TcpListener,
    pub shutdown_tx: broadcast::Sender<()>,
    pub connection_permits: Arc<Semaphore>,
}
