// src/server/handler.rs

//! Defines the `NodeConnectionHandler` which manages the lifecycle of one client
//! connection on the admin node.

use super::actions::{self, NodeSession};
use super::state::NodeState;
use crate::core::AdminError;
use crate::core::commands::AdminCommand;
use crate::core::protocol::{AdminFrame, AdminFrameCodec};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Manages the full lifecycle of a client connection.
pub struct NodeConnectionHandler {
    framed: Framed<TcpStream, AdminFrameCodec>,
    addr: SocketAddr,
    state: Arc<NodeState>,
    session_id: u64,
    shutdown_rx: broadcast::Receiver<()>,
    session: NodeSession,
}

impl NodeConnectionHandler {
    pub fn new(
        socket: TcpStream,
        addr: SocketAddr,
        state: Arc<NodeState>,
        session_id: u64,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        state.stats.connected_clients.fetch_add(1, Ordering::Relaxed);
        Self {
            framed: Framed::new(socket, AdminFrameCodec),
            addr,
            state,
            session_id,
            shutdown_rx,
            session: NodeSession::default(),
        }
    }

    /// The main event loop for the connection.
    pub async fn run(&mut self) -> Result<(), AdminError> {
        loop {
            tokio::select! {
                // Prioritize shutdown over pending requests.
                biased;
                _ = self.shutdown_rx.recv() => {
                    info!("Connection handler for {} received shutdown signal.", self.addr);
                    break;
                }
                result = self.framed.next() => {
                    match result {
                        Some(Ok(frame)) => {
                            debug!("Session {}: received command {}", self.session_id, frame.command);
                            self.process_frame(frame).await?;
                        }
                        Some(Err(e)) => {
                            if is_normal_disconnect(&e) {
                                debug!("Connection from {} closed by peer: {}", self.addr, e);
                            } else {
                                warn!("Connection error for {}: {}", self.addr, e);
                            }
                            break;
                        }
                        None => {
                            debug!("Connection from {} closed by peer.", self.addr);
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Parses a frame into a command, executes it and writes the replies.
    async fn process_frame(&mut self, frame: AdminFrame) -> Result<(), AdminError> {
        let command_id = frame.command;
        let outcome = match AdminCommand::try_from(frame) {
            Ok(command) => {
                debug!("Session {}: {:?}", self.session_id, command);
                actions::execute(&self.state, &mut self.session, command).await
            }
            Err(e) => Err(e),
        };
        self.state.stats.increment_commands_processed();

        let replies = outcome.unwrap_or_else(|e| {
            debug!("Session {}: command {} failed: {}", self.session_id, command_id, e);
            vec![AdminFrame::reply(command_id, e.result_code(), Vec::new())]
        });
        for reply in replies {
            self.framed.feed(reply).await?;
        }
        self.framed.flush().await
    }
}

impl Drop for NodeConnectionHandler {
    fn drop(&mut self) {
        self.state
            .stats
            .connected_clients
            .fetch_sub(1, Ordering::Relaxed);
    }
}

fn is_normal_disconnect(e: &AdminError) -> bool {
    match e {
        AdminError::Io(io_err) => matches!(
            io_err.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}
