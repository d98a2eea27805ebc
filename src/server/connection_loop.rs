// src/server/connection_loop.rs

//! Contains the node's accept loop and its graceful shutdown.

use super::context::NodeContext;
use super::handler::NodeConnectionHandler;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

const HANDLER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Accepts connections until `shutdown` completes, then stops every handler.
pub async fn run<F>(ctx: NodeContext, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut session_id_counter: u64 = 0;
    let mut client_tasks = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutdown requested, stopping the accept loop.");
                break;
            }

            res = ctx.listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        let Ok(permit) = ctx.connection_permits.clone().try_acquire_owned() else {
                            warn!("Rejecting connection from {}: max_clients reached.", addr);
                            continue;
                        };
                        info!("Accepted new connection from: {}", addr);
                        ctx.state.stats.increment_total_connections();

                        session_id_counter = session_id_counter.wrapping_add(1);
                        let session_id = session_id_counter;
                        let state = ctx.state.clone();
                        let shutdown_rx = ctx.shutdown_tx.subscribe();

                        client_tasks.spawn(async move {
                            let _permit = permit;
                            if let Err(e) = socket.set_nodelay(true) {
                                debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                            }
                            let mut handler = NodeConnectionHandler::new(socket, addr, state, session_id, shutdown_rx);
                            if let Err(e) = handler.run().await {
                                warn!("Connection from {} terminated unexpectedly: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                }
            }

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            }
        }
    }

    info!("Shutting down. Sending signal to all connections.");
    if ctx.shutdown_tx.send(()).is_err() {
        debug!("No open connections to notify.");
    }

    if tokio::time::timeout(HANDLER_DRAIN_TIMEOUT, async {
        while client_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for connections to close; aborting the rest.");
        client_tasks.shutdown().await;
    }

    let stats = &ctx.state.stats;
    info!(
        "Admin node shutdown complete ({} connections served, {} commands processed).",
        stats.total_connections.load(Ordering::Relaxed),
        stats.commands_processed.load(Ordering::Relaxed)
    );
}
