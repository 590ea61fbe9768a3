//! WebSocket accept loop.
//!
//! Each accepted connection gets its own read loop feeding the shared
//! dispatcher and a forwarding task draining that connection's outbound
//! channel into the socket.

use crate::server::dispatcher::CommandDispatcher;
use crate::transport::websocket::spawn_io;
use crate::utils::errors::{BridgeError, BridgeResult};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tracing::{info, warn};

const OUTBOUND_CAPACITY: usize = 64;

/// Server bind configuration
#[derive(Debug, Clone)]
pub struct BindConfig {
    pub host: String,
    pub port: u16,
}

pub struct BridgeServer {
    listener: TcpListener,
    dispatcher: Arc<CommandDispatcher>,
}

impl BridgeServer {
    pub async fn bind(config: &BindConfig, dispatcher: Arc<CommandDispatcher>) -> BridgeResult<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        info!(host = %config.host, port = config.port, "bridge server listening");
        Ok(Self {
            listener,
            dispatcher,
        })
    }

    /// Actual bound address; useful when binding port 0
    pub fn local_addr(&self) -> BridgeResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the shutdown signal fires
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> BridgeResult<()> {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("bridge server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    let dispatcher = self.dispatcher.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, dispatcher).await {
                            warn!(%peer, "connection error: {}", e);
                        }
                    });
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<CommandDispatcher>,
) -> BridgeResult<()> {
    let ws = accept_async(stream)
        .await
        .map_err(|e| BridgeError::TransportError(format!("websocket handshake failed: {}", e)))?;
    info!(%peer, "client connected");

    let (sink, mut inbound) = spawn_io(ws);
    let (outbound_tx, mut outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

    let writer_sink = sink.clone();
    tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if writer_sink.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = inbound.recv().await {
        dispatcher.dispatch(message, outbound_tx.clone()).await;
    }

    let _ = sink.close().await;
    info!(%peer, "client disconnected");
    Ok(())
}
