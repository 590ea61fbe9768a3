//! WebSocket transport
//!
//! Messages travel as JSON text frames. Each established socket gets a
//! writer task draining an mpsc channel and a reader task pumping parsed
//! messages into the inbound stream; the stream ends when the socket drops.

use crate::protocol::Message;
use crate::transport::traits::{Connector, MessageSink, MessageStream};
use crate::utils::errors::{BridgeError, BridgeResult};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

const CHANNEL_CAPACITY: usize = 64;

enum WriterCommand {
    Send(Message),
    Close,
}

/// Connects to a bridge server over `ws://` or `wss://`
pub struct WebSocketConnector {
    url: Url,
}

impl WebSocketConnector {
    pub fn new(url: impl AsRef<str>) -> BridgeResult<Self> {
        let url = url
            .as_ref()
            .parse::<Url>()
            .map_err(|e| BridgeError::TransportError(format!("invalid server url: {}", e)))?;
        Ok(Self { url })
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> BridgeResult<(Arc<dyn MessageSink>, MessageStream)> {
        let (ws, _) = connect_async(self.url.as_str()).await.map_err(|e| {
            BridgeError::TransportError(format!("websocket connect failed: {}", e))
        })?;
        debug!(url = %self.url, "websocket connected");
        Ok(spawn_io(ws))
    }
}

/// Wire up writer and reader tasks for an established socket.
///
/// Used for both client-initiated sockets and server-accepted ones.
pub fn spawn_io<S>(ws: WebSocketStream<S>) -> (Arc<dyn MessageSink>, MessageStream)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut write, mut read) = ws.split();
    let (write_tx, mut write_rx) = mpsc::channel::<WriterCommand>(CHANNEL_CAPACITY);
    let (inbound_tx, inbound_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(cmd) = write_rx.recv().await {
            match cmd {
                WriterCommand::Send(message) => {
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("dropping unserializable outbound message: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = write.send(WsMessage::Text(text.into())).await {
                        warn!("websocket send error: {}", e);
                        break;
                    }
                }
                WriterCommand::Close => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    break;
                }
            }
        }
    });

    tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => match serde_json::from_str::<Message>(&text) {
                    Ok(message) => {
                        if inbound_tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => debug!("discarding unparseable frame: {}", e),
                },
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("websocket read error: {}", e);
                    break;
                }
            }
        }
        debug!("websocket reader ended");
    });

    (Arc::new(WebSocketSink { write_tx }), inbound_rx)
}

struct WebSocketSink {
    write_tx: mpsc::Sender<WriterCommand>,
}

#[async_trait]
impl MessageSink for WebSocketSink {
    async fn send(&self, message: Message) -> BridgeResult<()> {
        self.write_tx
            .send(WriterCommand::Send(message))
            .await
            .map_err(|_| BridgeError::TransportError("websocket connection closed".into()))
    }

    async fn close(&self) -> BridgeResult<()> {
        let _ = self.write_tx.send(WriterCommand::Close).await;
        Ok(())
    }
}
