use crate::protocol::Message;
use crate::utils::errors::BridgeResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound half of an established link.
///
/// Implementations queue the message for transmission; a send error means
/// the link is no longer usable.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, message: Message) -> BridgeResult<()>;

    /// Close the link. Idempotent.
    async fn close(&self) -> BridgeResult<()>;
}

/// Inbound half of an established link. The channel ends (yields `None`)
/// when the link is lost or closed.
pub type MessageStream = mpsc::Receiver<Message>;

/// Factory for establishing a logical connection.
///
/// The connection manager calls this on every connect and reconnect
/// attempt; tests inject implementations that fail on demand.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> BridgeResult<(Arc<dyn MessageSink>, MessageStream)>;
}
