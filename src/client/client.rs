//! Client facade wiring the connection manager, correlator, and inbound
//! pump together.

use crate::client::connection::{
    ConnectionConfig, ConnectionManager, ConnectionState, ReconnectBackoff,
};
use crate::client::correlator::{RequestCorrelator, DEFAULT_REQUEST_TIMEOUT};
use crate::protocol::{Message, MessageIdGenerator, ToolDescriptor};
use crate::transport::traits::Connector;
use crate::transport::websocket::WebSocketConnector;
use crate::utils::errors::{BridgeError, BridgeResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Client connection options
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub server_url: String,
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
    pub backoff: ReconnectBackoff,
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:4000".into(),
            reconnect_interval: Duration::from_millis(5000),
            max_reconnect_attempts: 5,
            backoff: ReconnectBackoff::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientOptions {
    fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            reconnect_interval: self.reconnect_interval,
            max_reconnect_attempts: self.max_reconnect_attempts,
            backoff: self.backoff,
        }
    }
}

pub struct BridgeClient {
    connection: ConnectionManager,
    correlator: Arc<RequestCorrelator>,
    ids: MessageIdGenerator,
    request_timeout: Duration,
}

impl BridgeClient {
    /// Connect to a bridge server over websocket
    pub async fn connect(options: ClientOptions) -> BridgeResult<Self> {
        let connector = Arc::new(WebSocketConnector::new(&options.server_url)?);
        Self::connect_with(connector, options, MessageIdGenerator::new()).await
    }

    /// Connect through an injected transport; used by tests and embedders
    pub async fn connect_with(
        connector: Arc<dyn Connector>,
        options: ClientOptions,
        ids: MessageIdGenerator,
    ) -> BridgeResult<Self> {
        let (connection, mut inbound) =
            ConnectionManager::new(connector, options.connection_config());
        connection.connect().await?;

        let correlator = Arc::new(RequestCorrelator::new(connection.clone()));
        let pump = correlator.clone();
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                match message {
                    Message::Response { .. } => pump.resolve(message),
                    Message::Event { name, .. } => {
                        debug!(event = %name, "event received");
                    }
                    Message::Error { error, .. } => {
                        warn!("peer reported error: {}", error);
                    }
                    other => {
                        debug!(kind = other.kind(), "dropping unexpected inbound message");
                    }
                }
            }
        });

        Ok(Self {
            connection,
            correlator,
            ids,
            request_timeout: options.request_timeout,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Register a tool with the server. Resolves once the server confirms.
    pub async fn register_tool(&self, descriptor: ToolDescriptor) -> BridgeResult<()> {
        let message = Message::register(self.ids.next_id(), descriptor);
        self.await_confirmation(message).await
    }

    /// Remove a previously registered tool
    pub async fn unregister_tool(&self, tool_name: impl Into<String>) -> BridgeResult<()> {
        let message = Message::unregister(self.ids.next_id(), tool_name);
        self.await_confirmation(message).await
    }

    /// Invoke `tool.method` with `params` and return the handler's result
    pub async fn execute_command(
        &self,
        tool: impl Into<String>,
        method: impl Into<String>,
        params: Value,
    ) -> BridgeResult<Value> {
        let message = Message::command(self.ids.next_id(), tool, method, params);
        let response = self
            .correlator
            .send_and_await(message, self.request_timeout)
            .await?;
        match response {
            Message::Response {
                success: true,
                data,
                ..
            } => Ok(data.unwrap_or(Value::Null)),
            Message::Response { error, .. } => Err(match error {
                Some(payload) => BridgeError::CommandFailed(payload),
                None => BridgeError::ExecutionError("response carried no error payload".into()),
            }),
            other => Err(BridgeError::TransportError(format!(
                "correlator resolved with a {} message",
                other.kind()
            ))),
        }
    }

    pub async fn disconnect(&self) {
        self.connection.disconnect().await;
    }

    async fn await_confirmation(&self, message: Message) -> BridgeResult<()> {
        let response = self
            .correlator
            .send_and_await(message, self.request_timeout)
            .await?;
        match response {
            Message::Response { success: true, .. } => Ok(()),
            Message::Response { error, .. } => Err(match error {
                Some(payload) => BridgeError::CommandFailed(payload),
                None => BridgeError::ExecutionError("response carried no error payload".into()),
            }),
            other => Err(BridgeError::TransportError(format!(
                "correlator resolved with a {} message",
                other.kind()
            ))),
        }
    }
}
