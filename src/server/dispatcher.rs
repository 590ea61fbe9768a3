//! Command dispatcher.
//!
//! Routes each inbound message and emits exactly one Response per
//! reply-expecting message. Handler invocations run on spawned tasks so a
//! slow tool never stalls the connection's read loop; responses to
//! different commands may therefore arrive in any order.

use crate::protocol::{ErrorCode, ErrorPayload, Message, MessageIdGenerator, RoutingKey};
use crate::server::handler::HandlerProvider;
use crate::server::registry::ToolRegistry;
use crate::utils::errors::BridgeError;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

pub struct CommandDispatcher {
    registry: Arc<ToolRegistry>,
    provider: Arc<dyn HandlerProvider>,
    ids: MessageIdGenerator,
}

impl CommandDispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        provider: Arc<dyn HandlerProvider>,
        ids: MessageIdGenerator,
    ) -> Self {
        Self {
            registry,
            provider,
            ids,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Route one inbound message. Responses go out through `outbound`.
    pub async fn dispatch(&self, message: Message, outbound: mpsc::Sender<Message>) {
        match message {
            Message::Register { id, tool, .. } => {
                let response = match self.provider.handler_for(&tool) {
                    Some(handler) => {
                        let name = tool.name.clone();
                        self.registry.register(tool, handler);
                        Message::success(self.ids.next_id(), id, json!({ "registered": name }))
                    }
                    None => {
                        warn!(tool = %tool.name, "no handler available for registration");
                        Message::failure(
                            self.ids.next_id(),
                            id,
                            ErrorPayload::new(
                                ErrorCode::ValidationError,
                                format!("no handler available for tool '{}'", tool.name),
                            ),
                        )
                    }
                };
                self.emit(response, &outbound).await;
            }
            Message::Unregister { id, tool_name, .. } => {
                let response = if self.registry.unregister(&tool_name) {
                    Message::success(self.ids.next_id(), id, json!({ "unregistered": tool_name }))
                } else {
                    Message::failure(
                        self.ids.next_id(),
                        id,
                        ErrorPayload::new(
                            ErrorCode::HandlerNotFound,
                            format!("tool '{}' is not registered", tool_name),
                        ),
                    )
                };
                self.emit(response, &outbound).await;
            }
            Message::Command {
                id,
                tool,
                method,
                params,
                ..
            } => {
                let key = RoutingKey::new(tool, method);
                match self.registry.lookup(&key) {
                    Some(handler) => {
                        let ids = self.ids.clone();
                        let outbound = outbound.clone();
                        tokio::spawn(async move {
                            let response = match handler.invoke(key.method(), params).await {
                                Ok(data) => Message::success(ids.next_id(), id, data),
                                Err(err) => {
                                    warn!(key = %key, "handler failed: {}", err);
                                    Message::failure(
                                        ids.next_id(),
                                        id,
                                        ErrorPayload::new(
                                            ErrorCode::ExecutionError,
                                            err.to_string(),
                                        )
                                        .with_details(json!({
                                            "code": err.error_code(),
                                        })),
                                    )
                                }
                            };
                            if outbound.send(response).await.is_err() {
                                error!(key = %key, "connection gone before response could be sent");
                            }
                        });
                    }
                    None => {
                        let response = Message::failure(
                            self.ids.next_id(),
                            id,
                            ErrorPayload::from(&BridgeError::HandlerNotFound(key.to_string())),
                        );
                        self.emit(response, &outbound).await;
                    }
                }
            }
            other => {
                // Not fatal; the protocol tolerates unexpected variants.
                debug!(kind = other.kind(), id = other.id(), "dropping unroutable message");
            }
        }
    }

    async fn emit(&self, response: Message, outbound: &mpsc::Sender<Message>) {
        if outbound.send(response).await.is_err() {
            error!("connection gone before response could be sent");
        }
    }
}
