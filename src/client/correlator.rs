//! Client-side request/response correlation.
//!
//! Every outgoing reply-expecting message gets a pending entry keyed by its
//! id and resolved by the matching Response, a timeout, or loss of the
//! connection, whichever happens first. Each pending request observes
//! exactly one outcome; late or duplicate Responses are discarded.

use crate::client::connection::{ConnectionManager, ConnectionState};
use crate::protocol::Message;
use crate::utils::errors::{BridgeError, BridgeResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

pub struct RequestCorrelator {
    pending: DashMap<String, oneshot::Sender<Message>>,
    connection: ConnectionManager,
}

impl RequestCorrelator {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            pending: DashMap::new(),
            connection,
        }
    }

    /// Number of requests currently awaiting a response
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Transmit `message` and await its Response.
    ///
    /// Fails with `TIMEOUT` if no matching Response arrives within
    /// `timeout`, and fails fast with a transport error if the connection
    /// is lost while waiting. Either way the pending entry is gone
    /// afterward, so a late Response is silently discarded.
    pub async fn send_and_await(
        &self,
        message: Message,
        timeout: Duration,
    ) -> BridgeResult<Message> {
        let id = message.id().to_string();

        let (resolve_tx, resolve_rx) = oneshot::channel();
        // A reused in-flight id is a protocol violation; refusing it keeps
        // the one-outcome invariant for the request already in the table.
        // The entry API makes check-and-insert a single table operation.
        match self.pending.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(BridgeError::ValidationError(format!(
                    "message id '{}' is already in flight",
                    id
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(resolve_tx);
            }
        }

        // Subscribed before transmitting so a transition between the send
        // and the wait below cannot slip past unobserved.
        let mut state_watch = self.connection.state_watch();

        if let Err(err) = self.connection.send(message).await {
            self.pending.remove(&id);
            return Err(err);
        }

        let outcome = tokio::time::timeout(timeout, async {
            tokio::pin!(resolve_rx);
            loop {
                match *state_watch.borrow_and_update() {
                    ConnectionState::Connected | ConnectionState::Connecting => {}
                    // Link known lost: fail fast instead of waiting out
                    // the full deadline.
                    _ => return None,
                }
                tokio::select! {
                    resolved = &mut resolve_rx => return resolved.ok(),
                    changed = state_watch.changed() => {
                        if changed.is_err() {
                            return None;
                        }
                    }
                }
            }
        })
        .await;

        match outcome {
            Ok(Some(response)) => Ok(response),
            Ok(None) => {
                self.pending.remove(&id);
                Err(BridgeError::TransportError(
                    "connection lost while awaiting response".into(),
                ))
            }
            Err(_) => {
                self.pending.remove(&id);
                Err(BridgeError::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    /// Resolve the pending request matching an inbound Response.
    ///
    /// Responses with an unknown `commandId` (already timed out, or a
    /// duplicate) are discarded silently; that is the protocol's
    /// idempotence boundary, not an error.
    pub fn resolve(&self, response: Message) {
        let command_id = match &response {
            Message::Response { command_id, .. } => command_id.clone(),
            other => {
                debug!(kind = other.kind(), "ignoring non-response in correlator");
                return;
            }
        };

        match self.pending.remove(&command_id) {
            Some((_, resolve_tx)) => {
                if resolve_tx.send(response).is_err() {
                    debug!(command_id = %command_id, "pending request gone before resolution");
                }
            }
            None => {
                debug!(command_id = %command_id, "discarding response with no pending request");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::connection::{ConnectionConfig, ConnectionManager};
    use crate::protocol::{ErrorCode, ErrorPayload};
    use crate::transport::memory::{self, MemoryEndpoint, MemoryLink};
    use crate::transport::traits::{Connector, MessageSink, MessageStream};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    struct MemoryConnector {
        peers: Mutex<Vec<MemoryEndpoint>>,
        links: Mutex<Vec<MemoryLink>>,
    }

    impl MemoryConnector {
        fn new() -> Self {
            Self {
                peers: Mutex::new(Vec::new()),
                links: Mutex::new(Vec::new()),
            }
        }

        fn take_peer(&self) -> MemoryEndpoint {
            self.peers.lock().pop().unwrap()
        }

        fn last_link(&self) -> MemoryLink {
            self.links.lock().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl Connector for MemoryConnector {
        async fn connect(&self) -> BridgeResult<(Arc<dyn MessageSink>, MessageStream)> {
            let (local, peer, link) = memory::pair();
            self.peers.lock().push(peer);
            self.links.lock().push(link);
            Ok((local.sink, local.stream))
        }
    }

    async fn connected_correlator() -> (Arc<RequestCorrelator>, Arc<MemoryConnector>) {
        let connector = Arc::new(MemoryConnector::new());
        let (manager, mut inbound) =
            ConnectionManager::new(connector.clone(), ConnectionConfig::default());
        manager.connect().await.unwrap();

        let correlator = Arc::new(RequestCorrelator::new(manager));
        let pump = correlator.clone();
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                pump.resolve(message);
            }
        });
        (correlator, connector)
    }

    /// Peer task answering every command with its params echoed back
    fn spawn_echo_peer(peer: MemoryEndpoint) {
        let MemoryEndpoint { sink, mut stream } = peer;
        tokio::spawn(async move {
            let mut n = 0u64;
            while let Some(message) = stream.recv().await {
                if let Message::Command { id, params, .. } = message {
                    n += 1;
                    let response = Message::success(format!("s-{}", n), id, params);
                    if sink.send(response).await.is_err() {
                        break;
                    }
                }
            }
        });
    }

    #[tokio::test]
    async fn test_correlation_uniqueness_across_concurrent_commands() {
        let (correlator, connector) = connected_correlator().await;
        spawn_echo_peer(connector.take_peer());

        let mut handles = Vec::new();
        for i in 0..32 {
            let correlator = correlator.clone();
            handles.push(tokio::spawn(async move {
                let command = Message::command(
                    format!("c-{}", i),
                    "echo",
                    "say",
                    json!({ "seq": i }),
                );
                correlator
                    .send_and_await(command, Duration::from_secs(5))
                    .await
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            let response = handle.await.unwrap().unwrap();
            match response {
                Message::Response {
                    command_id,
                    success,
                    data,
                    ..
                } => {
                    // Each request observes exactly its own response.
                    assert_eq!(command_id, format!("c-{}", i));
                    assert!(success);
                    assert_eq!(data.unwrap()["seq"], i);
                }
                other => panic!("expected response, got {}", other.kind()),
            }
        }
        assert_eq!(correlator.pending_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_late_response_is_discarded() {
        let (correlator, connector) = connected_correlator().await;
        let peer = connector.take_peer();

        // Peer stays silent; the call must time out.
        let err = correlator
            .send_and_await(
                Message::command("c1", "jira", "createIssue", json!({})),
                Duration::from_millis(100),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Timeout(100)));
        assert_eq!(correlator.pending_len(), 0);

        // A response arriving after the deadline resolves nothing.
        peer.sink
            .send(Message::success("s1", "c1", json!({"late": true})))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(correlator.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_in_flight_id_is_rejected() {
        let (correlator, connector) = connected_correlator().await;
        let _peer = connector.take_peer();

        let first = {
            let correlator = correlator.clone();
            tokio::spawn(async move {
                correlator
                    .send_and_await(
                        Message::command("dup", "jira", "getIssue", json!({})),
                        Duration::from_secs(5),
                    )
                    .await
            })
        };
        // Let the first request register its pending entry.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = correlator
            .send_and_await(
                Message::command("dup", "jira", "getIssue", json!({})),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ValidationError(_)));

        first.abort();
    }

    #[tokio::test]
    async fn test_failed_response_carries_error_payload() {
        let (correlator, connector) = connected_correlator().await;
        let MemoryEndpoint { sink, mut stream } = connector.take_peer();

        tokio::spawn(async move {
            if let Some(Message::Command { id, .. }) = stream.recv().await {
                let payload = ErrorPayload::new(ErrorCode::HandlerNotFound, "no such tool");
                let _ = sink.send(Message::failure("s1", id, payload)).await;
            }
            // Keep the link open so the response is delivered before the
            // manager can observe a disconnect.
            std::future::pending::<()>().await;
        });

        let response = correlator
            .send_and_await(
                Message::command("c1", "ghost", "noop", json!({})),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        match response {
            Message::Response { success, error, .. } => {
                assert!(!success);
                assert_eq!(error.unwrap().code, ErrorCode::HandlerNotFound);
            }
            other => panic!("expected response, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_pending_request_fails_fast_on_link_loss() {
        let (correlator, connector) = connected_correlator().await;
        let _peer = connector.take_peer();
        let link = connector.last_link();

        let call = {
            let correlator = correlator.clone();
            tokio::spawn(async move {
                correlator
                    .send_and_await(
                        Message::command("c1", "jira", "getIssue", json!({})),
                        Duration::from_secs(60),
                    )
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        link.sever();

        let err = tokio::time::timeout(Duration::from_secs(5), call)
            .await
            .expect("pending request should fail well before its deadline")
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, BridgeError::TransportError(_)));
        assert_eq!(correlator.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_link_loss_racing_the_transmit_fails_fast() {
        let (correlator, connector) = connected_correlator().await;
        let _peer = connector.take_peer();
        let link = connector.last_link();

        // Sever without yielding first, so the loss lands in the window
        // right around the transmit itself.
        let call = {
            let correlator = correlator.clone();
            tokio::spawn(async move {
                correlator
                    .send_and_await(
                        Message::command("c1", "jira", "getIssue", json!({})),
                        Duration::from_secs(60),
                    )
                    .await
            })
        };
        link.sever();

        let err = tokio::time::timeout(Duration::from_secs(5), call)
            .await
            .expect("request must not wait out its full deadline")
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::TransportError(_) | BridgeError::MaxReconnectAttempts(_)
        ));
        assert_eq!(correlator.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_transmit_failure_fails_immediately() {
        let (correlator, connector) = connected_correlator().await;
        let _peer = connector.take_peer();
        connector.last_link().sever();
        // Let the manager notice the loss.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = correlator
            .send_and_await(
                Message::command("c1", "jira", "getIssue", json!({})),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::TransportError(_) | BridgeError::MaxReconnectAttempts(_)
        ));
        assert_eq!(correlator.pending_len(), 0);
    }
}
