//! Connection lifecycle state machine.
//!
//! The manager owns the logical connection: it establishes the link
//! through a [`Connector`], pumps inbound messages into one long-lived
//! channel across reconnects, and drives reconnection with bounded
//! attempts. Only the manager mutates [`ConnectionState`].

use crate::protocol::Message;
use crate::transport::traits::{Connector, MessageSink, MessageStream};
use crate::utils::errors::{BridgeError, BridgeResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{info, warn};

const INBOUND_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// How the reconnect wait relates to the attempt count.
///
/// `Fixed` waits `reconnect_interval` every time, which matches the
/// historical behavior of this protocol's reference deployment; `Linear`
/// scales the wait by the attempt number like the downstream retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectBackoff {
    #[default]
    Fixed,
    Linear,
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
    pub backoff: ReconnectBackoff,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_millis(5000),
            max_reconnect_attempts: 5,
            backoff: ReconnectBackoff::Fixed,
        }
    }
}

struct Inner {
    connector: Arc<dyn Connector>,
    config: ConnectionConfig,
    state_tx: watch::Sender<ConnectionState>,
    sink: RwLock<Option<Arc<dyn MessageSink>>>,
    attempts: AtomicU32,
    // Bumped on every explicit connect/disconnect so stale pump tasks and
    // reconnect loops from a previous session cannot mutate state.
    generation: AtomicU64,
    inbound_tx: mpsc::Sender<Message>,
}

#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Returns the manager and the long-lived inbound message channel.
    /// The channel survives reconnects; it only closes when the manager is
    /// dropped.
    pub fn new(
        connector: Arc<dyn Connector>,
        config: ConnectionConfig,
    ) -> (Self, mpsc::Receiver<Message>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let manager = Self {
            inner: Arc::new(Inner {
                connector,
                config,
                state_tx,
                sink: RwLock::new(None),
                attempts: AtomicU32::new(0),
                generation: AtomicU64::new(0),
                inbound_tx,
            }),
        };
        (manager, inbound_rx)
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Watch channel for state transitions; pending requests use this to
    /// fail fast when the link is known lost.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Establish the connection, starting a fresh attempt sequence.
    ///
    /// Consumes up to `max_reconnect_attempts` connect attempts with the
    /// configured backoff between them; exhaustion leaves the session
    /// `Failed` and returns `MAX_RECONNECT_ATTEMPTS`.
    pub async fn connect(&self) -> BridgeResult<()> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.attempts.store(0, Ordering::SeqCst);
        self.set_state(ConnectionState::Connecting);
        self.establish(generation, false).await
    }

    /// Tear down the connection deliberately. Does not trigger reconnect.
    pub async fn disconnect(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let sink = self.inner.sink.write().take();
        if let Some(sink) = sink {
            let _ = sink.close().await;
        }
        self.set_state(ConnectionState::Disconnected);
        info!("connection closed");
    }

    /// Transmit one message over the current link.
    ///
    /// At-most-once per call: messages are never queued for replay across
    /// reconnects.
    pub async fn send(&self, message: Message) -> BridgeResult<()> {
        match self.state() {
            ConnectionState::Connected => {}
            ConnectionState::Failed => {
                return Err(BridgeError::MaxReconnectAttempts(
                    self.inner.config.max_reconnect_attempts,
                ))
            }
            other => {
                return Err(BridgeError::TransportError(format!(
                    "cannot send while {}",
                    other
                )))
            }
        }

        let sink = self.inner.sink.read().clone();
        match sink {
            Some(sink) => sink.send(message).await,
            None => Err(BridgeError::TransportError("no active link".into())),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.inner.state_tx.send_replace(state);
    }

    fn reconnect_delay(&self, attempt: u32) -> Duration {
        match self.inner.config.backoff {
            ReconnectBackoff::Fixed => self.inner.config.reconnect_interval,
            ReconnectBackoff::Linear => self.inner.config.reconnect_interval * attempt.max(1),
        }
    }

    fn superseded(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) != generation
    }

    async fn establish(&self, generation: u64, mut wait_first: bool) -> BridgeResult<()> {
        loop {
            if self.superseded(generation) {
                return Err(BridgeError::TransportError(
                    "connection attempt superseded".into(),
                ));
            }

            if wait_first {
                self.set_state(ConnectionState::Reconnecting);
                let upcoming = self.inner.attempts.load(Ordering::SeqCst) + 1;
                sleep(self.reconnect_delay(upcoming)).await;
                // A disconnect() may have landed during the wait; it must
                // stay disconnected.
                if self.superseded(generation) {
                    return Err(BridgeError::TransportError(
                        "connection attempt superseded".into(),
                    ));
                }
            }

            match self.inner.connector.connect().await {
                Ok((sink, stream)) => {
                    if self.superseded(generation) {
                        let _ = sink.close().await;
                        return Err(BridgeError::TransportError(
                            "connection attempt superseded".into(),
                        ));
                    }
                    *self.inner.sink.write() = Some(sink);
                    self.inner.attempts.store(0, Ordering::SeqCst);
                    self.set_state(ConnectionState::Connected);
                    info!("connection established");
                    self.spawn_pump(generation, stream);
                    return Ok(());
                }
                Err(err) => {
                    let used = self.inner.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    warn!(
                        attempt = used,
                        max = self.inner.config.max_reconnect_attempts,
                        "connect attempt failed: {}",
                        err
                    );
                    if used >= self.inner.config.max_reconnect_attempts {
                        self.set_state(ConnectionState::Failed);
                        return Err(BridgeError::MaxReconnectAttempts(
                            self.inner.config.max_reconnect_attempts,
                        ));
                    }
                    wait_first = true;
                }
            }
        }
    }

    fn spawn_pump(&self, generation: u64, mut stream: MessageStream) {
        let manager = self.clone();
        tokio::spawn(async move {
            while let Some(message) = stream.recv().await {
                if manager.inner.inbound_tx.send(message).await.is_err() {
                    return;
                }
            }
            manager.on_link_lost(generation).await;
        });
    }

    async fn on_link_lost(&self, generation: u64) {
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            // Superseded by an explicit disconnect or reconnect.
            return;
        }
        if self.state() != ConnectionState::Connected {
            return;
        }

        warn!("connection lost, reconnecting");
        *self.inner.sink.write() = None;

        if self.inner.attempts.load(Ordering::SeqCst) >= self.inner.config.max_reconnect_attempts {
            self.set_state(ConnectionState::Failed);
            return;
        }
        self.set_state(ConnectionState::Reconnecting);

        let manager = self.clone();
        tokio::spawn(async move {
            // The Reconnecting state is already visible; establish() waits
            // the backoff interval before the first retry.
            let _ = manager.establish(generation, true).await;
        });
    }
}
