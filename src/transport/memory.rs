//! In-memory transport for tests and embedded use.
//!
//! `pair()` yields two connected endpoints. The shared [`MemoryLink`] can
//! sever both directions at once to simulate link loss: sends start failing
//! and both inbound streams end.

use crate::protocol::Message;
use crate::transport::traits::{MessageSink, MessageStream};
use crate::utils::errors::{BridgeError, BridgeResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

const CHANNEL_CAPACITY: usize = 64;

/// One side of an in-memory link
pub struct MemoryEndpoint {
    pub sink: Arc<dyn MessageSink>,
    pub stream: MessageStream,
}

/// Control handle shared by both directions of a link
#[derive(Clone)]
pub struct MemoryLink {
    severed: Arc<AtomicBool>,
    closed_tx: Arc<watch::Sender<bool>>,
}

impl MemoryLink {
    /// Simulate link loss: both endpoints stop delivering immediately
    pub fn sever(&self) {
        self.severed.store(true, Ordering::SeqCst);
        let _ = self.closed_tx.send(true);
    }

    pub fn is_severed(&self) -> bool {
        self.severed.load(Ordering::SeqCst)
    }
}

/// Create two connected endpoints and the link controlling them
pub fn pair() -> (MemoryEndpoint, MemoryEndpoint, MemoryLink) {
    let severed = Arc::new(AtomicBool::new(false));
    let (closed_tx, closed_rx) = watch::channel(false);
    let closed_tx = Arc::new(closed_tx);

    let (a_sink, b_stream) = direction(severed.clone(), closed_tx.clone(), closed_rx.clone());
    let (b_sink, a_stream) = direction(severed.clone(), closed_tx.clone(), closed_rx);

    (
        MemoryEndpoint {
            sink: a_sink,
            stream: a_stream,
        },
        MemoryEndpoint {
            sink: b_sink,
            stream: b_stream,
        },
        MemoryLink { severed, closed_tx },
    )
}

fn direction(
    severed: Arc<AtomicBool>,
    closed_tx: Arc<watch::Sender<bool>>,
    mut closed_rx: watch::Receiver<bool>,
) -> (Arc<dyn MessageSink>, MessageStream) {
    let (raw_tx, mut raw_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);
    let (delivery_tx, delivery_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);

    // Forwarding task; exits (dropping delivery_tx) once the link closes,
    // which ends the peer's inbound stream.
    tokio::spawn(async move {
        loop {
            tokio::select! {
                message = raw_rx.recv() => match message {
                    Some(message) => {
                        if delivery_tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = closed_rx.changed() => {
                    if *closed_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });

    let sink = Arc::new(MemorySink {
        tx: raw_tx,
        severed,
        closed_tx,
    });
    (sink, delivery_rx)
}

struct MemorySink {
    tx: mpsc::Sender<Message>,
    severed: Arc<AtomicBool>,
    closed_tx: Arc<watch::Sender<bool>>,
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send(&self, message: Message) -> BridgeResult<()> {
        if self.severed.load(Ordering::SeqCst) {
            return Err(BridgeError::TransportError("link severed".into()));
        }
        self.tx
            .send(message)
            .await
            .map_err(|_| BridgeError::TransportError("peer endpoint gone".into()))
    }

    async fn close(&self) -> BridgeResult<()> {
        self.severed.store(true, Ordering::SeqCst);
        let _ = self.closed_tx.send(true);
        Ok(())
    }
}
